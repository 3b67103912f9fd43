#![allow(dead_code)]

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::Level;

use packflow::errors::Result;
use packflow::exec::{BoxFuture, CommandError, Escalation, LogSink, ServiceControl, Terminable};
use packflow::pipeline::{BuildContext, StepArgs, Task, TaskFuture, TaskOutput};

/// Task that only counts how often it ran.
#[derive(Debug, Clone, Default)]
pub struct CountingTask {
    calls: Arc<AtomicUsize>,
}

impl CountingTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that keeps observing the count after the task moved into a
    /// registry.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Task for CountingTask {
    fn run<'a>(&'a self, _ctx: &'a mut BuildContext, _args: &'a StepArgs) -> TaskFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(TaskOutput::Done) })
    }
}

/// Task that appends its `label` keyword (or its name) to a shared journal,
/// so tests can check execution order across tasks.
#[derive(Debug, Clone)]
pub struct JournalTask {
    name: String,
    journal: Arc<Mutex<Vec<String>>>,
}

impl JournalTask {
    pub fn new(name: &str, journal: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            journal,
        }
    }
}

impl Task for JournalTask {
    fn run<'a>(&'a self, _ctx: &'a mut BuildContext, args: &'a StepArgs) -> TaskFuture<'a> {
        Box::pin(async move {
            let label = args
                .str_kw(&self.name, "label")?
                .unwrap_or(&self.name)
                .to_string();
            self.journal.lock().unwrap().push(label);
            Ok(TaskOutput::Done)
        })
    }
}

/// Task that always fails with a configuration error.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingTask;

impl Task for FailingTask {
    fn run<'a>(&'a self, _ctx: &'a mut BuildContext, _args: &'a StepArgs) -> TaskFuture<'a> {
        Box::pin(async { Err(packflow::errors::PackflowError::config("boom")) })
    }
}

/// Task that reports cancellation, as an interrupted long-running task would.
#[derive(Debug, Clone, Copy, Default)]
pub struct CancellingTask;

impl Task for CancellingTask {
    fn run<'a>(&'a self, _ctx: &'a mut BuildContext, _args: &'a StepArgs) -> TaskFuture<'a> {
        Box::pin(async { Ok(TaskOutput::Cancelled) })
    }
}

/// Task whose argument check rejects everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectingTask;

impl Task for RejectingTask {
    fn run<'a>(&'a self, _ctx: &'a mut BuildContext, _args: &'a StepArgs) -> TaskFuture<'a> {
        Box::pin(async { Ok(TaskOutput::Done) })
    }

    fn check_args(&self, _args: &StepArgs) -> Result<()> {
        Err(packflow::errors::PackflowError::config("rejected"))
    }
}

/// Sink that keeps every line it is given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.lines().into_iter().map(|(_, line)| line).collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|(_, line)| line.contains(needle))
    }
}

impl LogSink for RecordingSink {
    fn log(&self, level: Level, line: &str) {
        self.lines.lock().unwrap().push((level, line.to_string()));
    }
}

/// Process double for escalation tests.
///
/// Exits once it has received `honors` (never, if `None`). Records every
/// primitive delivered, in order.
#[derive(Debug, Default)]
pub struct FakeProcess {
    honors: Option<Escalation>,
    refuse_delivery: Vec<Escalation>,
    exited: bool,
    pub delivered: Vec<Escalation>,
}

impl FakeProcess {
    pub fn honoring(step: Escalation) -> Self {
        Self {
            honors: Some(step),
            ..Self::default()
        }
    }

    pub fn stubborn() -> Self {
        Self::default()
    }

    /// Delivery of `step` fails as if the platform did not support it.
    pub fn refusing(mut self, step: Escalation) -> Self {
        self.refuse_delivery.push(step);
        self
    }
}

impl Terminable for FakeProcess {
    fn deliver(&mut self, how: Escalation) -> io::Result<()> {
        if self.refuse_delivery.contains(&how) {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "refused"));
        }
        self.delivered.push(how);
        if self.honors == Some(how) {
            self.exited = true;
        }
        Ok(())
    }

    fn wait_exit<'a>(&'a mut self, _grace: Duration) -> BoxFuture<'a, bool> {
        let exited = self.exited;
        Box::pin(async move { exited })
    }
}

/// Service double counting stop/start calls.
///
/// When given a marker path, `start_fresh` creates it, like a real helper
/// leaving a pid file behind.
#[derive(Debug, Default)]
pub struct FakeService {
    stops: AtomicUsize,
    starts: AtomicUsize,
    marker: Option<PathBuf>,
    fail_start: bool,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_marker(path: impl Into<PathBuf>) -> Self {
        Self {
            marker: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn failing_start() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Completed stop-then-start cycles.
    pub fn restarts(&self) -> usize {
        self.stops().min(self.starts())
    }
}

impl ServiceControl for FakeService {
    fn stop_all(&self) -> BoxFuture<'_, std::result::Result<(), CommandError>> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }

    fn start_fresh(&self) -> BoxFuture<'_, std::result::Result<(), CommandError>> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_start {
            Err(CommandError::Worker {
                program: "fake-service".to_string(),
                message: "start refused".to_string(),
            })
        } else if let Some(marker) = &self.marker {
            std::fs::write(marker, b"started").map_err(|source| CommandError::Io {
                program: "fake-service".to_string(),
                source,
            })
        } else {
            Ok(())
        };
        Box::pin(async move { result })
    }
}
