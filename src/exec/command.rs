// src/exec/command.rs

//! Streamed and interruptible command execution.
//!
//! A command's stdout and stderr are each drained by a small Tokio task and
//! merged into one line channel. The supervising future records every line
//! in the [`Transcript`], forwards the visible ones to the [`LogSink`], and,
//! when a [`CancelCheck`] is attached, polls it on a fixed interval. A
//! positive check escalates termination of the child and resolves to
//! [`Outcome::Cancelled`].

use std::fmt;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{Level, debug, info};

use crate::config::SupervisorSection;

use super::error::{CommandError, Transcript};
use super::invocation::Invocation;
use super::sink::LogSink;
use super::terminate::escalate;

/// Answers "has this operation been cancelled?" for whoever owns the run.
pub trait CancelCheck: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

impl CancelCheck for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

/// Shareable cancellation flag (set from Ctrl-C handlers or tests).
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl CancelCheck for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// Returns `true` for lines that should be shown in the log.
pub type LineFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Per-call options for [`Supervisor::run_streamed`].
#[derive(Clone)]
pub struct RunOptions {
    /// Severity used for every visible output line.
    pub level: Level,
    /// Return the transcript instead of failing on a nonzero exit.
    pub fail_silently: bool,
    pub filter: Option<LineFilter>,
    pub cancel: Option<Arc<dyn CancelCheck>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            fail_silently: false,
            filter: None,
            cancel: None,
        }
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("level", &self.level)
            .field("fail_silently", &self.fail_silently)
            .field("filter", &self.filter.is_some())
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

impl RunOptions {
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn fail_silently(mut self, fail_silently: bool) -> Self {
        self.fail_silently = fail_silently;
        self
    }

    pub fn filter(mut self, filter: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn cancellable(mut self, cancel: Arc<dyn CancelCheck>) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// How a streamed run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Exited successfully, or unsuccessfully with `fail_silently` set.
    Completed(Transcript),
    /// Stopped because the cancel check fired; holds output captured so far.
    Cancelled(Transcript),
}

impl Outcome {
    pub fn transcript(&self) -> &Transcript {
        match self {
            Outcome::Completed(t) | Outcome::Cancelled(t) => t,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled(_))
    }
}

/// Raw result of running a command, before the exit status is judged.
#[derive(Debug)]
pub(crate) enum Execution {
    Finished {
        transcript: Transcript,
        code: Option<i32>,
        success: bool,
    },
    Cancelled(Transcript),
}

/// Runs, watches, times out, cancels and terminates external commands.
///
/// Cheap to clone; workers spawned for watchdog runs carry their own clone
/// and never see the build context.
#[derive(Debug, Clone)]
pub struct Supervisor {
    sink: Arc<dyn LogSink>,
    poll_interval: Duration,
    grace: Duration,
}

impl Supervisor {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self::with_settings(sink, &SupervisorSection::default())
    }

    pub fn with_settings(sink: Arc<dyn LogSink>, settings: &SupervisorSection) -> Self {
        Self {
            sink,
            poll_interval: Duration::from_millis(settings.poll_interval_ms.max(1)),
            grace: Duration::from_millis(settings.termination_grace_ms),
        }
    }

    /// Override the cancellation polling interval.
    pub fn poll_interval(mut self, every: Duration) -> Self {
        self.poll_interval = every.max(Duration::from_millis(1));
        self
    }

    /// Override how long each termination primitive is given.
    pub fn termination_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Run with default options: output at DEBUG, fail on nonzero exit.
    pub async fn run(&self, inv: &Invocation) -> Result<Transcript, CommandError> {
        let outcome = self.run_streamed(inv, &RunOptions::default()).await?;
        Ok(match outcome {
            Outcome::Completed(t) | Outcome::Cancelled(t) => t,
        })
    }

    /// Run a command to completion, streaming its merged output to the sink.
    ///
    /// - Nonzero exit: [`CommandError::Failed`] carrying the full transcript,
    ///   unless `fail_silently` is set.
    /// - With a cancel check attached, cancellation yields
    ///   [`Outcome::Cancelled`] after the child has been terminated.
    pub async fn run_streamed(
        &self,
        inv: &Invocation,
        opts: &RunOptions,
    ) -> Result<Outcome, CommandError> {
        let execution = self.execute(inv, opts).await?;
        self.judge(inv, opts.fail_silently, execution)
    }

    pub(crate) fn judge(
        &self,
        inv: &Invocation,
        fail_silently: bool,
        execution: Execution,
    ) -> Result<Outcome, CommandError> {
        match execution {
            Execution::Cancelled(transcript) => Ok(Outcome::Cancelled(transcript)),
            Execution::Finished {
                transcript,
                success: true,
                ..
            } => Ok(Outcome::Completed(transcript)),
            Execution::Finished { transcript, .. } if fail_silently => {
                self.sink.log(
                    Level::DEBUG,
                    &format!(
                        "Failed to run {}, but was told to carry on anyway",
                        inv.command_line()
                    ),
                );
                Ok(Outcome::Completed(transcript))
            }
            Execution::Finished {
                transcript, code, ..
            } => Err(CommandError::Failed {
                program: inv.program_name(),
                code,
                transcript,
            }),
        }
    }

    pub(crate) async fn execute(
        &self,
        inv: &Invocation,
        opts: &RunOptions,
    ) -> Result<Execution, CommandError> {
        let program = inv.program_name();
        self.sink
            .log(Level::DEBUG, &format!("Running: {}", inv.command_line()));

        let mut cmd = inv.to_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        let mut child = cmd.spawn().map_err(|source| CommandError::Spawn {
            program: program.clone(),
            source,
        })?;

        let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, line_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, line_tx.clone());
        }
        drop(line_tx);

        let mut transcript = Transcript::default();
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let watching = opts.cancel.is_some();
        let mut streams_open = true;

        let status = loop {
            let event = tokio::select! {
                line = line_rx.recv(), if streams_open => Event::Line(line),
                status = child.wait(), if !streams_open => Event::Exited(status),
                _ = ticker.tick(), if watching => Event::Tick,
            };

            match event {
                Event::Line(Some(line)) => self.record(&mut transcript, &line, opts),
                Event::Line(None) => streams_open = false,
                Event::Exited(status) => {
                    break status.map_err(|source| CommandError::Io {
                        program: program.clone(),
                        source,
                    })?;
                }
                Event::Tick => {
                    let cancelled = opts.cancel.as_ref().is_some_and(|c| c.is_cancelled());
                    if cancelled {
                        info!(program = %program, "cancellation requested; terminating child process");
                        let how = escalate(&mut child, self.grace).await;
                        debug!(program = %program, ?how, "child terminated after cancellation");
                        self.drain(&mut line_rx, &mut transcript, opts).await;
                        return Ok(Execution::Cancelled(transcript));
                    }
                }
            }
        };

        debug!(
            program = %program,
            exit_code = ?status.code(),
            success = status.success(),
            "command exited"
        );

        Ok(Execution::Finished {
            transcript,
            code: status.code(),
            success: status.success(),
        })
    }

    fn record(&self, transcript: &mut Transcript, line: &str, opts: &RunOptions) {
        transcript.push_line(line);
        let visible = opts.filter.as_ref().is_none_or(|keep| keep(line));
        if visible {
            self.sink.log(opts.level, line);
        }
    }

    /// Collect whatever the terminated child still had buffered.
    async fn drain(
        &self,
        line_rx: &mut mpsc::UnboundedReceiver<String>,
        transcript: &mut Transcript,
        opts: &RunOptions,
    ) {
        while let Ok(Some(line)) = timeout(Duration::from_millis(200), line_rx.recv()).await {
            self.record(transcript, &line, opts);
        }
    }
}

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

enum Event {
    Line(Option<String>),
    Exited(std::io::Result<std::process::ExitStatus>),
    Tick,
}

/// Forward every line of `reader` to `tx`. Invalid UTF-8 is replaced rather
/// than ending the stream, so the child never blocks on a full pipe.
fn spawn_line_reader<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\r', '\n']).to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            }
        }
    });
}
