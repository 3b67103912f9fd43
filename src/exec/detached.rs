// src/exec/detached.rs

//! Detached launch.
//!
//! The child gets its own process group (or a detached console on Windows),
//! null stdio and is not killed when its handle is dropped, so it outlives
//! the caller. Completion is reported out of band: a reaper task owns the
//! handle and signals a oneshot channel when the process exits.

use std::process::Stdio;

use tokio::sync::oneshot;
use tracing::{Level, debug};

use super::command::Supervisor;
use super::error::CommandError;
use super::invocation::Invocation;

/// A process started with [`Supervisor::launch_detached`].
#[derive(Debug)]
pub struct DetachedProcess {
    pid: Option<u32>,
    done: Option<oneshot::Receiver<Option<i32>>>,
}

impl DetachedProcess {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Wait for the completion signal. Yields the exit code when known.
    ///
    /// Resolves to `None` straight away if the signal was already consumed
    /// or the reaper went away.
    pub async fn completed(&mut self) -> Option<i32> {
        match self.done.take() {
            Some(rx) => rx.await.ok().flatten(),
            None => None,
        }
    }
}

impl Supervisor {
    /// Start `inv` decoupled from this process.
    ///
    /// With `wait` set, returns only after the detached process has
    /// signalled completion.
    pub async fn launch_detached(
        &self,
        inv: &Invocation,
        wait: bool,
    ) -> Result<DetachedProcess, CommandError> {
        let program = inv.program_name();
        self.sink().log(
            Level::DEBUG,
            &format!("Launching detached: {}", inv.command_line()),
        );

        let mut cmd = inv.to_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);
        #[cfg(unix)]
        cmd.process_group(0);
        #[cfg(windows)]
        cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);

        let mut child = cmd.spawn().map_err(|source| CommandError::Spawn {
            program: program.clone(),
            source,
        })?;
        let pid = child.id();

        let (tx, rx) = oneshot::channel();
        let reaper_program = program.clone();
        tokio::spawn(async move {
            let code = child.wait().await.ok().and_then(|status| status.code());
            debug!(program = %reaper_program, exit_code = ?code, "detached process finished");
            let _ = tx.send(code);
        });

        let mut process = DetachedProcess { pid, done: Some(rx) };
        if wait {
            let code = process.completed().await;
            debug!(program = %program, exit_code = ?code, "detached launch completed");
        }
        Ok(process)
    }
}

#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
