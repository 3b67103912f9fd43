// src/exec/watchdog.rs

//! Watchdog-guarded execution.

use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::timeout;
use tracing::{error, info, warn};

use super::command::{Execution, Outcome, RunOptions, Supervisor};
use super::error::{CommandError, Transcript};
use super::invocation::Invocation;
use super::service::{ServiceControl, restart};

/// Aborts the worker (and so kills its child) if the caller goes away.
struct WorkerGuard(JoinHandle<Result<Execution, CommandError>>);

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl Supervisor {
    /// Run `inv` on a worker task with a wall-clock `deadline`.
    ///
    /// When the deadline passes the command is considered hung: `service` is
    /// restarted (stop every instance, start a fresh one) and the worker is
    /// joined once more without a deadline. This recovery happens at most once
    /// per call; a nonzero exit afterwards is returned as
    /// [`CommandError::Failed`].
    pub async fn run_with_watchdog(
        &self,
        inv: &Invocation,
        deadline: Duration,
        service: &dyn ServiceControl,
    ) -> Result<Transcript, CommandError> {
        let program = inv.program_name();
        let worker_sup = self.clone();
        let worker_inv = inv.clone();
        let mut guard = WorkerGuard(tokio::spawn(async move {
            worker_sup
                .execute(&worker_inv, &RunOptions::default())
                .await
        }));

        let joined = match timeout(deadline, &mut guard.0).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(
                    program = %program,
                    deadline_ms = deadline.as_millis() as u64,
                    "command did not finish in time; restarting helper service"
                );
                if let Err(err) = restart(service).await {
                    error!(program = %program, error = %err, "helper service restart failed");
                }
                info!(program = %program, "waiting for command after helper restart");
                (&mut guard.0).await
            }
        };

        let execution = joined.map_err(|err| worker_error(&program, err))??;
        match self.judge(inv, false, execution)? {
            Outcome::Completed(transcript) | Outcome::Cancelled(transcript) => Ok(transcript),
        }
    }
}

fn worker_error(program: &str, err: JoinError) -> CommandError {
    CommandError::Worker {
        program: program.to_string(),
        message: err.to_string(),
    }
}
