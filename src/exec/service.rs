// src/exec/service.rs

//! Control of long-lived helper services (e.g. the device bridge daemon).

use tracing::{Level, info};

use super::BoxFuture;
use super::command::{RunOptions, Supervisor};
use super::error::CommandError;
use super::invocation::Invocation;

/// Stop-all-instances / start-fresh control over an external helper service.
pub trait ServiceControl: Send + Sync {
    fn stop_all(&self) -> BoxFuture<'_, Result<(), CommandError>>;
    fn start_fresh(&self) -> BoxFuture<'_, Result<(), CommandError>>;
}

/// Stop every instance, then start a fresh one.
pub async fn restart<S>(service: &S) -> Result<(), CommandError>
where
    S: ServiceControl + ?Sized,
{
    service.stop_all().await?;
    service.start_fresh().await
}

/// A helper service identified by its process name and started by a
/// detached launch of `start`.
#[derive(Debug, Clone)]
pub struct ManagedHelper {
    supervisor: Supervisor,
    process_name: String,
    start: Invocation,
}

impl ManagedHelper {
    pub fn new(supervisor: Supervisor, process_name: impl Into<String>, start: Invocation) -> Self {
        Self {
            supervisor,
            process_name: process_name.into(),
            start,
        }
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    fn stop_commands(&self) -> [Invocation; 2] {
        if cfg!(windows) {
            [
                Invocation::new("taskkill").args(["/T", "/IM", self.process_name.as_str()]),
                Invocation::new("taskkill").args(["/F", "/T", "/IM", self.process_name.as_str()]),
            ]
        } else {
            [
                Invocation::new("killall").arg(&self.process_name),
                Invocation::new("killall").args(["-9", self.process_name.as_str()]),
            ]
        }
    }
}

impl ServiceControl for ManagedHelper {
    fn stop_all(&self) -> BoxFuture<'_, Result<(), CommandError>> {
        Box::pin(async move {
            info!(service = %self.process_name, "stopping all helper instances");
            // Nothing to kill is the normal case, so both passes are fail-silent.
            let opts = RunOptions::default().level(Level::TRACE).fail_silently(true);
            for inv in self.stop_commands() {
                match self.supervisor.run_streamed(&inv, &opts).await {
                    Ok(_) => {}
                    // killall is not installed everywhere.
                    Err(CommandError::Spawn { .. }) => {}
                    Err(err) => return Err(err),
                }
            }
            Ok(())
        })
    }

    fn start_fresh(&self) -> BoxFuture<'_, Result<(), CommandError>> {
        Box::pin(async move {
            info!(service = %self.process_name, "starting helper service");
            self.supervisor.launch_detached(&self.start, true).await?;
            Ok(())
        })
    }
}
