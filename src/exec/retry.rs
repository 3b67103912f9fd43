// src/exec/retry.rs

//! Retry probe for results that may be transiently empty.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::SupervisorSection;

use super::error::CommandError;
use super::service::{ServiceControl, restart};

/// Bounds for [`probe_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub retries: u32,
    pub pause: Duration,
    /// The helper service is restarted after this retry has come back empty.
    pub restart_after: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            pause: Duration::from_secs(2),
            restart_after: 1,
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &SupervisorSection) -> Self {
        Self {
            retries: settings.probe_retries,
            pause: Duration::from_millis(settings.probe_pause_ms),
            ..Self::default()
        }
    }
}

/// Call `probe` until it yields a non-empty list or the retry budget is spent.
///
/// Between attempts the caller sleeps for `policy.pause`. Once retry number
/// `policy.restart_after` has also come back empty, `service` is restarted
/// before the next attempt, since the live resource may have drifted from
/// what the service reports. Errors from `probe` end the loop immediately.
pub async fn probe_with_retry<T, F, Fut>(
    policy: RetryPolicy,
    service: &dyn ServiceControl,
    mut probe: F,
) -> Result<Vec<T>, CommandError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<T>, CommandError>>,
{
    let mut found = probe().await?;
    let mut attempt = 0;
    while found.is_empty() && attempt < policy.retries {
        attempt += 1;
        debug!(attempt, "probe came back empty; retrying");
        sleep(policy.pause).await;
        found = probe().await?;
        if found.is_empty() && attempt == policy.restart_after {
            info!("restarting helper service after repeated empty probes");
            if let Err(err) = restart(service).await {
                error!(error = %err, "helper service restart failed");
            }
        }
    }
    Ok(found)
}
