// src/exec/mod.rs

//! Process Supervisor.
//!
//! Everything that starts an external program goes through [`Supervisor`]:
//!
//! - [`command`]: streamed execution (merged stdout/stderr to a [`LogSink`],
//!   optional line filter, fail-silent mode) and interruptible execution
//!   (cancel check polled while the child runs).
//! - [`watchdog`]: wall-clock deadline with a single helper-service
//!   restart-and-rejoin on expiry.
//! - [`retry`]: bounded probe for transiently empty results.
//! - [`detached`]: launches that outlive the caller, with an out-of-band
//!   completion signal.
//! - [`terminate`]: interrupt, then terminate, then kill.
//! - [`service`]: the stop-all / start-fresh contract for helper services.

use std::future::Future;
use std::pin::Pin;

pub mod command;
pub mod detached;
pub mod error;
pub mod invocation;
pub mod retry;
pub mod service;
pub mod sink;
pub mod terminate;
pub mod watchdog;

/// Boxed, sendable future used at the trait seams of this module.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub use command::{CancelCheck, CancelFlag, LineFilter, Outcome, RunOptions, Supervisor};
pub use detached::DetachedProcess;
pub use error::{CommandError, Transcript};
pub use invocation::Invocation;
pub use retry::{RetryPolicy, probe_with_retry};
pub use service::{ManagedHelper, ServiceControl, restart};
pub use sink::{LogSink, TracingSink};
pub use terminate::{Escalation, Terminable, escalate};
