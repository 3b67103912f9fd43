// src/exec/terminate.rs

//! Escalating termination of child processes.
//!
//! Termination walks [`Escalation::ORDER`]: a cooperative interrupt, then a
//! graceful terminate, then a forced kill. After each primitive is delivered
//! the process gets a grace period to exit; the walk stops at the first
//! primitive after which it has.

use std::fmt;
use std::io;
use std::time::Duration;

use tokio::process::Child;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::BoxFuture;

/// One termination primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// SIGINT on unix.
    Interrupt,
    /// SIGTERM on unix, `taskkill /PID` on Windows.
    Terminate,
    /// SIGKILL / `TerminateProcess`.
    Kill,
}

impl Escalation {
    pub const ORDER: [Escalation; 3] = [
        Escalation::Interrupt,
        Escalation::Terminate,
        Escalation::Kill,
    ];
}

impl fmt::Display for Escalation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Escalation::Interrupt => "interrupt",
            Escalation::Terminate => "terminate",
            Escalation::Kill => "kill",
        })
    }
}

/// Something that can be asked to stop.
///
/// Implemented for `tokio::process::Child`; tests provide scripted fakes.
pub trait Terminable: Send {
    /// Deliver one primitive. An error means it could not be delivered at all.
    fn deliver(&mut self, how: Escalation) -> io::Result<()>;

    /// Resolve to `true` if the process has exited within `grace`.
    fn wait_exit<'a>(&'a mut self, grace: Duration) -> BoxFuture<'a, bool>;
}

/// Terminate `target`, escalating until it exits.
///
/// Returns the primitive that worked, or `None` if the process survived every
/// one of them. A process that has already exited is reported as stopped by
/// the first primitive whose delivery was attempted.
pub async fn escalate<P>(target: &mut P, grace: Duration) -> Option<Escalation>
where
    P: Terminable + ?Sized,
{
    for how in Escalation::ORDER {
        match target.deliver(how) {
            Ok(()) => debug!(step = %how, "termination primitive delivered"),
            Err(err) => {
                debug!(step = %how, error = %err, "termination primitive not delivered");
                // Already gone counts as success of this step.
                if target.wait_exit(Duration::ZERO).await {
                    return Some(how);
                }
                continue;
            }
        }

        if target.wait_exit(grace).await {
            return Some(how);
        }
    }

    warn!("process survived every termination primitive");
    None
}

impl Terminable for Child {
    fn deliver(&mut self, how: Escalation) -> io::Result<()> {
        match how {
            Escalation::Kill => self.start_kill(),
            Escalation::Interrupt | Escalation::Terminate => deliver_soft(self, how),
        }
    }

    fn wait_exit<'a>(&'a mut self, grace: Duration) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            if let Ok(Some(_)) = self.try_wait() {
                return true;
            }
            matches!(timeout(grace, self.wait()).await, Ok(Ok(_)))
        })
    }
}

#[cfg(unix)]
fn deliver_soft(child: &mut Child, how: Escalation) -> io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let pid = child
        .id()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "process already reaped"))?;
    let signal = match how {
        Escalation::Interrupt => Signal::SIGINT,
        _ => Signal::SIGTERM,
    };
    kill(Pid::from_raw(pid as i32), signal).map_err(io::Error::from)
}

#[cfg(windows)]
fn deliver_soft(child: &mut Child, how: Escalation) -> io::Result<()> {
    let pid = child
        .id()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "process already reaped"))?;
    match how {
        // There is no console-less way to send Ctrl-C to a single child.
        Escalation::Interrupt => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "interrupt is not supported on this platform",
        )),
        _ => {
            let status = std::process::Command::new("taskkill")
                .args(["/PID", &pid.to_string()])
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .status()?;
            if status.success() {
                Ok(())
            } else {
                Err(io::Error::other(format!("taskkill exited with {status}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Exits after `honours` primitives have been delivered.
    struct Scripted {
        honours: usize,
        delivered: Vec<Escalation>,
        refuse: Option<Escalation>,
    }

    impl Terminable for Scripted {
        fn deliver(&mut self, how: Escalation) -> io::Result<()> {
            if self.refuse == Some(how) {
                return Err(io::Error::other("refused"));
            }
            self.delivered.push(how);
            Ok(())
        }

        fn wait_exit<'a>(&'a mut self, _grace: Duration) -> BoxFuture<'a, bool> {
            let exited = self.delivered.len() >= self.honours;
            Box::pin(async move { exited })
        }
    }

    #[tokio::test]
    async fn stops_at_first_primitive_that_works() {
        let mut p = Scripted {
            honours: 1,
            delivered: vec![],
            refuse: None,
        };
        assert_eq!(
            escalate(&mut p, Duration::from_millis(10)).await,
            Some(Escalation::Interrupt)
        );
        assert_eq!(p.delivered, vec![Escalation::Interrupt]);
    }

    #[tokio::test]
    async fn undeliverable_primitive_moves_on() {
        let mut p = Scripted {
            honours: 1,
            delivered: vec![],
            refuse: Some(Escalation::Interrupt),
        };
        assert_eq!(
            escalate(&mut p, Duration::from_millis(10)).await,
            Some(Escalation::Terminate)
        );
    }

    #[tokio::test]
    async fn survivor_gets_every_primitive() {
        let mut p = Scripted {
            honours: 10,
            delivered: vec![],
            refuse: None,
        };
        assert_eq!(escalate(&mut p, Duration::from_millis(1)).await, None);
        assert_eq!(p.delivered, Escalation::ORDER.to_vec());
    }
}
