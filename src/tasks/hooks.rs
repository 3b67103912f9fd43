// src/tasks/hooks.rs

//! `run_hook(hook=, dir=)`: run the user's hook scripts.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{Level, info};

use crate::errors::{PackflowError, Result};
use crate::exec::{CommandError, Invocation, Outcome, RunOptions};
use crate::pipeline::{BuildContext, StepArgs, Task, TaskFuture, TaskOutput};

/// Runs every script in `hooks/<hook>` in name order, from inside `dir`.
///
/// `.py` scripts run under `python`, `.js` under `node`; `.sh` (unix) and
/// `.bat` (Windows) run directly. Other files are ignored. A script exiting
/// nonzero fails the phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunHook;

impl Task for RunHook {
    fn run<'a>(&'a self, ctx: &'a mut BuildContext, args: &'a StepArgs) -> TaskFuture<'a> {
        Box::pin(async move {
            let hook = args.require_str("run_hook", "hook")?;
            let dir = ctx.expand_path([ctx.render(args.require_str("run_hook", "dir")?)?]);
            let hook_dir = ctx.expand_path(["hooks", hook]);

            let supervisor = ctx.supervisor();
            let mut opts = RunOptions::default().level(Level::INFO);
            if let Some(cancel) = ctx.cancel_check() {
                opts = opts.cancellable(cancel.clone());
            }

            for script in hook_scripts(&hook_dir)? {
                let Some((kind, inv)) = hook_invocation(&script) else {
                    continue;
                };
                let name = script.file_name().unwrap_or_default().to_string_lossy();
                info!("Running ({kind}) hook: {name}");

                match supervisor.run_streamed(&inv.current_dir(&dir), &opts).await {
                    Ok(Outcome::Completed(_)) => {}
                    Ok(Outcome::Cancelled(_)) => return Ok(TaskOutput::Cancelled),
                    Err(CommandError::Failed { .. }) => {
                        return Err(PackflowError::config(format!(
                            "Hook script {name} exited with a non-zero return code."
                        )));
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            Ok(TaskOutput::Done)
        })
    }

    fn check_args(&self, args: &StepArgs) -> Result<()> {
        args.require_str("run_hook", "hook")?;
        args.require_str("run_hook", "dir")?;
        Ok(())
    }
}

/// Regular files in `dir`, sorted by name. A missing directory has none.
fn hook_scripts(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut scripts = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() {
            scripts.push(path);
        }
    }
    scripts.sort();
    Ok(scripts)
}

fn hook_invocation(script: &Path) -> Option<(&'static str, Invocation)> {
    let ext = script.extension()?.to_str()?;
    match ext {
        "py" => Some(("Python", Invocation::new("python").arg(script))),
        "js" => Some(("node", Invocation::new("node").arg(script))),
        "bat" if cfg!(windows) => Some(("Windows Batch file", Invocation::new(script))),
        "sh" if !cfg!(windows) => Some(("shell", Invocation::new(script))),
        _ => None,
    }
}
