// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod phases;
pub mod pipeline;
pub mod predicates;
pub mod tasks;
pub mod template;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate_app, load_tool_settings};
use crate::exec::CancelFlag;
use crate::phases::build_phase;
use crate::pipeline::{BuildContext, PhaseDescriptor, Pipeline, Registries};
use crate::types::Platform;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - app config and tool settings loading
/// - the built-in task and predicate registries
/// - the named phase
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config = load_and_validate_app(&args.config)
        .with_context(|| format!("loading app config {}", args.config))?;
    let tools = load_tool_settings(&args.tools)
        .with_context(|| format!("loading tool settings {}", args.tools))?;
    let orig_wd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let registries = Registries::builtin()?;
    let phase = build_phase(args.phase, &args.phase_options())?;
    let platforms = args.platforms();

    let cancel = CancelFlag::new();
    let mut ctx = BuildContext::new(config, tools, orig_wd)
        .with_flags(args.flags())
        .with_cancel(Arc::new(cancel.clone()));

    let pipeline = Pipeline::new(&registries);

    if args.dry_run {
        print_dry_run(&pipeline, &phase, &platforms, &ctx)?;
        return Ok(());
    }

    // Ctrl-C → cancel whatever is running.
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("interrupted; stopping");
        cancel.cancel();
    });

    let reports = pipeline
        .run_phase_for_platforms(&phase, &platforms, &mut ctx)
        .await?;
    for report in &reports {
        debug!(
            platform = %report.platform,
            ran = report.ran.len(),
            skipped = report.skipped,
            "platform done"
        );
        for artifact in report.artifacts() {
            info!(platform = %report.platform, "produced {}", artifact.display());
        }
    }
    Ok(())
}

/// Print the steps that would run per platform after gating.
fn print_dry_run(
    pipeline: &Pipeline<'_>,
    phase: &PhaseDescriptor,
    platforms: &[Platform],
    ctx: &BuildContext,
) -> Result<()> {
    let planned = pipeline.plan(phase, platforms, ctx)?;

    println!("packflow dry-run");
    println!("  phase = {} ({} steps)", phase.name(), phase.len());
    println!();

    for &platform in platforms {
        println!("{platform}:");
        for item in planned.iter().filter(|p| p.platform == platform) {
            println!("  {:>3}. {}", item.index, item.step);
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
