// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::phases::{PhaseName, PhaseOptions};
use crate::types::{Platform, RunFlags};

/// Command-line arguments for `packflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "packflow",
    version,
    about = "Run declarative, platform-gated build phases for a packaged app.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the app config (JSON).
    #[arg(long, value_name = "PATH", default_value = "src/config.json")]
    pub config: String,

    /// Path to the machine-local tool settings (TOML). Missing is fine.
    #[arg(long, value_name = "PATH", default_value = "local_config.toml")]
    pub tools: String,

    /// Platform to run the phase for. Repeat for several; defaults to all.
    #[arg(long = "platform", value_name = "PLATFORM", value_parser = parse_platform)]
    pub platforms: Vec<Platform>,

    /// Phase to run.
    #[arg(long, value_enum, default_value_t = PhaseName::Generate)]
    pub phase: PhaseName,

    /// The build was triggered externally rather than from a developer's
    /// machine.
    #[arg(long)]
    pub external: bool,

    /// Package the result at the end of the run.
    #[arg(long)]
    pub package: bool,

    /// Android device to run on (the first attached device otherwise).
    #[arg(long, value_name = "ID")]
    pub device: Option<String>,

    /// APK to install before launching (`run` phase).
    #[arg(long, value_name = "PATH")]
    pub apk: Option<String>,

    /// Uninstall the previous build first (`run` phase).
    #[arg(long)]
    pub purge: bool,

    /// Directory holding the user's code (`generate` phase).
    #[arg(long, value_name = "DIR", default_value = "src")]
    pub src: String,

    /// Glob of files not to copy from the user's code. Repeatable.
    #[arg(long = "ignore", value_name = "GLOB")]
    pub ignore_patterns: Vec<String>,

    /// Hook to run (`hook` phase).
    #[arg(long, value_name = "NAME")]
    pub hook: Option<String>,

    /// Directory hook scripts run in.
    #[arg(long, value_name = "DIR", default_value = "development")]
    pub hook_dir: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PACKFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the phase and print the steps that would run, without
    /// running any task.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    pub fn flags(&self) -> RunFlags {
        RunFlags {
            external: self.external,
            package: self.package,
        }
    }

    pub fn platforms(&self) -> Vec<Platform> {
        if self.platforms.is_empty() {
            Platform::ALL.to_vec()
        } else {
            self.platforms.clone()
        }
    }

    pub fn phase_options(&self) -> PhaseOptions {
        PhaseOptions {
            src: self.src.clone(),
            ignore_patterns: self.ignore_patterns.clone(),
            device: self.device.clone(),
            apk: self.apk.clone(),
            purge: self.purge,
            hook: self.hook.clone(),
            hook_dir: self.hook_dir.clone(),
        }
    }
}

fn parse_platform(s: &str) -> Result<Platform, String> {
    s.parse()
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
