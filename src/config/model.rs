// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Machine-local tool settings as read from a TOML file.
///
/// ```toml
/// [supervisor]
/// poll_interval_ms = 1000
/// termination_grace_ms = 2000
///
/// [android]
/// sdk = "/opt/android-sdk-linux"
/// ```
///
/// All sections are optional and have reasonable defaults. Tables the model
/// does not know about are still reachable through dotted lookups on
/// [`crate::config::ToolSettings`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ToolSettingsFile {
    #[serde(default)]
    pub supervisor: SupervisorSection,

    #[serde(default)]
    pub android: AndroidSection,
}

/// `[supervisor]` section: timing knobs for the process supervisor.
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorSection {
    /// How often interruptible runs check for cancellation.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long each termination primitive is given to take effect.
    #[serde(default = "default_termination_grace_ms")]
    pub termination_grace_ms: u64,

    /// Watchdog deadline for quick helper-service queries (device listing).
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Watchdog deadline for slow helper-service operations (install, launch).
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Extra attempts made when a probe comes back empty.
    #[serde(default = "default_probe_retries")]
    pub probe_retries: u32,

    /// Pause between probe attempts.
    #[serde(default = "default_probe_pause_ms")]
    pub probe_pause_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_termination_grace_ms() -> u64 {
    2000
}

fn default_probe_timeout_secs() -> u64 {
    10
}

fn default_command_timeout_secs() -> u64 {
    60
}

fn default_probe_retries() -> u32 {
    3
}

fn default_probe_pause_ms() -> u64 {
    2000
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            termination_grace_ms: default_termination_grace_ms(),
            probe_timeout_secs: default_probe_timeout_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            probe_retries: default_probe_retries(),
            probe_pause_ms: default_probe_pause_ms(),
        }
    }
}

/// `[android]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AndroidSection {
    /// Location of the Android SDK. Relative paths are resolved against the
    /// directory the build was started from.
    #[serde(default)]
    pub sdk: Option<PathBuf>,

    /// Activity launched after install.
    #[serde(default)]
    pub launch_activity: Option<String>,
}
