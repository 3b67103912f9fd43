// src/tasks/android.rs

//! The Android device bridge and the `run_android` task.
//!
//! `adb` runs a long-lived server process that is prone to hanging and to
//! losing track of attached devices. Every `adb` call therefore runs under the
//! watchdog, device enumeration uses the retry probe, and both restart the
//! server (kill every `adb` process, start a fresh one) when needed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tracing::{Level, debug, error, info};

use crate::config::SupervisorSection;
use crate::errors::{PackflowError, Result};
use crate::exec::{
    CancelCheck, CommandError, Invocation, ManagedHelper, Outcome, RetryPolicy, RunOptions,
    Supervisor, Transcript, probe_with_retry,
};
use crate::pipeline::{BuildContext, StepArgs, Task, TaskFuture, TaskOutput};

/// Activity started after install unless `android.launch_activity` says
/// otherwise.
pub const DEFAULT_LAUNCH_ACTIVITY: &str = "io.trigger.forge.android.template.LoadActivity";

/// Device handles listed in `adb devices` output.
///
/// A line names a device when its first tab-separated word is longer than
/// five characters and contains no space.
pub fn scrape_devices(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.split('\t').next())
        .filter(|word| word.len() > 5 && !word.contains(' '))
        .map(str::to_string)
        .collect()
}

/// Location of `adb` inside an SDK.
pub fn adb_path(sdk: &Path) -> PathBuf {
    let exe = if cfg!(windows) { "adb.exe" } else { "adb" };
    sdk.join("platform-tools").join(exe)
}

/// Supervised access to one `adb` binary.
#[derive(Debug, Clone)]
pub struct DeviceBridge {
    supervisor: Supervisor,
    adb: PathBuf,
    server: ManagedHelper,
    command_timeout: Duration,
    probe_timeout: Duration,
    retry: RetryPolicy,
}

impl DeviceBridge {
    pub fn new(supervisor: Supervisor, adb: impl Into<PathBuf>, settings: &SupervisorSection) -> Self {
        let adb = adb.into();
        let server = ManagedHelper::new(
            supervisor.clone(),
            if cfg!(windows) { "adb.exe" } else { "adb" },
            Invocation::new(&adb).arg("start-server"),
        );
        Self {
            supervisor,
            adb,
            server,
            command_timeout: Duration::from_secs(settings.command_timeout_secs),
            probe_timeout: Duration::from_secs(settings.probe_timeout_secs),
            retry: RetryPolicy::from_settings(settings),
        }
    }

    fn adb(&self) -> Invocation {
        Invocation::new(&self.adb)
    }

    /// Start the `adb` server if it is not running, detached from this
    /// process, and wait for the start command to finish.
    pub async fn start_server(&self) -> Result<()> {
        info!("Starting ADB if not running");
        self.supervisor
            .launch_detached(&self.adb().arg("start-server"), true)
            .await?;
        Ok(())
    }

    /// Run one `adb` command under the watchdog.
    pub async fn run(&self, args: &[&str], deadline: Duration) -> Result<Transcript> {
        let inv = self.adb().args(args);
        Ok(self
            .supervisor
            .run_with_watchdog(&inv, deadline, &self.server)
            .await?)
    }

    /// Attached devices, retrying while none are visible.
    pub async fn devices(&self) -> Result<Vec<String>> {
        let bridge = self;
        let found = probe_with_retry(self.retry, &self.server, move || async move {
            let inv = bridge.adb().arg("devices");
            let out = bridge
                .supervisor
                .run_with_watchdog(&inv, bridge.probe_timeout, &bridge.server)
                .await?;
            Ok::<_, CommandError>(scrape_devices(out.as_str()))
        })
        .await?;
        Ok(found)
    }

    pub async fn uninstall(&self, package: &str) -> Result<()> {
        self.run(&["uninstall", package], Duration::from_secs(30))
            .await?;
        Ok(())
    }

    pub async fn install(&self, device: &str, apk: &Path) -> Result<()> {
        info!("Installing apk");
        let apk = apk.to_string_lossy().into_owned();
        let out = self
            .run(&["-s", device, "install", "-r", apk.as_str()], self.command_timeout)
            .await?;
        debug!("{out}");
        Ok(())
    }

    pub async fn launch(&self, device: &str, component: &str) -> Result<()> {
        let out = self
            .run(
                &["-s", device, "shell", "am", "start", "-n", component],
                self.command_timeout,
            )
            .await?;
        debug!("{out}");
        Ok(())
    }

    /// Clear the device log, then stream it until cancelled.
    pub async fn follow_log(
        &self,
        device: &str,
        cancel: Option<std::sync::Arc<dyn CancelCheck>>,
    ) -> Result<Outcome> {
        info!("Clearing android log");
        let info_level = RunOptions::default().level(Level::INFO);
        self.supervisor
            .run_streamed(&self.adb().args(["-s", device, "logcat", "-c"]), &info_level)
            .await?;

        info!("Showing android log");
        let mut opts = info_level;
        if let Some(cancel) = cancel {
            opts = opts.cancellable(cancel);
        }
        let logcat = self
            .adb()
            .args(["-s", device, "logcat", "WebCore:D", "Forge:D", "*:s"]);
        Ok(self.supervisor.run_streamed(&logcat, &opts).await?)
    }
}

/// Pick `wanted` if attached, else the first attached device.
pub fn choose_device(available: &[String], wanted: Option<&str>) -> Result<String> {
    match wanted {
        Some(device) if available.iter().any(|d| d == device) => {
            info!("Using specified android device {device}");
            Ok(device.to_string())
        }
        Some(device) => {
            error!("No such device \"{device}\"");
            error!("The available devices are:");
            error!("{}", available.join("\n"));
            Err(PackflowError::config(format!(
                "no such android device \"{device}\""
            )))
        }
        None => {
            let first = available.first().ok_or_else(|| {
                PackflowError::config("no android device found; attach a device or start an emulator")
            })?;
            info!("No android device specified, defaulting to {first}");
            Ok(first.clone())
        }
    }
}

/// `run_android(device=, apk=, purge=false)`
///
/// Starts the `adb` server, picks a device, optionally uninstalls the previous
/// build, installs `apk` when given, launches the app and follows its log
/// until cancelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunAndroid;

impl RunAndroid {
    fn sdk(ctx: &BuildContext) -> Result<PathBuf> {
        let sdk = ctx
            .tools
            .file
            .android
            .sdk
            .clone()
            .or_else(|| ctx.tools.get_str("android.sdk").map(PathBuf::from))
            .ok_or_else(|| {
                PackflowError::config(
                    "Couldn't find Android SDK, please set android.sdk in your local config",
                )
            })?;
        Ok(ctx.expand_path([sdk]))
    }

    fn package_name(ctx: &mut BuildContext) -> Result<String> {
        let uuid = ctx
            .config_str("uuid")
            .ok_or_else(|| PackflowError::config("app config has no 'uuid'"))?
            .to_string();
        let names = ctx
            .modules_mut()?
            .entry("package_names")
            .or_insert_with(|| Value::Object(Default::default()));
        let names = names
            .as_object_mut()
            .ok_or_else(|| PackflowError::config("modules.package_names must be an object"))?;
        let android = names
            .entry("android")
            .or_insert_with(|| Value::String(format!("io.trigger.forge{uuid}")));
        android
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PackflowError::config("modules.package_names.android must be a string"))
    }
}

impl Task for RunAndroid {
    fn run<'a>(&'a self, ctx: &'a mut BuildContext, args: &'a StepArgs) -> TaskFuture<'a> {
        Box::pin(async move {
            let sdk = Self::sdk(ctx)?;
            let bridge = DeviceBridge::new(ctx.supervisor(), adb_path(&sdk), &ctx.tools.file.supervisor);

            bridge.start_server().await?;

            info!("Looking for Android device");
            let available = bridge.devices().await?;
            let device = choose_device(&available, args.str_kw("run_android", "device")?)?;

            let package = Self::package_name(ctx)?;
            if args.bool_kw("run_android", "purge", false)? {
                bridge.uninstall(&package).await?;
            }
            if let Some(apk) = args.str_kw("run_android", "apk")? {
                let apk = ctx.expand_path([ctx.render(apk)?]);
                bridge.install(&device, &apk).await?;
            }

            let activity = ctx
                .tools
                .file
                .android
                .launch_activity
                .clone()
                .unwrap_or_else(|| DEFAULT_LAUNCH_ACTIVITY.to_string());
            bridge.launch(&device, &format!("{package}/{activity}")).await?;

            match bridge.follow_log(&device, ctx.cancel_check().cloned()).await? {
                Outcome::Cancelled(_) => Ok(TaskOutput::Cancelled),
                Outcome::Completed(_) => Ok(TaskOutput::Done),
            }
        })
    }

    fn check_args(&self, args: &StepArgs) -> Result<()> {
        args.str_kw("run_android", "device")?;
        args.str_kw("run_android", "apk")?;
        args.bool_kw("run_android", "purge", false)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrapes_device_lines() {
        let out = "List of devices attached\nemulator-5554\tdevice\n0123456789ABCDEF\tdevice\n\n* daemon started successfully *\n";
        assert_eq!(
            scrape_devices(out),
            vec!["emulator-5554".to_string(), "0123456789ABCDEF".to_string()]
        );
        assert!(scrape_devices("List of devices attached\n\n").is_empty());
    }

    #[test]
    fn choose_device_prefers_requested() {
        let available = vec!["emulator-5554".to_string(), "HT4CTJT00053".to_string()];
        assert_eq!(
            choose_device(&available, Some("HT4CTJT00053")).unwrap(),
            "HT4CTJT00053"
        );
        assert_eq!(choose_device(&available, None).unwrap(), "emulator-5554");
        assert!(choose_device(&available, Some("nope-device")).is_err());
        assert!(choose_device(&[], None).is_err());
    }
}
