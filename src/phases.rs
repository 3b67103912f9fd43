// src/phases.rs

//! Per-feature phase builder functions and the named phases the CLI runs.
//!
//! Each builder returns the steps for one feature across every platform;
//! [`PhaseBuilder`] concatenates them in order.

use std::fmt;

use clap::ValueEnum;
use serde_json::json;

use crate::errors::Result;
use crate::pipeline::{PhaseBuilder, PhaseDescriptor, StepRecord};
use crate::types::{Platform, PlatformSelector};

/// Where the user's code lives inside each platform's generated project.
pub fn source_location(platform: Platform) -> &'static str {
    match platform {
        Platform::Android => "development/android/assets/src",
        Platform::Ios => "development/ios/*/assets/src",
        Platform::Chrome => "development/chrome/src",
        Platform::Firefox => "development/firefox/resources/f/data/src",
        Platform::Safari => "development/forge.safariextension/src",
        Platform::Ie => "development/ie/src",
        Platform::Web => "development/web/src",
        Platform::Wp => "development/wp/assets/src",
    }
}

fn sel(list: &str) -> Result<PlatformSelector> {
    list.parse()
        .map_err(crate::errors::PackflowError::Configuration)
}

/// Copy the user's source tree into every platform's project.
pub fn copy_user_source_to_template(src: &str, ignore_patterns: &[String]) -> Vec<StepRecord> {
    Platform::ALL
        .iter()
        .map(|&platform| {
            StepRecord::new(platform, "copy_files")
                .kwarg("from", src)
                .kwarg("to", source_location(platform))
                .kwarg("ignore_patterns", json!(ignore_patterns))
        })
        .collect()
}

/// Copy the user's source tree somewhere temporary.
pub fn copy_user_source_to_tempdir(tempdir: &str, ignore_patterns: &[String]) -> Vec<StepRecord> {
    vec![
        StepRecord::new(PlatformSelector::All, "copy_files")
            .kwarg("from", "src")
            .kwarg("to", tempdir)
            .kwarg("ignore_patterns", json!(ignore_patterns)),
    ]
}

pub fn delete_tempdir(tempdir: &str) -> Vec<StepRecord> {
    vec![StepRecord::new(PlatformSelector::All, "remove_files").arg(tempdir)]
}

pub fn run_hook(hook: &str, dir: &str) -> Vec<StepRecord> {
    vec![
        StepRecord::new(PlatformSelector::All, "run_hook")
            .kwarg("hook", hook)
            .kwarg("dir", dir),
    ]
}

/// Insert the platform's bridge script into every HTML `<head>`.
pub fn include_platform_in_html() -> Vec<StepRecord> {
    let head = |platform: Platform, replace: &str| {
        StepRecord::new(platform, "find_and_replace_in_dir")
            .arg(source_location(platform))
            .kwarg("find", "<head>")
            .kwarg("replace", replace)
    };
    vec![
        head(
            Platform::Android,
            "<head><script src='file:///android_asset/forge/all.js'></script>",
        ),
        head(
            Platform::Ios,
            "<head><script src='%{back_to_parent}%forge/all.js'></script>",
        ),
        head(
            Platform::Firefox,
            "<head><script src='%{back_to_parent}%forge/all.js'></script>",
        ),
        head(Platform::Chrome, "<head><script src='/forge/all.js'></script>"),
        head(
            Platform::Safari,
            "<head><script src='%{back_to_parent}%forge/all.js'></script>",
        ),
        head(
            Platform::Ie,
            "<head><script src='%{back_to_parent}%forge/all.js'></script>",
        ),
        head(Platform::Web, "<head><script src='/_forge/all.js'></script>"),
        head(Platform::Wp, "<head><script src='/assets/forge/all.js'></script>"),
        head(
            Platform::Wp,
            "<head><script>\n\
             function window$forge$_receive(result) {\n\
             \ttry {\n\
             \t\twindow.forge._receive(JSON.parse(result));\n\
             \t} catch (e) {\n\
             \t\tforge.logging.error(\"window$forge$_receive -> \" + e);\n\
             \t}\n\
             }\n\
             </script>",
        ),
    ]
}

fn icon_dir(platform: Platform, server: bool) -> &'static str {
    match (platform, server) {
        (Platform::Android, false) => "development/android/res/",
        (Platform::Android, true) => "android/template-app/res/",
        (Platform::Safari, false) => "development/forge.safariextension/",
        (Platform::Safari, true) => "forge.safariextension/",
        (Platform::Firefox, false) => "development/firefox/",
        (Platform::Firefox, true) => "firefox/template-app/output/",
        (Platform::Ios, false) => "development/ios/*.app/",
        (Platform::Ios, true) => "ios/",
        (Platform::Wp, false) => "development/wp/dist/",
        (Platform::Wp, true) => "wp/dist/",
        (_, false) => "development/",
        (_, true) => "",
    }
}

/// Populate per-platform icon entries, then copy icons and launch images
/// into place.
pub fn include_icons(server: bool) -> Vec<StepRecord> {
    let populate = |platform: Platform, sizes: serde_json::Value| {
        StepRecord::new(platform, "populate_icons")
            .arg(platform.as_str())
            .arg(sizes)
    };
    let copy = |platform: Platform, predicate: &str, from: String, to: &str| {
        StepRecord::new(platform, "copy_files")
            .when(predicate)
            .kwarg("from", from)
            .kwarg("to", format!("{}{to}", icon_dir(platform, server)))
    };
    let icon = |platform: Platform, size: &str, to: &str| {
        copy(
            platform,
            &format!("have_{platform}_icons"),
            format!("${{modules[\"icons\"][\"{platform}\"][\"{size}\"]}}"),
            to,
        )
    };
    let launch = |platform: Platform, predicate: &str, image: &str, to: &str| {
        copy(
            platform,
            predicate,
            format!("${{modules[\"launchimage\"][\"{image}\"]}}"),
            to,
        )
    };

    vec![
        populate(Platform::Android, json!([36, 48, 72])),
        populate(Platform::Chrome, json!([16, 48, 128])),
        populate(Platform::Firefox, json!([32, 64])),
        populate(Platform::Ios, json!([57, 72, 114])),
        populate(Platform::Safari, json!([32, 48, 64])),
        populate(Platform::Wp, json!([62, 99, 173])),
        icon(Platform::Android, "36", "drawable-ldpi/icon.png"),
        icon(Platform::Android, "48", "drawable-mdpi/icon.png"),
        icon(Platform::Android, "72", "drawable-hdpi/icon.png"),
        icon(Platform::Safari, "32", "icon-32.png"),
        icon(Platform::Safari, "48", "icon-48.png"),
        icon(Platform::Safari, "64", "icon-64.png"),
        icon(Platform::Firefox, "32", "icon.png"),
        icon(Platform::Firefox, "64", "icon64.png"),
        icon(Platform::Ios, "57", "normal.png"),
        icon(Platform::Ios, "72", "ipad.png"),
        icon(Platform::Ios, "114", "retina.png"),
        icon(Platform::Wp, "62", "ApplicationIcon.png"),
        icon(Platform::Wp, "99", "Marketplace.png"),
        icon(Platform::Wp, "173", "Background.png"),
        launch(Platform::Ios, "have_ios_launch", "iphone", "Default~iphone.png"),
        launch(
            Platform::Ios,
            "have_ios_launch",
            "iphone-retina",
            "Default@2x~iphone.png",
        ),
        launch(Platform::Ios, "have_ios_launch", "ipad", "Default~ipad.png"),
        launch(
            Platform::Ios,
            "have_ios_launch",
            "ipad-landscape",
            "Default-Landscape~ipad.png",
        ),
        launch(
            Platform::Wp,
            "have_wp_launch",
            "wp-landscape",
            "SplashScreenImage.jpg",
        ),
    ]
}

fn replace_in(selector: PlatformSelector, files: &[&str], find: &str, replace: &str) -> StepRecord {
    files
        .iter()
        .fold(StepRecord::new(selector, "find_and_replace"), |step, file| {
            step.arg(*file)
        })
        .kwarg("find", find)
        .kwarg("replace", replace)
}

/// Write the app name into each platform's manifest.
pub fn include_name() -> Result<Vec<StepRecord>> {
    Ok(vec![
        StepRecord::new(sel("android,firefox,safari")?, "populate_xml_safe_name"),
        StepRecord::new(sel("chrome,ie,wp")?, "populate_json_safe_name"),
        replace_in(
            Platform::Android.into(),
            &["development/android/res/values/strings.xml"],
            "APP_NAME_HERE",
            "${xml_safe_name}",
        ),
        replace_in(
            Platform::Chrome.into(),
            &["development/chrome/manifest.json"],
            "APP_NAME_HERE",
            "${json_safe_name}",
        ),
        replace_in(
            Platform::Firefox.into(),
            &["development/firefox/install.rdf"],
            "APP_NAME_HERE",
            "${xml_safe_name}",
        ),
        replace_in(
            Platform::Safari.into(),
            &["development/forge.safariextension/Info.plist"],
            "APP_NAME_HERE",
            "${xml_safe_name}",
        ),
        replace_in(
            Platform::Ie.into(),
            &[
                "development/ie/manifest.json",
                "development/ie/dist/setup-x86.nsi",
                "development/ie/dist/setup-x64.nsi",
            ],
            "APP_NAME_HERE",
            "${json_safe_name}",
        ),
        replace_in(
            Platform::Wp.into(),
            &["development/wp/Properties/WMAppManifest.xml"],
            "APP_NAME_HERE",
            "${json_safe_name}",
        ),
    ])
}

/// Derive package names and write them (and the uuid) into manifests.
pub fn include_uuid() -> Result<Vec<StepRecord>> {
    Ok(vec![
        StepRecord::new(sel("android,firefox,safari,ios,ie")?, "populate_package_names"),
        replace_in(
            Platform::Android.into(),
            &[
                "development/android/res/values/strings.xml",
                "development/android/AndroidManifest.xml",
            ],
            "PACKAGE_NAME_HERE",
            "${modules.package_names.android}",
        ),
        replace_in(
            Platform::Firefox.into(),
            &[
                "development/firefox/install.rdf",
                "development/firefox/harness-options.json",
            ],
            "PACKAGE_NAME_HERE",
            "${modules.package_names.firefox}",
        ),
        replace_in(
            Platform::Safari.into(),
            &["development/forge.safariextension/Info.plist"],
            "PACKAGE_NAME_HERE",
            "${modules.package_names.safari}",
        ),
        replace_in(
            Platform::Ie.into(),
            &["development/ie/manifest.json"],
            "UUID_HERE",
            "${uuid}",
        ),
        replace_in(
            Platform::Ie.into(),
            &[
                "development/ie/dist/setup-x86.nsi",
                "development/ie/dist/setup-x64.nsi",
            ],
            "MS_CLSID_HERE",
            "${modules.package_names.ie}",
        ),
    ])
}

pub fn include_author() -> Vec<StepRecord> {
    vec![
        replace_in(
            Platform::Firefox.into(),
            &[
                "development/firefox/install.rdf",
                "development/firefox/harness-options.json",
            ],
            "AUTHOR_HERE",
            "${author}",
        ),
        replace_in(
            Platform::Safari.into(),
            &["development/forge.safariextension/Info.plist"],
            "AUTHOR_HERE",
            "${author}",
        ),
        replace_in(
            Platform::Ie.into(),
            &[
                "development/ie/manifest.json",
                "development/ie/dist/setup-x86.nsi",
                "development/ie/dist/setup-x64.nsi",
            ],
            "AUTHOR_HERE",
            "${author}",
        ),
    ]
}

pub fn include_description() -> Vec<StepRecord> {
    vec![
        replace_in(
            Platform::Chrome.into(),
            &["development/chrome/manifest.json"],
            "DESCRIPTION_HERE",
            "${description}",
        ),
        replace_in(
            Platform::Firefox.into(),
            &[
                "development/firefox/install.rdf",
                "development/firefox/harness-options.json",
            ],
            "DESCRIPTION_HERE",
            "${description}",
        ),
        replace_in(
            Platform::Safari.into(),
            &["development/forge.safariextension/Info.plist"],
            "DESCRIPTION_HERE",
            "${description}",
        ),
        replace_in(
            Platform::Ie.into(),
            &[
                "development/ie/manifest.json",
                "development/ie/dist/setup-x86.nsi",
                "development/ie/dist/setup-x64.nsi",
            ],
            "DESCRIPTION_HERE",
            "${description}",
        ),
    ]
}

/// Config paths holding URLs that are relative to the user's source tree.
pub const URL_LOCATIONS: &[&str] = &[
    "modules.activations.[].scripts.[]",
    "modules.activations.[].styles.[]",
    "modules.icons.*",
    "modules.launchimage.*",
    "modules.button.default_icon",
    "modules.button.default_popup",
    "modules.button.default_icons.*",
];

pub fn resolve_urls() -> Result<Vec<StepRecord>> {
    let step = URL_LOCATIONS
        .iter()
        .try_fold(StepRecord::new(PlatformSelector::All, "resolve_urls"), |step, raw| {
            step.path_arg(raw)
        })?;
    Ok(vec![step])
}

pub fn run_android_phase(device: Option<&str>, apk: Option<&str>, purge: bool) -> Vec<StepRecord> {
    let mut step = StepRecord::new(Platform::Android, "run_android").kwarg("purge", purge);
    if let Some(device) = device {
        step = step.kwarg("device", device);
    }
    if let Some(apk) = apk {
        step = step.kwarg("apk", apk);
    }
    vec![step]
}

/// Phases selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PhaseName {
    /// Resolve URLs, place icons, copy the user's code and fill in manifests.
    Generate,
    /// Install and launch on a device, then follow its log.
    Run,
    /// Run the scripts of one hook directory.
    Hook,
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PhaseName::Generate => "generate",
            PhaseName::Run => "run",
            PhaseName::Hook => "hook",
        })
    }
}

/// Inputs the named phases take from the command line.
#[derive(Debug, Clone, Default)]
pub struct PhaseOptions {
    pub src: String,
    pub ignore_patterns: Vec<String>,
    pub device: Option<String>,
    pub apk: Option<String>,
    pub purge: bool,
    pub hook: Option<String>,
    pub hook_dir: String,
}

pub fn generate_phase(opts: &PhaseOptions) -> Result<PhaseDescriptor> {
    Ok(PhaseBuilder::new("generate")
        .extend(resolve_urls()?)
        .extend(include_icons(false))
        .extend(copy_user_source_to_template(&opts.src, &opts.ignore_patterns))
        .extend(include_platform_in_html())
        .extend(include_name()?)
        .extend(include_uuid()?)
        .extend(include_author())
        .extend(include_description())
        .build())
}

pub fn run_phase(opts: &PhaseOptions) -> PhaseDescriptor {
    PhaseBuilder::new("run")
        .extend(run_android_phase(
            opts.device.as_deref(),
            opts.apk.as_deref(),
            opts.purge,
        ))
        .build()
}

pub fn hook_phase(opts: &PhaseOptions) -> Result<PhaseDescriptor> {
    let hook = opts.hook.as_deref().ok_or_else(|| {
        crate::errors::PackflowError::config("the hook phase needs a hook name (--hook)")
    })?;
    Ok(PhaseBuilder::new(format!("hook:{hook}"))
        .extend(run_hook(hook, &opts.hook_dir))
        .build())
}

/// Build the named phase.
pub fn build_phase(name: PhaseName, opts: &PhaseOptions) -> Result<PhaseDescriptor> {
    match name {
        PhaseName::Generate => generate_phase(opts),
        PhaseName::Run => Ok(run_phase(opts)),
        PhaseName::Hook => hook_phase(opts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Registries;

    fn opts() -> PhaseOptions {
        PhaseOptions {
            src: "src".into(),
            hook: Some("prebuild".into()),
            hook_dir: "development".into(),
            ..PhaseOptions::default()
        }
    }

    #[test]
    fn named_phases_validate_against_builtin_registries() {
        let registries = Registries::builtin().unwrap();
        for name in [PhaseName::Generate, PhaseName::Run, PhaseName::Hook] {
            let phase = build_phase(name, &opts()).unwrap();
            phase.validate(&registries).unwrap();
        }
    }

    #[test]
    fn copy_source_has_one_step_per_platform() {
        let steps = copy_user_source_to_template("src", &[]);
        assert_eq!(steps.len(), Platform::ALL.len());
        for (step, platform) in steps.iter().zip(Platform::ALL) {
            assert!(step.selector.matches(platform));
            assert_eq!(
                step.args.require_str("copy_files", "to").unwrap(),
                source_location(platform)
            );
        }
    }

    #[test]
    fn icon_steps_are_gated_and_templated() {
        let steps = include_icons(false);
        let android_copy = steps
            .iter()
            .find(|s| s.task == "copy_files" && s.selector.matches(Platform::Android))
            .unwrap();
        assert_eq!(android_copy.predicate.as_deref(), Some("have_android_icons"));
        assert_eq!(
            android_copy.args.require_str("copy_files", "from").unwrap(),
            "${modules[\"icons\"][\"android\"][\"36\"]}"
        );
    }

    #[test]
    fn hook_phase_requires_a_name() {
        let no_hook = PhaseOptions::default();
        assert!(build_phase(PhaseName::Hook, &no_hook).is_err());
    }
}
