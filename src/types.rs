use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Target platform a phase is executed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Chrome,
    Firefox,
    Safari,
    Ie,
    Web,
    Wp,
}

impl Platform {
    pub const ALL: [Platform; 8] = [
        Platform::Android,
        Platform::Ios,
        Platform::Chrome,
        Platform::Firefox,
        Platform::Safari,
        Platform::Ie,
        Platform::Web,
        Platform::Wp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Chrome => "chrome",
            Platform::Firefox => "firefox",
            Platform::Safari => "safari",
            Platform::Ie => "ie",
            Platform::Web => "web",
            Platform::Wp => "wp",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Platform::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "invalid platform: {other} (expected one of android, ios, chrome, firefox, safari, ie, web, wp)",
                    other = s.trim()
                )
            })
    }
}

/// Which platforms a step applies to.
///
/// Written in phase literals as `"all"` or a comma-separated list such as
/// `"android,firefox,safari"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformSelector {
    All,
    Only(BTreeSet<Platform>),
}

impl PlatformSelector {
    pub fn only(platforms: impl IntoIterator<Item = Platform>) -> Self {
        PlatformSelector::Only(platforms.into_iter().collect())
    }

    pub fn matches(&self, platform: Platform) -> bool {
        match self {
            PlatformSelector::All => true,
            PlatformSelector::Only(set) => set.contains(&platform),
        }
    }
}

impl From<Platform> for PlatformSelector {
    fn from(platform: Platform) -> Self {
        PlatformSelector::only([platform])
    }
}

impl FromStr for PlatformSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(PlatformSelector::All);
        }
        let set = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(Platform::from_str)
            .collect::<Result<BTreeSet<_>, _>>()?;
        if set.is_empty() {
            return Err("empty platform selector".to_string());
        }
        Ok(PlatformSelector::Only(set))
    }
}

impl fmt::Display for PlatformSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformSelector::All => f.write_str("all"),
            PlatformSelector::Only(set) => {
                let names: Vec<&str> = set.iter().map(|p| p.as_str()).collect();
                f.write_str(&names.join(","))
            }
        }
    }
}

/// Run-mode flags for one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunFlags {
    /// Build was triggered externally (e.g. by a CI hook) rather than locally.
    pub external: bool,
    /// Whether packaging should occur at the end of the run.
    pub package: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_parses_lists_and_all() {
        let sel: PlatformSelector = "android, firefox,safari".parse().unwrap();
        assert!(sel.matches(Platform::Android));
        assert!(sel.matches(Platform::Safari));
        assert!(!sel.matches(Platform::Ios));
        assert_eq!(sel.to_string(), "android,firefox,safari");

        let all: PlatformSelector = "ALL".parse().unwrap();
        assert!(Platform::ALL.iter().all(|p| all.matches(*p)));
    }

    #[test]
    fn selector_rejects_unknown_platform() {
        let err = "android,symbian".parse::<PlatformSelector>().unwrap_err();
        assert!(err.contains("symbian"));
        assert!(" , ".parse::<PlatformSelector>().is_err());
    }
}
