// src/config/path.rs

//! Typed dot-path expressions into the configuration tree.
//!
//! A path such as `modules.activations.[].scripts.[]` is a dot-separated
//! list of segments:
//!
//! - a literal key (`modules`) descends into a mapping,
//! - `[]` visits every element of a sequence,
//! - `*` visits every value of a mapping.
//!
//! Paths are parsed once (when a phase is built) and carried around as
//! [`ConfigPath`] values afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    AllElements,
    AllValues,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::AllElements => f.write_str("[]"),
            Segment::AllValues => f.write_str("*"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("config path is empty")]
    Empty,
    #[error("config path '{path}' has an empty segment at position {position}")]
    EmptySegment { path: String, position: usize },
}

/// A parsed config path expression. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigPath {
    segments: Vec<Segment>,
}

impl ConfigPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let segments = raw
            .split('.')
            .enumerate()
            .map(|(position, part)| match part {
                "" => Err(PathError::EmptySegment {
                    path: raw.to_string(),
                    position,
                }),
                "[]" => Ok(Segment::AllElements),
                "*" => Ok(Segment::AllValues),
                key => Ok(Segment::Key(key.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl FromStr for ConfigPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigPath::parse(s)
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for ConfigPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ConfigPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_segments() {
        let path = ConfigPath::parse("modules.activations.[].scripts.*").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("modules".into()),
                Segment::Key("activations".into()),
                Segment::AllElements,
                Segment::Key("scripts".into()),
                Segment::AllValues,
            ]
        );
        assert_eq!(path.to_string(), "modules.activations.[].scripts.*");
    }

    #[test]
    fn rejects_empty_and_dangling_dots() {
        assert_eq!(ConfigPath::parse("  "), Err(PathError::Empty));
        assert!(matches!(
            ConfigPath::parse("a..b"),
            Err(PathError::EmptySegment { position: 1, .. })
        ));
        assert!(ConfigPath::parse("a.").is_err());
    }
}
