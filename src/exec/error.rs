// src/exec/error.rs

use std::fmt;

use thiserror::Error;

/// Merged stdout/stderr of one supervised command, line by line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    text: String,
}

impl Transcript {
    pub(crate) fn push_line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Transcript {
    fn from(text: &str) -> Self {
        let mut transcript = Transcript::default();
        for line in text.lines() {
            transcript.push_line(line);
        }
        transcript
    }
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran and exited unsuccessfully. Carries everything it
    /// printed.
    #[error("Failed when running {program} (exit code {code:?}): {transcript}")]
    Failed {
        program: String,
        code: Option<i32>,
        transcript: Transcript,
    },

    #[error("IO error while supervising {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("supervisor worker for {program} stopped unexpectedly: {message}")]
    Worker { program: String, message: String },
}

impl CommandError {
    /// Captured output, when the command got far enough to produce any.
    pub fn transcript(&self) -> Option<&Transcript> {
        match self {
            CommandError::Failed { transcript, .. } => Some(transcript),
            _ => None,
        }
    }
}
