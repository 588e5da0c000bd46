use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single metadata provider. Always soft: the caller logs it
/// and moves on to the next provider or to the YouTube fallback.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network or API failure.
    #[error("request failed")]
    Http(#[from] reqwest::Error),

    /// yt-dlp could not be launched at all.
    #[error("could not run {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// yt-dlp ran but reported an error.
    #[error("{program} exited with {status}: {stderr}")]
    Process {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// The provider answered with something we could not parse.
    #[error("malformed response")]
    Malformed(#[from] serde_json::Error),
}

/// The user typed something that is neither a listed number, `0` nor `00`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Invalid, choose 0-{max} or 00")]
    OutOfRange { max: usize },

    #[error("Invalid, enter a number 0-{max} or 00")]
    NotANumber { max: usize },
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no candidates found for \"{query}\"")]
    NoCandidatesFound { query: String },
}

#[derive(Debug, Error)]
#[error("preferences file {} is corrupt", .path.display())]
pub struct CorruptPreferences {
    pub path: PathBuf,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("row {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("unknown metadata source '{0}', expected one of yt, ytm, mb, it")]
    UnknownProvider(String),

    #[error("invalid download URL '{0}', it must start with http:// or https://")]
    InvalidMediaUrl(String),
}
