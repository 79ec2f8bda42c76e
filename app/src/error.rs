use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading a mock specification or activating a
/// session.
///
/// Deactivation never produces one of these: cleanup failures are logged
/// and swallowed because deactivation usually runs while another failure is
/// unwinding.
#[derive(Error, Debug)]
pub enum MockError {
    /// The temporary directory holding the mocked commands could not be created.
    #[error("failed to create temporary directory for mocked commands: {0}")]
    TempDir(#[source] io::Error),

    /// Writing a generated script failed.
    #[error("failed to write mock script `{path}`: {source}")]
    WriteScript {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The executable bit could not be set on a generated script.
    #[error("failed to make mock script `{path}` executable: {source}")]
    Permissions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The command name cannot be used as a file name inside the temp dir.
    #[error("invalid command name {0:?}: must be a plain file name")]
    InvalidCommandName(String),

    /// An exact key holds a NUL byte, which no real argument can carry.
    #[error("mock for `{command}` has an argument key containing NUL: {args:?}")]
    UnmatchableArguments { command: String, args: Vec<String> },

    /// The mock directory cannot be written into `PATH`, usually because its
    /// path contains the separator.
    #[error("cannot add `{path}` to PATH: {source}")]
    PathEntry {
        path: PathBuf,
        #[source]
        source: std::env::JoinPathsError,
    },

    /// This thread already holds an active session.
    #[error("a ShellCommandMock session is already active on this thread")]
    SessionActive,

    /// A spec file could not be read.
    #[error("failed to read mock spec `{path}`: {source}")]
    ReadSpec {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid TOML mock spec: {0}")]
    TomlSpec(#[from] toml::de::Error),

    #[error("invalid JSON mock spec: {0}")]
    JsonSpec(#[from] serde_json::Error),

    /// The spec file extension is neither `.toml` nor `.json`.
    #[error("unsupported mock spec format for `{0}` (expected .toml or .json)")]
    UnsupportedSpecFormat(PathBuf),

    /// Wrapper for other I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, MockError>;
