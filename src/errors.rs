// dbsync/src/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown environment '{0}': add it under \"environments\" in the config file")]
    UnknownEnvironment(String),

    #[error("Environment '{0}' has no \"server\" entry, so it cannot be used as a remote")]
    MissingServer(String),

    #[error("Unsupported database adapter '{0}': only postgres and mysql URLs are supported")]
    UnsupportedAdapter(String),

    #[error("Only PostgreSQL or MySQL on both sides is supported (local: {local}, remote: {remote})")]
    AdapterMismatch { local: String, remote: String },

    #[error("Pushing local data to the remote environment is disabled (disallow_pushing is set)")]
    PushDisallowed,

    #[error("{0} executable not found in PATH")]
    MissingExecutable(String),

    #[error("Unknown task '{0}': run with --list to see available tasks")]
    UnknownTask(String),

    #[error("Confirmation required but stdin is not a terminal; set SKIP_DATA_SYNC_CONFIRM=true to proceed")]
    NotATerminal,

    #[error("Command `{program}` failed on {host} with status: {status}")]
    CommandFailed {
        program: String,
        host: String,
        status: String,
    },
}
