pub mod command;

use anyhow::{Context, Result};
use std::path::PathBuf;
use which::which;

use crate::errors::SyncError;

/// Finds an executable in the system PATH.
pub fn find_executable(name: &str) -> Result<PathBuf> {
    which(name)
        .map_err(|_| SyncError::MissingExecutable(name.to_string()))
        .with_context(|| format!("Please ensure {} is installed and in your PATH.", name))
}

/// Environment flags count as set only for a case-insensitive "true".
pub fn env_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Joins a path on the remote host, which is always a Unix path.
pub fn remote_join(base: &str, relative: &str) -> String {
    let relative = relative.trim_start_matches("./");
    if relative.is_empty() || relative == "." {
        return base.trim_end_matches('/').to_string();
    }
    if relative.starts_with('/') {
        return relative.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), relative)
}
