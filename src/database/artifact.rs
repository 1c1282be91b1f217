// dbsync/src/database/artifact.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::SyncError;
use crate::utils::command::{Host, Invocation};
use crate::utils::remote_join;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// Compression applied to dump artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compressor {
    #[default]
    Gzip,
    Bzip2,
}

impl Compressor {
    pub fn program(&self) -> &'static str {
        match self {
            Compressor::Gzip => "gzip",
            Compressor::Bzip2 => "bzip2",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Compressor::Gzip => "gz",
            Compressor::Bzip2 => "bz2",
        }
    }

    /// Compresses `path` in place, leaving `<path>.<ext>`.
    pub fn compress(&self, host: &Host, path: &str) -> Invocation {
        Invocation::new(host.clone(), self.program())
            .arg("--force")
            .arg(path)
    }

    /// Decompresses `path` next to itself, keeping the compressed file.
    pub fn decompress(&self, host: &Host, path: &str) -> Invocation {
        Invocation::new(host.clone(), self.program())
            .args(["--decompress", "--keep", "--force"])
            .arg(path)
    }
}

/// A timestamped dump file: `<database>_<YYYY-MM-DD-HHMMSS>.sql.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpArtifact {
    pub database: String,
    pub timestamp: String,
    pub compressor: Compressor,
}

impl DumpArtifact {
    pub fn new(database: &str, compressor: Compressor, at: DateTime<Local>) -> Self {
        DumpArtifact {
            database: database.to_string(),
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            compressor,
        }
    }

    /// Name of the uncompressed SQL file the dump tool writes.
    pub fn sql_name(&self) -> String {
        format!("{}_{}.sql", self.database, self.timestamp)
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.sql_name(), self.compressor.extension())
    }
}

/// Strips the compressor extension from an artifact path.
pub fn sql_path_for(compressed: &str, compressor: Compressor) -> String {
    compressed
        .strip_suffix(&format!(".{}", compressor.extension()))
        .unwrap_or(compressed)
        .to_string()
}

/// Directory under `dump_dir` that holds artifacts downloaded from `environment`.
///
/// Pulled dumps are kept apart per environment so a cached dump is only ever
/// restored for the environment it came from. Push dumps stay in `dump_dir`
/// itself and are never picked up as a cache.
pub fn download_dir(dump_dir: &str, environment: &str) -> Result<String, SyncError> {
    if environment.is_empty() || environment.contains('/') || environment.starts_with('.') {
        return Err(SyncError::Config(format!(
            "Environment name '{}' cannot be used as a dump directory",
            environment
        )));
    }
    Ok(remote_join(dump_dir, environment))
}

/// Finds the newest previously downloaded artifact of `database` in `dir`.
pub fn find_latest_local(dir: &Path, database: &str, compressor: Compressor) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let prefix = format!("{}_", database);
    let suffix = format!(".sql.{}", compressor.extension());
    let mut newest: Option<(NaiveDateTime, PathBuf)> = None;

    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list dump directory {}", dir.display()))? {
        let entry = entry.with_context(|| format!("Failed to read entry in {}", dir.display()))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };

        let Some(stamp) = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(&suffix))
        else {
            continue;
        };
        // A different database sharing our prefix leaves a non-timestamp here.
        let Ok(taken_at) = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT) else {
            continue;
        };

        if newest.as_ref().is_none_or(|(best, _)| taken_at > *best) {
            newest = Some((taken_at, entry.path()));
        }
    }

    Ok(newest.map(|(_, path)| path))
}
