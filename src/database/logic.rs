// dbsync/src/database/logic.rs
use anyhow::{Context, Result};
use tracing::info;

use super::adapter::DatabaseTarget;
use super::artifact::{sql_path_for, Compressor, DumpArtifact};
use crate::config::ServerConfig;
use crate::utils::command::{CommandRunner, Host, Invocation};
use crate::utils::remote_join;

/// Dumps `db` into `dir` on `host` and compresses it. Returns the artifact path.
pub async fn dump_to<R: CommandRunner>(
    runner: &R,
    host: &Host,
    db: &DatabaseTarget,
    dir: &str,
    artifact: &DumpArtifact,
    ignore_tables: &[String],
) -> Result<String> {
    let sql_path = remote_join(dir, &artifact.sql_name());
    let compressed_path = remote_join(dir, &artifact.file_name());

    runner
        .run(&Invocation::new(host.clone(), "mkdir").arg("-p").arg(dir))
        .await
        .with_context(|| format!("Failed to create dump directory {} on {}", dir, host))?;

    info!(database = %db.database, %host, path = %sql_path, "dumping database");
    runner
        .run(&db.dump(host, &sql_path, ignore_tables))
        .await
        .with_context(|| format!("Failed to dump database {} on {}", db.database, host))?;

    runner
        .run(&artifact.compressor.compress(host, &sql_path))
        .await
        .with_context(|| format!("Failed to compress {} on {}", sql_path, host))?;

    println!("✓ Dumped {} to {} on {}", db.database, compressed_path, host);
    Ok(compressed_path)
}

/// Decompresses the artifact at `compressed_path` on `host`, loads it into
/// `db`, then removes the decompressed SQL file.
pub async fn restore_from<R: CommandRunner>(
    runner: &R,
    host: &Host,
    db: &DatabaseTarget,
    compressed_path: &str,
    compressor: Compressor,
) -> Result<()> {
    let sql_path = sql_path_for(compressed_path, compressor);

    runner
        .run(&compressor.decompress(host, compressed_path))
        .await
        .with_context(|| format!("Failed to decompress {} on {}", compressed_path, host))?;

    info!(database = %db.database, %host, path = %sql_path, "restoring database");
    runner
        .run(&db.restore(host, &sql_path))
        .await
        .with_context(|| format!("Failed to restore database {} on {}", db.database, host))?;

    remove(runner, host, &sql_path).await?;
    println!("✓ Restored {} into {} on {}", compressed_path, db.database, host);
    Ok(())
}

/// Copies a remote file to the local machine.
pub async fn download<R: CommandRunner>(
    runner: &R,
    server: &ServerConfig,
    remote_path: &str,
    local_path: &str,
) -> Result<()> {
    runner
        .run(&scp(server).arg(format!("{}:{}", server.destination(), remote_path)).arg(local_path))
        .await
        .with_context(|| format!("Failed to download {} from {}", remote_path, server.destination()))?;
    println!("✓ Downloaded {} to {}", remote_path, local_path);
    Ok(())
}

/// Copies a local file to the remote server.
pub async fn upload<R: CommandRunner>(
    runner: &R,
    server: &ServerConfig,
    local_path: &str,
    remote_path: &str,
) -> Result<()> {
    runner
        .run(&scp(server).arg(local_path).arg(format!("{}:{}", server.destination(), remote_path)))
        .await
        .with_context(|| format!("Failed to upload {} to {}", local_path, server.destination()))?;
    println!("✓ Uploaded {} to {}", local_path, remote_path);
    Ok(())
}

pub async fn remove<R: CommandRunner>(runner: &R, host: &Host, path: &str) -> Result<()> {
    runner
        .run(&Invocation::new(host.clone(), "rm").arg("-f").arg(path))
        .await
        .with_context(|| format!("Failed to remove {} on {}", path, host))
}

fn scp(server: &ServerConfig) -> Invocation {
    Invocation::local("scp").arg("-P").arg(server.port.to_string())
}
