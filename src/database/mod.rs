// dbsync/src/database/mod.rs
pub(crate) mod adapter;
pub(crate) mod artifact;
pub(crate) mod logic;

use anyhow::{Context, Result};
use chrono::Local;
use std::path::Path;
use tracing::{info, warn};

use crate::context::SyncContext;
use crate::errors::SyncError;
use crate::utils::command::{CommandRunner, Host, Invocation};
use crate::utils::remote_join;
use adapter::{check_same_adapter, DatabaseTarget};
use artifact::DumpArtifact;

/// Local and remote database targets for this run.
pub fn targets<R>(ctx: &SyncContext<'_, R>) -> Result<(DatabaseTarget, DatabaseTarget)> {
    let local_env = ctx.local_environment()?;
    let remote_env = ctx.remote_environment()?;
    let local = DatabaseTarget::parse(&local_env.database_url)
        .with_context(|| format!("Invalid database_url for environment '{}'", local_env.name))?;
    let remote = DatabaseTarget::parse(&remote_env.database_url)
        .with_context(|| format!("Invalid database_url for environment '{}'", remote_env.name))?;
    Ok((local, remote))
}

/// Replaces the remote database with the local one.
///
/// 1. Dumps and compresses the local database into `db_dump_dir`.
/// 2. Uploads the artifact to `<current_path>/<db_dump_dir>` on the server.
/// 3. Restores it into the remote database.
/// 4. Removes artifacts on either side when `db_remote_clean` / `db_local_clean` ask for it.
pub async fn local_to_remote<R: CommandRunner>(ctx: &SyncContext<'_, R>) -> Result<()> {
    let settings = ctx.settings;
    if settings.disallow_pushing {
        return Err(SyncError::PushDisallowed.into());
    }

    let server = ctx.remote_server()?;
    let (local_db, remote_db) = targets(ctx)?;
    check_same_adapter(&local_db, &remote_db)?;

    println!("🚀 Pushing {} to {} on {}", local_db.database, remote_db.database, server.destination());

    let remote_host = Host::Remote(server.clone());
    let artifact = DumpArtifact::new(&local_db.database, settings.compressor, Local::now());
    let local_path = logic::dump_to(
        ctx.runner,
        &Host::Local,
        &local_db,
        &settings.db_dump_dir,
        &artifact,
        &settings.db_ignore_tables,
    )
    .await?;

    let remote_dir = remote_join(&server.current_path(), &settings.db_dump_dir);
    let remote_path = remote_join(&remote_dir, &artifact.file_name());
    ctx.runner
        .run(&Invocation::new(remote_host.clone(), "mkdir").arg("-p").arg(&remote_dir))
        .await
        .with_context(|| format!("Failed to create {} on {}", remote_dir, server.destination()))?;

    let transferred = logic::upload(ctx.runner, server, &local_path, &remote_path).await;
    if settings.db_local_clean {
        logic::remove(ctx.runner, &Host::Local, &local_path).await?;
    }
    transferred?;

    logic::restore_from(ctx.runner, &remote_host, &remote_db, &remote_path, settings.compressor).await?;
    if settings.db_remote_clean {
        logic::remove(ctx.runner, &remote_host, &remote_path).await?;
    }

    println!("✓ Remote database {} replaced with local data", remote_db.database);
    Ok(())
}

/// Replaces the local database with the remote one.
///
/// Downloads land in `<db_dump_dir>/<remote env>/`. Unless `new_dump` is set,
/// the newest artifact already there is reused instead of taking a new dump.
pub async fn remote_to_local<R: CommandRunner>(ctx: &SyncContext<'_, R>) -> Result<()> {
    let settings = ctx.settings;
    let server = ctx.remote_server()?;
    let (local_db, remote_db) = targets(ctx)?;
    check_same_adapter(&local_db, &remote_db)?;
    let download_dir = artifact::download_dir(&settings.db_dump_dir, &ctx.remote_environment()?.name)?;

    println!("🔄 Pulling {} from {} into {}", remote_db.database, server.destination(), local_db.database);

    let cached = if settings.new_dump {
        None
    } else {
        artifact::find_latest_local(Path::new(&download_dir), &remote_db.database, settings.compressor)?
    };

    let local_path = match cached {
        Some(path) => {
            let path = path.to_string_lossy().into_owned();
            println!("♻️ Reusing existing dump {} (set NEW_DUMP=true to take a fresh one)", path);
            path
        }
        None => {
            let remote_host = Host::Remote(server.clone());
            let artifact = DumpArtifact::new(&remote_db.database, settings.compressor, Local::now());
            let remote_dir = remote_join(&server.current_path(), &settings.db_dump_dir);
            let remote_path = logic::dump_to(
                ctx.runner,
                &remote_host,
                &remote_db,
                &remote_dir,
                &artifact,
                &settings.db_ignore_tables,
            )
            .await?;

            let local_path = remote_join(&download_dir, &artifact.file_name());
            ctx.runner
                .run(&Invocation::local("mkdir").arg("-p").arg(&download_dir))
                .await
                .with_context(|| format!("Failed to create local dump directory {}", download_dir))?;

            let transferred = logic::download(ctx.runner, server, &remote_path, &local_path).await;
            if settings.db_remote_clean {
                logic::remove(ctx.runner, &remote_host, &remote_path).await?;
            }
            transferred?;
            local_path
        }
    };

    logic::restore_from(ctx.runner, &Host::Local, &local_db, &local_path, settings.compressor).await?;
    if settings.db_local_clean {
        logic::remove(ctx.runner, &Host::Local, &local_path).await?;
    } else {
        info!(path = %local_path, "keeping local dump");
    }

    println!("✓ Local database {} replaced with remote data", local_db.database);
    Ok(())
}

/// Dumps the remote database into a timestamped artifact under
/// `<shared_path>/<backup_path>`. Never restores anything.
pub async fn dump<R: CommandRunner>(ctx: &SyncContext<'_, R>) -> Result<String> {
    let settings = ctx.settings;
    let server = ctx.remote_server()?;
    let remote_env = ctx.remote_environment()?;
    let remote_db = DatabaseTarget::parse(&remote_env.database_url)
        .with_context(|| format!("Invalid database_url for environment '{}'", remote_env.name))?;

    if !settings.db_ignore_tables.is_empty() {
        warn!("db_ignore_tables is ignored for backups; dumping every table");
    }

    let backups_dir = remote_join(&server.shared_path(), &settings.backup_path);
    let artifact = DumpArtifact::new(&remote_db.database, settings.compressor, Local::now());
    println!(
        "Backing up database to {}",
        remote_join(&backups_dir, &artifact.file_name())
    );

    logic::dump_to(
        ctx.runner,
        &Host::Remote(server.clone()),
        &remote_db,
        &backups_dir,
        &artifact,
        &[],
    )
    .await
}
