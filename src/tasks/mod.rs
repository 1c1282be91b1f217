//! Task registry: named tasks, their aliases, and what each one runs.

pub(crate) mod confirm;

use anyhow::Result;
use std::str::FromStr;
use tracing::info;

use crate::context::SyncContext;
use crate::errors::SyncError;
use crate::utils::command::CommandRunner;
use crate::{assets, database};
use confirm::{gate, Confirmer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Database,
    Assets,
    /// Database and assets together.
    App,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    LocalToRemote,
    RemoteToLocal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Sync(Resource, Direction),
    Backup,
}

/// Every accepted task name with its description. Aliases come right after
/// the task they stand for.
pub const TASKS: &[(&str, &str)] = &[
    ("db:remote:sync", "Synchronize your remote database using local database data"),
    ("db:push", "Synchronize your remote database using local database data"),
    ("db:local:sync", "Synchronize your local database using remote database data"),
    ("db:pull", "Synchronize your local database using remote database data"),
    ("db:backup", "Backup the remote database into a timestamped dump under backup_path"),
    ("assets:remote:sync", "Synchronize your remote assets using local assets"),
    ("assets:push", "Synchronize your remote assets using local assets"),
    ("assets:local:sync", "Synchronize your local assets using remote assets"),
    ("assets:pull", "Synchronize your local assets using remote assets"),
    ("app:remote:sync", "Synchronize your remote assets AND database using local assets and database"),
    ("app:push", "Synchronize your remote assets AND database using local assets and database"),
    ("app:local:sync", "Synchronize your local assets AND database using remote assets and database"),
    ("app:pull", "Synchronize your local assets AND database using remote assets and database"),
];

impl FromStr for Task {
    type Err = SyncError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        use Direction::*;
        use Resource::*;

        let task = match name.trim() {
            "db:remote:sync" | "db:push" => Task::Sync(Database, LocalToRemote),
            "db:local:sync" | "db:pull" => Task::Sync(Database, RemoteToLocal),
            "db:backup" => Task::Backup,
            "assets:remote:sync" | "assets:push" => Task::Sync(Assets, LocalToRemote),
            "assets:local:sync" | "assets:pull" => Task::Sync(Assets, RemoteToLocal),
            "app:remote:sync" | "app:push" => Task::Sync(App, LocalToRemote),
            "app:local:sync" | "app:pull" => Task::Sync(App, RemoteToLocal),
            other => return Err(SyncError::UnknownTask(other.to_string())),
        };
        Ok(task)
    }
}

impl Task {
    /// The fully-qualified name aliases resolve to.
    pub fn name(&self) -> &'static str {
        use Direction::*;
        use Resource::*;

        match self {
            Task::Sync(Database, LocalToRemote) => "db:remote:sync",
            Task::Sync(Database, RemoteToLocal) => "db:local:sync",
            Task::Sync(Assets, LocalToRemote) => "assets:remote:sync",
            Task::Sync(Assets, RemoteToLocal) => "assets:local:sync",
            Task::Sync(App, LocalToRemote) => "app:remote:sync",
            Task::Sync(App, RemoteToLocal) => "app:local:sync",
            Task::Backup => "db:backup",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The operator answered "no"; nothing was run.
    Declined,
}

/// Runs `task`. `source` is only accepted by `db:local:sync` (and `db:pull`).
pub async fn run<R, C>(
    task: Task,
    source: Option<&str>,
    ctx: &SyncContext<'_, R>,
    confirmer: &C,
) -> Result<Outcome>
where
    R: CommandRunner,
    C: Confirmer + ?Sized,
{
    info!(task = task.name(), remote = ctx.remote_env, "running task");

    if source.is_some() && task != Task::Sync(Resource::Database, Direction::RemoteToLocal) {
        return Err(SyncError::InvalidArgument(format!(
            "{} does not take a source environment",
            task.name()
        ))
        .into());
    }

    match task {
        Task::Backup => {
            database::dump(ctx).await?;
            Ok(Outcome::Completed)
        }
        Task::Sync(Resource::Database, Direction::LocalToRemote) => db_remote_sync(ctx, confirmer).await,
        Task::Sync(Resource::Database, Direction::RemoteToLocal) => db_local_sync(ctx, source, confirmer).await,
        Task::Sync(Resource::Assets, Direction::LocalToRemote) => assets_remote_sync(ctx, confirmer).await,
        Task::Sync(Resource::Assets, Direction::RemoteToLocal) => assets_local_sync(ctx, confirmer).await,
        Task::Sync(Resource::App, Direction::LocalToRemote) => app_remote_sync(ctx, confirmer).await,
        Task::Sync(Resource::App, Direction::RemoteToLocal) => app_local_sync(ctx, confirmer).await,
    }
}

async fn db_remote_sync<R, C>(ctx: &SyncContext<'_, R>, confirmer: &C) -> Result<Outcome>
where
    R: CommandRunner,
    C: Confirmer + ?Sized,
{
    if !gate(
        ctx.settings,
        confirmer,
        "Are you sure you want to REPLACE THE REMOTE DATABASE with local database",
    )? {
        return Ok(Outcome::Declined);
    }
    database::local_to_remote(ctx).await?;
    Ok(Outcome::Completed)
}

async fn db_local_sync<R, C>(
    ctx: &SyncContext<'_, R>,
    source: Option<&str>,
    confirmer: &C,
) -> Result<Outcome>
where
    R: CommandRunner,
    C: Confirmer + ?Sized,
{
    if let Some(source) = source {
        if source == ctx.settings.local_rails_env {
            return Err(SyncError::InvalidArgument(
                "Dumping and restoring to the same env would be unproductive".to_string(),
            )
            .into());
        }
        // Same task, pulled from `source` instead of the configured remote.
        let retargeted = ctx.retarget(source);
        retargeted.remote_server()?;
        info!(source, "pulling from another environment");
        return Box::pin(db_local_sync(&retargeted, None, confirmer)).await;
    }

    let (local_db, remote_db) = database::targets(ctx)?;
    println!(
        "Local database: {}, Remote database: {}",
        local_db.database, remote_db.database
    );
    if !gate(
        ctx.settings,
        confirmer,
        "Are you sure you want to erase your local database with server database",
    )? {
        return Ok(Outcome::Declined);
    }
    database::remote_to_local(ctx).await?;
    Ok(Outcome::Completed)
}

async fn assets_remote_sync<R, C>(ctx: &SyncContext<'_, R>, confirmer: &C) -> Result<Outcome>
where
    R: CommandRunner,
    C: Confirmer + ?Sized,
{
    println!("Assets directories: {}", ctx.settings.assets_dir.join(", "));
    if !gate(
        ctx.settings,
        confirmer,
        "Are you sure you want to erase your server assets with local assets",
    )? {
        return Ok(Outcome::Declined);
    }
    assets::local_to_remote(ctx).await?;
    Ok(Outcome::Completed)
}

async fn assets_local_sync<R, C>(ctx: &SyncContext<'_, R>, confirmer: &C) -> Result<Outcome>
where
    R: CommandRunner,
    C: Confirmer + ?Sized,
{
    println!("Assets directories: {}", ctx.settings.local_assets_dir);
    if !gate(
        ctx.settings,
        confirmer,
        "Are you sure you want to erase your local assets with server assets",
    )? {
        return Ok(Outcome::Declined);
    }
    assets::remote_to_local(ctx).await?;
    Ok(Outcome::Completed)
}

async fn app_remote_sync<R, C>(ctx: &SyncContext<'_, R>, confirmer: &C) -> Result<Outcome>
where
    R: CommandRunner,
    C: Confirmer + ?Sized,
{
    let message = format!(
        "Are you sure you want to REPLACE THE REMOTE DATABASE AND your remote assets with local database and assets({})",
        ctx.settings.assets_dir.join(", ")
    );
    if !gate(ctx.settings, confirmer, &message)? {
        return Ok(Outcome::Declined);
    }
    database::local_to_remote(ctx).await?;
    assets::local_to_remote(ctx).await?;
    Ok(Outcome::Completed)
}

async fn app_local_sync<R, C>(ctx: &SyncContext<'_, R>, confirmer: &C) -> Result<Outcome>
where
    R: CommandRunner,
    C: Confirmer + ?Sized,
{
    let (local_db, _) = database::targets(ctx)?;
    println!("Local database     : {}", local_db.database);
    println!("Assets directories : {}", ctx.settings.local_assets_dir);

    let message = format!(
        "Are you sure you want to erase your local database AND your local assets with server database and assets({})",
        ctx.settings.assets_dir.join(", ")
    );
    if !gate(ctx.settings, confirmer, &message)? {
        return Ok(Outcome::Declined);
    }
    database::remote_to_local(ctx).await?;
    assets::remote_to_local(ctx).await?;
    Ok(Outcome::Completed)
}
