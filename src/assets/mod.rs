// dbsync/src/assets/mod.rs
use anyhow::{Context, Result};

use crate::config::ServerConfig;
use crate::context::SyncContext;
use crate::utils::command::{CommandRunner, Invocation};
use crate::utils::remote_join;

/// Mirrors every `assets_dir` from the local `local_assets_dir` to the server.
///
/// `<local_assets_dir>/<name>` becomes `<current_path>/<assets_dir>`, where
/// `name` is the last component of the `assets_dir` entry.
pub async fn local_to_remote<R: CommandRunner>(ctx: &SyncContext<'_, R>) -> Result<()> {
    let settings = ctx.settings;
    let server = ctx.remote_server()?;

    for dir in &settings.assets_dir {
        let (parent, name) = split_last(dir);
        let source = remote_join(&settings.local_assets_dir, name);
        let destination = format!(
            "{}:{}/",
            server.destination(),
            remote_join(&server.current_path(), parent)
        );

        println!("🚀 Syncing {} to {}", source, destination);
        ctx.runner
            .run(&rsync(server).arg(&source).arg(&destination))
            .await
            .with_context(|| format!("Failed to sync assets directory {} to the server", dir))?;
    }
    Ok(())
}

/// Mirrors every `<current_path>/<assets_dir>` on the server into `local_assets_dir`.
pub async fn remote_to_local<R: CommandRunner>(ctx: &SyncContext<'_, R>) -> Result<()> {
    let settings = ctx.settings;
    let server = ctx.remote_server()?;

    for dir in &settings.assets_dir {
        let source = format!(
            "{}:{}",
            server.destination(),
            remote_join(&server.current_path(), dir.trim_end_matches('/'))
        );
        let destination = format!("{}/", settings.local_assets_dir.trim_end_matches('/'));

        println!("🔄 Syncing {} to {}", source, destination);
        ctx.runner
            .run(&rsync(server).arg(&source).arg(&destination))
            .await
            .with_context(|| format!("Failed to sync assets directory {} from the server", dir))?;
    }
    Ok(())
}

/// One-way mirror: `--delete` removes destination files missing from the source.
fn rsync(server: &ServerConfig) -> Invocation {
    Invocation::local("rsync")
        .args(["-a", "--delete", "-L", "-K", "-vv", "--progress", "--protect-args"])
        .arg("--rsh")
        .arg(format!("ssh -p {}", server.port))
}

/// Splits `public/system` into (`public`, `system`); a bare name has parent `.`.
fn split_last(dir: &str) -> (&str, &str) {
    let dir = dir.trim_end_matches('/');
    match dir.rsplit_once('/') {
        Some((parent, name)) if !parent.is_empty() => (parent, name),
        _ => (".", dir.trim_start_matches('/')),
    }
}
