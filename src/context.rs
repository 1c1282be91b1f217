// dbsync/src/context.rs
use crate::config::{Environment, ServerConfig, Settings};
use crate::errors::SyncError;

/// Everything a task needs: the settings, which environment plays "remote"
/// for this run, and the runner that executes commands.
pub struct SyncContext<'a, R> {
    pub settings: &'a Settings,
    pub remote_env: &'a str,
    pub runner: &'a R,
}

impl<'a, R> SyncContext<'a, R> {
    pub fn new(settings: &'a Settings, runner: &'a R) -> Self {
        SyncContext {
            settings,
            remote_env: &settings.rails_env,
            runner,
        }
    }

    /// Same settings and runner, with `remote_env` as the remote side.
    pub fn retarget<'b>(&self, remote_env: &'b str) -> SyncContext<'b, R>
    where
        'a: 'b,
    {
        SyncContext {
            settings: self.settings,
            remote_env,
            runner: self.runner,
        }
    }

    pub fn local_environment(&self) -> Result<&'a Environment, SyncError> {
        self.settings.environment(&self.settings.local_rails_env)
    }

    pub fn remote_environment(&self) -> Result<&'a Environment, SyncError> {
        self.settings.environment(self.remote_env)
    }

    pub fn remote_server(&self) -> Result<&'a ServerConfig, SyncError> {
        self.remote_environment()?.server()
    }
}
