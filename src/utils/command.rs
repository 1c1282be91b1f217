//! Structured command invocations and the runner that executes them.
//!
//! Commands are always built as a program plus an argument list. Local
//! invocations are spawned directly; remote ones go through `ssh`, with every
//! token shell-quoted so configuration values cannot change the command.

use anyhow::{Context, Result};
use std::fmt;
use std::fs::File;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::config::ServerConfig;
use crate::errors::SyncError;
use crate::utils::find_executable;

/// Where an invocation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Host {
    Local,
    Remote(ServerConfig),
}

impl Host {
    pub fn is_remote(&self) -> bool {
        matches!(self, Host::Remote(_))
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Host::Local => write!(f, "local"),
            Host::Remote(server) => write!(f, "{}", server.destination()),
        }
    }
}

/// One external command, built per step and discarded after it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub host: Host,
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    /// File on the target host fed to the program's stdin.
    pub stdin_file: Option<String>,
}

impl Invocation {
    pub fn new(host: Host, program: impl Into<String>) -> Self {
        Invocation {
            host,
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            stdin_file: None,
        }
    }

    pub fn local(program: impl Into<String>) -> Self {
        Self::new(Host::Local, program)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin_file(mut self, path: impl Into<String>) -> Self {
        self.stdin_file = Some(path.into());
        self
    }

    /// The command line handed to the remote shell.
    pub fn shell_line(&self) -> Result<String> {
        self.render(false)
    }

    /// Same as [`Invocation::shell_line`] with env values masked, for logs.
    pub fn display_line(&self) -> String {
        self.render(true)
            .unwrap_or_else(|_| format!("{} <unprintable arguments>", self.program))
    }

    fn render(&self, redact: bool) -> Result<String> {
        let mut parts = Vec::new();
        for (key, value) in &self.env {
            let value = if redact { "***".to_string() } else { quote(value)? };
            parts.push(format!("{}={}", key, value));
        }
        parts.push(quote(&self.program)?);
        for arg in &self.args {
            parts.push(quote(arg)?);
        }
        if let Some(stdin) = &self.stdin_file {
            parts.push("<".to_string());
            parts.push(quote(stdin)?);
        }
        Ok(parts.join(" "))
    }

    fn to_command(&self) -> Result<Command> {
        match &self.host {
            Host::Local => {
                let program = find_executable(&self.program)?;
                let mut cmd = Command::new(program);
                cmd.args(&self.args);
                cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                match &self.stdin_file {
                    Some(path) => {
                        let file = File::open(path)
                            .with_context(|| format!("Failed to open {} for reading", path))?;
                        cmd.stdin(Stdio::from(file));
                    }
                    None => {
                        cmd.stdin(Stdio::null());
                    }
                }
                Ok(cmd)
            }
            Host::Remote(server) => {
                let ssh = find_executable("ssh")?;
                let mut cmd = Command::new(ssh);
                cmd.arg("-p")
                    .arg(server.port.to_string())
                    .arg(server.destination())
                    .arg("--")
                    .arg(self.shell_line()?)
                    .stdin(Stdio::null());
                Ok(cmd)
            }
        }
    }
}

fn quote(token: &str) -> Result<String> {
    shlex::try_quote(token)
        .map(|q| q.into_owned())
        .map_err(|e| anyhow::anyhow!("Cannot quote argument {:?} for the remote shell: {}", token, e))
}

/// Executes invocations. The seam lets tests record commands instead of running them.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    async fn run(&self, invocation: &Invocation) -> Result<()>;
}

/// Runs invocations for real, streaming their output to the terminal.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<()> {
        debug!(
            host = %invocation.host,
            remote = invocation.host.is_remote(),
            command = %invocation.display_line(),
            "running command"
        );

        let mut cmd = invocation.to_command()?;
        let status = cmd
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .with_context(|| {
                format!(
                    "Failed to execute {} on {}",
                    invocation.program, invocation.host
                )
            })?;

        if !status.success() {
            return Err(SyncError::CommandFailed {
                program: invocation.program.clone(),
                host: invocation.host.to_string(),
                status: status.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every invocation instead of running it. Invocations of the
    /// `fail_on` program fail like a non-zero exit.
    #[derive(Default)]
    pub(crate) struct RecordingRunner {
        pub calls: RefCell<Vec<Invocation>>,
        pub fail_on: Option<&'static str>,
    }

    impl RecordingRunner {
        pub(crate) fn failing_on(program: &'static str) -> Self {
            RecordingRunner {
                calls: RefCell::new(Vec::new()),
                fail_on: Some(program),
            }
        }

        pub(crate) fn programs(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|c| c.program.clone()).collect()
        }

        pub(crate) fn find(&self, program: &str) -> Option<Invocation> {
            self.calls.borrow().iter().find(|c| c.program == program).cloned()
        }
    }

    impl CommandRunner for RecordingRunner {
        async fn run(&self, invocation: &Invocation) -> Result<()> {
            self.calls.borrow_mut().push(invocation.clone());
            if self.fail_on == Some(invocation.program.as_str()) {
                return Err(SyncError::CommandFailed {
                    program: invocation.program.clone(),
                    host: invocation.host.to_string(),
                    status: "exit status: 1".to_string(),
                }
                .into());
            }
            Ok(())
        }
    }

    fn server() -> ServerConfig {
        ServerConfig {
            host: "app.example.com".to_string(),
            user: Some("deploy".to_string()),
            port: 22,
            deploy_to: "/var/www/app".to_string(),
        }
    }

    #[test]
    fn test_shell_line_quotes_every_token() -> Result<()> {
        let inv = Invocation::new(Host::Remote(server()), "pg_dump")
            .env("PGPASSWORD", "pass word")
            .arg("--file")
            .arg("/var/www/my app/db/x; rm -rf /");

        assert_eq!(
            inv.shell_line()?,
            "PGPASSWORD='pass word' pg_dump --file '/var/www/my app/db/x; rm -rf /'"
        );
        Ok(())
    }

    #[test]
    fn test_shell_line_with_stdin_redirect() -> Result<()> {
        let inv = Invocation::new(Host::Remote(server()), "mysql")
            .arg("app_production")
            .stdin_file("/tmp/dump file.sql");
        assert_eq!(inv.shell_line()?, "mysql app_production < '/tmp/dump file.sql'");
        Ok(())
    }

    #[test]
    fn test_display_line_masks_env_values() {
        let inv = Invocation::local("psql").env("PGPASSWORD", "hunter2").arg("--quiet");
        let line = inv.display_line();
        assert!(!line.contains("hunter2"));
        assert_eq!(line, "PGPASSWORD=*** psql --quiet");
    }

    #[test]
    fn test_nul_byte_cannot_be_quoted() {
        let inv = Invocation::local("echo").arg("bad\0arg");
        assert!(inv.shell_line().is_err());
    }

    #[test]
    fn test_host_display() {
        assert_eq!(Host::Local.to_string(), "local");
        assert_eq!(Host::Remote(server()).to_string(), "deploy@app.example.com");
        assert!(Host::Remote(server()).is_remote());
        assert!(!Host::Local.is_remote());
    }

    #[tokio::test]
    async fn test_recording_runner_fails_on_program() {
        let runner = RecordingRunner::failing_on("scp");
        assert!(runner.run(&Invocation::local("gzip")).await.is_ok());
        let err = runner.run(&Invocation::local("scp")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::CommandFailed { .. })
        ));
        assert_eq!(runner.programs(), vec!["gzip", "scp"]);
    }
}
