//! Engine invocation.
//!
//! Argument construction is kept apart from execution: [`Engine::command_line`]
//! is pure and unit-testable without spawning anything, [`Engine::run`] spawns
//! the child with inherited stdio and environment and blocks until it exits.
//!
//! Every engine call has the same shape:
//!
//! ```text
//! resticprofile  -c <workspace>/config.yaml  <args verbatim>
//! ```

use std::{
    ffi::{OsStr, OsString},
    path::Path,
    process::{Command, ExitStatus},
};

use crate::{error::RvError, settings::Settings, workspace::Workspace};

/// Flag that points the engine at its configuration document.
pub const CONFIG_FLAG: &str = "-c";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engine {
    program: String,
}

impl Engine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.engine.program.clone())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    // ─── Argument construction ───────────────────────────────────────────────

    /// Full argument vector, program first.
    pub fn command_line<A: AsRef<OsStr>>(&self, config: &Path, args: &[A]) -> Vec<OsString> {
        let mut cmd: Vec<OsString> = vec![
            self.program.clone().into(),
            CONFIG_FLAG.into(),
            config.as_os_str().to_owned(),
        ];
        cmd.extend(args.iter().map(|a| a.as_ref().to_owned()));
        cmd
    }

    // ─── Execution ───────────────────────────────────────────────────────────

    /// Run the engine against `config` and wait for it.
    pub fn status<A: AsRef<OsStr>>(&self, config: &Path, args: &[A]) -> Result<ExitStatus, RvError> {
        let cmd = self.command_line(config, args);
        tracing::debug!(command = ?cmd, "running engine");
        Command::new(&cmd[0])
            .args(&cmd[1..])
            .status()
            .map_err(|source| RvError::EngineUnavailable {
                program: self.program.clone(),
                source,
            })
    }

    /// Run the engine and return its exit code for propagation.
    pub fn run<A: AsRef<OsStr>>(&self, config: &Path, args: &[A]) -> Result<u8, RvError> {
        let status = self.status(config, args)?;
        let code = exit_code(status);
        tracing::debug!(code, "engine exited");
        Ok(code)
    }

    /// Run the engine inside `workspace`, which must hold a config document.
    pub fn run_in<A: AsRef<OsStr>>(&self, workspace: &Workspace, args: &[A]) -> Result<u8, RvError> {
        let config = workspace.config_file()?;
        self.run(&config, args)
    }
}

/// Map a child status onto this process's exit code.
///
/// Codes outside `0..=255` become 1; death by signal becomes `128 + signal`.
pub fn exit_code(status: ExitStatus) -> u8 {
    if let Some(code) = status.code() {
        return u8::try_from(code).unwrap_or(1);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return u8::try_from(128 + signal).unwrap_or(1);
        }
    }
    1
}

// ─── Tests ────────────────────────────────────────────────────────────────────
