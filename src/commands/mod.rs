//! Built-in command handlers and passthrough.
//!
//! | File             | Invocation          | Description                          |
//! |------------------|---------------------|--------------------------------------|
//! | `init.rs`        | `rv init`           | Create or replace the workspace      |
//! | `log.rs`         | `rv log`            | Recent snapshots                     |
//! | `commit.rs`      | `rv commit`         | Backup with a message                |
//! | `get_pass.rs`    | `rv get-pass`       | Prompt and print a password          |
//! | `passthrough.rs` | `rv <anything else>`| Forward to the engine                |
//!
//! Every handler returns the process exit code.  A non-zero engine status is
//! returned as-is; only local failures are errors.

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::{engine::Engine, settings::Settings};

pub mod commit;
pub mod get_pass;
pub mod init;
pub mod log;
pub mod passthrough;

/// What every handler gets to work with.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory the command was started from.
    pub cwd: PathBuf,
    pub settings: Settings,
}

impl Context {
    pub fn new(cwd: PathBuf, settings: Settings) -> Self {
        Self { cwd, settings }
    }

    /// Context for the current process.
    pub fn from_env() -> Result<Self> {
        let cwd = std::env::current_dir().context("reading the current directory")?;
        Ok(Self::new(cwd, Settings::load()?))
    }

    pub fn engine(&self) -> Engine {
        Engine::from_settings(&self.settings)
    }

    /// Variable the password is exported as while the engine runs.
    pub fn password_env(&self) -> &str {
        &self.settings.engine.password_env
    }
}
