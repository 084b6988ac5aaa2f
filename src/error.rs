//! Failure taxonomy.
//!
//! Every condition the user can hit is a variant here.  Handlers wrap these in
//! `anyhow::Error` as they propagate; `main` downcasts back to [`RvError`] to
//! pick the exit code and prints the whole chain on one line.
//!
//! A non-zero exit from the engine is deliberately *not* a variant: the
//! engine's status is returned as a plain exit code and propagated untouched.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RvError {
    /// No `.rv` directory in the working directory or any ancestor.
    #[error("not in an rv workspace (no {marker} found)")]
    NotInWorkspace { marker: &'static str },

    /// The workspace exists but has no configuration document.
    #[error("{} not found", path.display())]
    ConfigMissing { path: PathBuf },

    /// `rv init` without `--override` on an existing workspace.
    #[error("{} already exists (use --override to replace it)", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("passwords do not match")]
    CredentialMismatch,

    #[error("could not read password: {0}")]
    CredentialInput(#[source] io::Error),

    /// Anything that went wrong while building or activating a workspace.
    /// The working directory has already been rolled back when this surfaces.
    #[error("initialization failed")]
    Provisioning(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("could not run '{program}'")]
    EngineUnavailable {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("editor '{editor}' not found; set the EDITOR environment variable")]
    EditorMissing { editor: String },

    #[error("editor '{editor}' exited with status {code}")]
    EditorFailed { editor: String, code: i32 },

    #[error("repository initialization cancelled")]
    Cancelled,

    /// Another `rv init` holds the workspace lock.
    #[error("another rv process is initializing {}", path.display())]
    Locked { path: PathBuf },

    #[error("interrupted")]
    Interrupted,
}

impl RvError {
    /// Process exit code for this failure.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Interrupted => 130,
            _ => 1,
        }
    }
}

/// Exit code for an arbitrary error coming out of a handler.
pub fn exit_code_of(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<RvError>().map_or(1, RvError::exit_code)
}
