//! Command routing: built-in handler or engine passthrough.
//!
//! ```text
//! argv ──▶ route ──┬─▶ Builtin(name, residual) ──▶ handler ──┐
//!                  └─▶ Passthrough(argv[1..])  ──▶ engine  ──┴─▶ exit code
//! ```
//!
//! The built-in table is closed: a name either maps to a [`Builtin`] variant
//! or the invocation goes to the engine untouched.

use std::ffi::OsString;

use clap::Parser;

use crate::{cli::Cli, commands};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Init,
    Log,
    Commit,
    GetPass,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "init" => Some(Self::Init),
            "log" => Some(Self::Log),
            "commit" => Some(Self::Commit),
            "get-pass" => Some(Self::GetPass),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Log => "log",
            Self::Commit => "commit",
            Self::GetPass => "get-pass",
        }
    }

    /// Run the handler.  It owns the exit code from here on.
    ///
    /// `load` is only called by handlers that need a [`commands::Context`];
    /// `get-pass` works even when the settings file is broken.
    pub fn run(
        self,
        load: impl FnOnce() -> anyhow::Result<commands::Context>,
        args: &[OsString],
    ) -> anyhow::Result<u8> {
        tracing::debug!(builtin = self.name(), "dispatching");
        match self {
            Self::Init => commands::init::run(&load()?, args),
            Self::Log => commands::log::run(&load()?, args),
            Self::Commit => commands::commit::run(&load()?, args),
            Self::GetPass => commands::get_pass::run(args),
        }
    }
}

/// A classified command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// A built-in with its residual arguments.
    Builtin(Builtin, Vec<OsString>),
    /// Everything after the program name, exactly as given.
    Passthrough(Vec<OsString>),
}

impl Invocation {
    pub fn dispatch(
        self,
        load: impl FnOnce() -> anyhow::Result<commands::Context>,
    ) -> anyhow::Result<u8> {
        match self {
            Self::Builtin(builtin, args) => builtin.run(load, &args),
            Self::Passthrough(args) => commands::passthrough::run(&load()?, &args),
        }
    }
}

/// Classify `argv` (program name first).
///
/// A top-level parse failure is not an error: the raw arguments go to the
/// engine, which gets to report on them itself.
pub fn route(argv: Vec<OsString>) -> Invocation {
    let residual: Vec<OsString> = argv.iter().skip(1).cloned().collect();

    let cli = match Cli::try_parse_from(argv.iter().cloned()) {
        Ok(cli) => cli,
        Err(e) => {
            tracing::debug!("forwarding unparsed arguments: {}", e.kind());
            return Invocation::Passthrough(residual);
        },
    };

    // Only the literal first argument can name a built-in: clap also
    // accepts it after a leading `--`, which belongs to the engine.
    let first = residual.first().and_then(|a| a.to_str());
    match cli.command.as_deref().and_then(Builtin::from_name) {
        Some(builtin) if first == Some(builtin.name()) => {
            Invocation::Builtin(builtin, residual[1..].to_vec())
        },
        _ => Invocation::Passthrough(residual),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
