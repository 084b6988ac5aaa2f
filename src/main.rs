//! `rv`: project-local versioning on top of [resticprofile].
//!
//! # Overview
//!
//! `rv` gives a project directory a `.rv/` workspace holding a resticprofile
//! configuration, then behaves like resticprofile pointed at it: run `rv` from
//! anywhere inside the project and the nearest workspace is found, a password
//! is asked for, and the arguments go to the engine unchanged.
//!
//! # Usage
//!
//! ```text
//! rv init [-r LOC] [--setup-only] [--override]   # create .rv/ here
//! rv commit [-m MSG] [args...]                   # backup with a message
//! rv log [args...]                               # last ten snapshots
//! rv get-pass [--confirm]                        # password command
//! rv <anything else>                             # resticprofile -c .rv/config.yaml ...
//! ```
//!
//! # Module layout
//!
//! | Module           | Responsibility                                   |
//! |------------------|--------------------------------------------------|
//! | [`router`]       | Built-in or passthrough                          |
//! | [`cli`]          | Argument types parsed by clap                    |
//! | [`commands`]     | One handler per built-in, plus passthrough       |
//! | [`workspace`]    | Finding `.rv/` and the paths inside it           |
//! | [`provision`]    | Atomic creation and replacement of `.rv/`        |
//! | [`scaffold`]     | Rendered config and ignore files                 |
//! | [`credential`]   | Password prompts and the scoped environment      |
//! | [`engine`]       | Building and running the resticprofile command   |
//! | [`settings`]     | `rv`'s own settings file                         |
//! | [`interrupt`]    | Ctrl-C flag                                      |
//! | [`error`]        | Failure taxonomy and exit codes                  |
//! | [`ui`]           | Styled messages and yes/no prompts               |
//!
//! [resticprofile]: https://creativeprojects.github.io/resticprofile/

mod cli;
mod commands;
mod credential;
mod engine;
mod error;
mod interrupt;
mod provision;
mod router;
mod scaffold;
mod settings;
mod ui;
mod workspace;

#[cfg(test)]
mod test_support;

use std::{env, process::ExitCode};

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (`RV_LOG=debug`).
const LOG_ENV: &str = "RV_LOG";

fn main() -> ExitCode {
    init_logging();
    interrupt::install();

    let invocation = router::route(env::args_os().collect());
    tracing::debug!(?invocation, "routed");

    match invocation.dispatch(commands::Context::from_env) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            ui::error(&format!("{err:#}"));
            ExitCode::from(error::exit_code_of(&err))
        },
    }
}

/// Diagnostics go to stderr, filtered by `RV_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
