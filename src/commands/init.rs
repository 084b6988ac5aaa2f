//! `rv init`: create (or with `--override`, replace) the workspace in the
//! current directory.

use std::{ffi::OsString, io};

use anyhow::Result;

use super::Context;
use crate::{
    cli::{InitArgs, parse_known},
    credential::{SecretSource, Terminal},
    error::RvError,
    provision::{InitRequest, Provisioner, resolve_repository},
    ui,
    workspace::WORKSPACE_DIR,
};

const DEFAULT_REPOSITORY_QUESTION: &str = "No repository specified. Create a local repository?";

pub fn run(ctx: &Context, args: &[OsString]) -> Result<u8> {
    let (args, engine_args): (InitArgs, _) = match parse_known("rv init", args) {
        Ok(parsed) => parsed,
        Err(code) => return Ok(code),
    };
    init(
        ctx,
        args,
        engine_args,
        || ui::confirm(DEFAULT_REPOSITORY_QUESTION),
        &mut Terminal,
    )?;
    ui::success(&format!("Initialized rv workspace in {WORKSPACE_DIR}/"));
    Ok(0)
}

fn init(
    ctx: &Context,
    args: InitArgs,
    engine_args: Vec<OsString>,
    confirm: impl FnOnce() -> io::Result<bool>,
    secrets: &mut dyn SecretSource,
) -> Result<()> {
    let engine = ctx.engine();
    let provisioner = Provisioner::new(&ctx.cwd, &engine, ctx.password_env());

    // Refuse before asking anything.
    let canonical = provisioner.canonical();
    if !args.replace && canonical.dir().exists() {
        return Err(RvError::AlreadyExists {
            path: canonical.dir().to_owned(),
        }
        .into());
    }

    let request = InitRequest {
        repository: resolve_repository(args.repository, args.setup_only, confirm)?,
        setup_only: args.setup_only,
        replace: args.replace,
        engine_args,
    };
    tracing::info!(repository = %request.repository, replace = request.replace, "initializing");
    provisioner.provision(&request, secrets)?;
    Ok(())
}
