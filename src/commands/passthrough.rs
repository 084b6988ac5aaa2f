//! `rv <args>`: anything that is not a built-in.

use std::ffi::OsString;

use anyhow::Result;

use super::Context;
use crate::{
    credential::{self, SecretSource, Terminal},
    workspace::Workspace,
};

pub fn run(ctx: &Context, args: &[OsString]) -> Result<u8> {
    forward(ctx, args, &mut Terminal)
}

/// Run `resticprofile -c <config> <args>` with a password in scope.
///
/// The workspace and its config are checked before the password prompt.
pub fn forward(ctx: &Context, args: &[OsString], secrets: &mut dyn SecretSource) -> Result<u8> {
    let workspace = Workspace::require(&ctx.cwd)?;
    workspace.config_file()?;
    let engine = ctx.engine();

    credential::scoped(secrets, false, ctx.password_env(), || {
        Ok(engine.run_in(&workspace, args)?)
    })
}
