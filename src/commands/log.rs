//! `rv log`: the ten most recent snapshots, compact.

use std::ffi::OsString;

use anyhow::Result;

use super::{Context, passthrough};
use crate::credential::Terminal;

/// Engine arguments placed in front of the user's.
pub const LOG_ARGS: [&str; 4] = ["snapshots", "--compact", "--latest", "10"];

pub fn run(ctx: &Context, args: &[OsString]) -> Result<u8> {
    passthrough::forward(ctx, &log_args(args), &mut Terminal)
}

pub fn log_args(extra: &[OsString]) -> Vec<OsString> {
    LOG_ARGS
        .iter()
        .map(OsString::from)
        .chain(extra.iter().cloned())
        .collect()
}
