//! `rv get-pass`: prompt for a password and print it.
//!
//! Used as resticprofile's `password-command`, so stdout carries the secret
//! and nothing else.

use std::{
    ffi::OsString,
    io::{self, Write},
};

use anyhow::Result;

use crate::{
    cli::{GetPassArgs, parse_builtin},
    credential::{self, SecretSource, Terminal},
};

pub fn run(args: &[OsString]) -> Result<u8> {
    let args: GetPassArgs = match parse_builtin("rv get-pass", args) {
        Ok(args) => args,
        Err(code) => return Ok(code),
    };
    emit(&mut Terminal, args.confirm, &mut io::stdout().lock())?;
    Ok(0)
}

fn emit(secrets: &mut dyn SecretSource, confirm: bool, out: &mut impl Write) -> Result<()> {
    let secret = credential::acquire(secrets, confirm)?;
    writeln!(out, "{}", secret.expose())?;
    out.flush()?;
    Ok(())
}
