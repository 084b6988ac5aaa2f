//! Command-line argument types.
//!
//! Parsing happens in two stages.  [`Cli`] only looks at the first token so
//! the router can decide between a built-in and passthrough; each built-in
//! then parses its own residual arguments with its own type, picking its
//! flags out of any position with [`parse_known`] and leaving the rest for
//! the engine.  Engine arguments are carried as `OsString` and never
//! re-tokenised.

use std::ffi::OsString;

use clap::{Arg, Command, CommandFactory, Parser, value_parser};

/// Top-level arguments.  Help and version flags are disabled so that
/// `rv --help` and `rv --version` reach the engine.
#[derive(Parser, Debug)]
#[command(
    name = "rv",
    about = "Project-local versioning on top of resticprofile",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Cli {
    /// Built-in command, or the first engine argument.
    #[arg(allow_hyphen_values = true)]
    pub command: Option<String>,

    /// Everything after the command.
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_parser = value_parser!(OsString)
    )]
    pub args: Vec<OsString>,
}

/// `rv init`
///
/// Any argument that is not one of the flags below is passed on to
/// `resticprofile init`.
#[derive(Parser, Debug, PartialEq)]
#[command(name = "rv init", about = "Create the .rv workspace in the current directory")]
pub struct InitArgs {
    /// Repository location (e.g. local:/srv/backups, s3:host/bucket).
    ///
    /// When omitted, an embedded repository under `.rv/repo` is offered.
    #[arg(short, long, value_name = "LOC")]
    pub repository: Option<String>,

    /// Only create the `.rv` directory structure; skip the engine's init.
    #[arg(long)]
    pub setup_only: bool,

    /// Replace an existing `.rv` directory.
    ///
    /// The new workspace is built in `.rv.tmp` and only moved into place once
    /// it is complete.
    #[arg(long = "override")]
    pub replace: bool,
}

/// `rv commit`
///
/// Any argument that is not one of the flags below is passed on to
/// `resticprofile backup`.
#[derive(Parser, Debug, PartialEq)]
#[command(name = "rv commit", about = "Snapshot the project with a message")]
pub struct CommitArgs {
    /// Commit message.  Without it, $EDITOR is opened.
    #[arg(short, long)]
    pub message: Option<String>,
}

/// `rv get-pass`
#[derive(Parser, Debug, PartialEq)]
#[command(name = "rv get-pass", about = "Prompt for a password and print it")]
pub struct GetPassArgs {
    /// Ask twice and fail if the entries differ.
    #[arg(long)]
    pub confirm: bool,
}

/// Parse a built-in's residual arguments.
///
/// On failure (or `--help`) clap's message is printed and the exit code to
/// finish with is returned as the error.
pub fn parse_builtin<P: Parser>(name: &str, args: &[OsString]) -> Result<P, u8> {
    P::try_parse_from(std::iter::once(OsString::from(name)).chain(args.iter().cloned())).map_err(
        |e| {
            let _ = e.print();
            u8::try_from(e.exit_code()).unwrap_or(2)
        },
    )
}

/// Like [`parse_builtin`], but arguments `P` does not define are returned
/// for the engine instead of being rejected.  `P`'s flags are recognised
/// wherever they appear before a `--`.
pub fn parse_known<P: Parser + CommandFactory>(
    name: &str,
    args: &[OsString],
) -> Result<(P, Vec<OsString>), u8> {
    let (known, rest) = split_known(&P::command(), args);
    let parsed = parse_builtin(name, &known)?;
    Ok((parsed, rest))
}

// ─── Known-flag extraction ────────────────────────────────────────────────────

/// Split `args` into the flags `cmd` defines (with their values) and
/// everything else, both in their original order.
///
/// Values are re-attached as `--long=VALUE` so a value starting with `-`
/// survives the second parse.  Everything from a `--` on is left alone.
pub fn split_known(cmd: &Command, args: &[OsString]) -> (Vec<OsString>, Vec<OsString>) {
    let mut cmd = cmd.clone();
    cmd.build();

    let mut known = Vec::new();
    let mut rest = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let Some(text) = arg.to_str() else {
            rest.push(arg.clone());
            continue;
        };
        if text == "--" {
            rest.push(arg.clone());
            rest.extend(iter.cloned());
            break;
        }

        let (spec, inline) = if let Some(long) = text.strip_prefix("--") {
            let (flag, value) = match long.split_once('=') {
                Some((flag, value)) => (flag, Some(value)),
                None => (long, None),
            };
            (find_long(&cmd, flag), value)
        } else if let Some(short) = text.strip_prefix('-') {
            let mut chars = short.chars();
            match chars.next() {
                Some(c) => {
                    let value = Some(chars.as_str()).filter(|v| !v.is_empty());
                    (find_short(&cmd, c), value)
                },
                None => (None, None),
            }
        } else {
            (None, None)
        };

        let Some(spec) = spec else {
            rest.push(arg.clone());
            continue;
        };

        if !spec.takes_value {
            // `-hx` style bundles and `--flag=x` go to clap as-is to be
            // reported there.
            known.push(arg.clone());
            continue;
        }
        let value = match inline {
            Some(value) => Some(OsString::from(value)),
            None => iter.next().cloned(),
        };
        match (value, spec.long) {
            (Some(value), Some(long)) => {
                let mut joined = OsString::from(format!("--{long}="));
                joined.push(value);
                known.push(joined);
            },
            (Some(value), None) => {
                known.push(arg.clone());
                known.push(value);
            },
            // Missing value: clap reports it.
            (None, _) => known.push(arg.clone()),
        }
    }
    (known, rest)
}

struct FlagSpec {
    long: Option<String>,
    takes_value: bool,
}

fn spec_of(arg: &Arg) -> FlagSpec {
    FlagSpec {
        long: arg.get_long().map(str::to_owned),
        takes_value: arg.get_action().takes_values(),
    }
}

fn find_long(cmd: &Command, name: &str) -> Option<FlagSpec> {
    cmd.get_arguments()
        .find(|a| a.get_long() == Some(name))
        .map(spec_of)
}

fn find_short(cmd: &Command, c: char) -> Option<FlagSpec> {
    cmd.get_arguments()
        .find(|a| a.get_short() == Some(c))
        .map(spec_of)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
