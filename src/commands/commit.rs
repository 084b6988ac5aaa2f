//! `rv commit`: write a commit message, then back up the project.
//!
//! | Step | Action                                                      |
//! |------|-------------------------------------------------------------|
//! | 1    | Resolve the workspace and its config                        |
//! | 2    | `-m MSG` → write `COMMIT_MESSAGE`, otherwise open `$EDITOR` |
//! | 3    | `resticprofile -c <config> backup <args>` with a password   |
//! | 4    | Remove `COMMIT_MESSAGE`, whatever step 3 returned           |
//!
//! An editor failure stops before step 3 and leaves the draft where it is.

use std::{
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{Context as _, Result};

use super::Context;
use crate::{
    cli::{CommitArgs, parse_known},
    credential::{self, SecretSource, Terminal},
    error::RvError,
    ui,
    workspace::Workspace,
};

/// Environment variable selecting the message editor.
pub const EDITOR_ENV: &str = "EDITOR";

/// Initial content of a new message file.
pub const PLACEHOLDER: &str = "\n# Enter commit message above\n";

pub fn run(ctx: &Context, args: &[OsString]) -> Result<u8> {
    let (args, extra): (CommitArgs, _) = match parse_known("rv commit", args) {
        Ok(parsed) => parsed,
        Err(code) => return Ok(code),
    };
    let editor = resolve_editor(std::env::var(EDITOR_ENV).ok(), &ctx.settings.commit.editor);
    commit(ctx, args, extra, &editor, &mut Terminal)
}

fn commit(
    ctx: &Context,
    args: CommitArgs,
    extra: Vec<OsString>,
    editor: &str,
    secrets: &mut dyn SecretSource,
) -> Result<u8> {
    let workspace = Workspace::require(&ctx.cwd)?;
    let config = workspace.config_file()?;
    let path = workspace.commit_message_path();

    match &args.message {
        Some(message) => write_message(&path, message)?,
        None => {
            ensure_placeholder(&path)?;
            edit(editor, &path)?;
        },
    }
    let _scratch = ScratchFile(path);

    let mut engine_args: Vec<OsString> = vec!["backup".into()];
    engine_args.extend(extra);
    let engine = ctx.engine();
    credential::scoped(secrets, false, ctx.password_env(), || {
        Ok(engine.run(&config, &engine_args)?)
    })
}

// ─── Message file ─────────────────────────────────────────────────────────────

/// Replace the message file with `message` and a trailing newline.
pub fn write_message(path: &Path, message: &str) -> Result<()> {
    fs::write(path, format!("{message}\n")).with_context(|| format!("writing {}", path.display()))
}

/// Create the message file with [`PLACEHOLDER`] unless it already exists.
pub fn ensure_placeholder(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    fs::write(path, PLACEHOLDER).with_context(|| format!("writing {}", path.display()))
}

/// Removes the message file when dropped.
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.0) {
            Ok(()) => {},
            Err(e) if e.kind() == io::ErrorKind::NotFound => {},
            Err(e) => ui::warning(&format!("could not remove {}: {e}", self.0.display())),
        }
    }
}

// ─── Editor ───────────────────────────────────────────────────────────────────

/// `$EDITOR` when set and non-blank, otherwise the configured fallback.
pub fn resolve_editor(from_env: Option<String>, fallback: &str) -> String {
    from_env
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| fallback.to_owned())
}

/// Open `path` in `editor` and wait.  The editor string may carry arguments.
fn edit(editor: &str, path: &Path) -> Result<(), RvError> {
    let mut words = editor.split_whitespace();
    let missing = || RvError::EditorMissing {
        editor: editor.to_owned(),
    };
    let program = words.next().ok_or_else(missing)?;

    tracing::debug!(editor, file = %path.display(), "opening editor");
    let status = Command::new(program)
        .args(words)
        .arg(path)
        .status()
        .map_err(|_| missing())?;

    if status.success() {
        Ok(())
    } else {
        Err(RvError::EditorFailed {
            editor: editor.to_owned(),
            code: status.code().unwrap_or(-1),
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
