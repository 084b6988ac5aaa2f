//! Terminal output and prompts.
//!
//! - **Errors are one line.** Every failure reaches the user as a single
//!   `Error: …` line on stderr; no backtraces, no internal state.
//! - **stdout stays clean.** Prompts and diagnostics go to stderr, so
//!   `rv get-pass` can be used as a password command.

use std::io::{self, BufRead, Write};

use console::style;

use crate::interrupt;

// ─── Icons ───────────────────────────────────────────────────────────────────

/// Green ✓, printed when an operation succeeds.
fn icon_ok() -> console::StyledObject<&'static str> {
    style("✓").green().bold()
}

/// Yellow !, printed in front of warnings.
fn icon_warn() -> console::StyledObject<&'static str> {
    style("!").yellow().bold().for_stderr()
}

// ─── Messages ─────────────────────────────────────────────────────────────────

pub fn success(msg: &str) {
    println!("  {}  {}", icon_ok(), style(msg).bold());
}

pub fn warning(msg: &str) {
    eprintln!("  {}  {}", icon_warn(), msg);
}

/// Print a failure.  Callers pass the fully formatted chain (`{err:#}`).
pub fn error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold().for_stderr(), msg);
}

// ─── Prompts ──────────────────────────────────────────────────────────────────

/// Ask a yes/no question on stderr and read the answer from stdin.
///
/// Anything other than `y`/`yes` (case-insensitive), including end of input,
/// counts as no.  Ctrl-C ends the process while waiting for the answer.
pub fn confirm(question: &str) -> io::Result<bool> {
    let _interruptible = interrupt::immediate();
    let mut stderr = io::stderr();
    write!(stderr, "{question} (y/N): ")?;
    stderr.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

// ─── Tests ────────────────────────────────────────────────────────────────────
