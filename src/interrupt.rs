//! Ctrl-C handling.
//!
//! The handler normally only raises a flag.  Long-running steps poll
//! [`check`] and turn a raised flag into [`RvError::Interrupted`], so
//! cancellation travels the ordinary error path and every guard (environment
//! restore, directory rollback, scratch-file removal) runs on the way out.
//! Inside an [`Immediate`] section the process exits straight away instead.

use std::{
    io::{self, Write},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use crate::error::RvError;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Number of live [`Immediate`] guards.
static IMMEDIATE: AtomicUsize = AtomicUsize::new(0);

/// Install the SIGINT handler.  Failure is logged, not fatal.
pub fn install() {
    if let Err(e) = ctrlc::set_handler(on_interrupt) {
        tracing::warn!("could not install Ctrl-C handler: {e}");
    }
}

fn on_interrupt() {
    INTERRUPTED.store(true, Ordering::SeqCst);
    if exits_immediately() {
        exit_interrupted();
    }
}

fn exit_interrupted() -> ! {
    let _ = writeln!(io::stderr());
    std::process::exit(i32::from(RvError::Interrupted.exit_code()));
}

pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// `Err(Interrupted)` once Ctrl-C has been pressed.
pub fn check() -> Result<(), RvError> {
    if interrupted() {
        Err(RvError::Interrupted)
    } else {
        Ok(())
    }
}

// ─── Immediate exit ───────────────────────────────────────────────────────────

/// While alive, Ctrl-C ends the process at once with the interrupted exit
/// code instead of raising the flag.
///
/// Blocking reads are restarted after the handler runs, so a flag alone
/// would only be seen once the user presses Enter.  Only hold one around a
/// read that leaves nothing to clean up and no terminal state to restore.
#[must_use = "Ctrl-C only exits at once while the guard is alive"]
#[derive(Debug)]
pub struct Immediate(());

/// Start an [`Immediate`] section.  An interrupt that already arrived ends
/// the process here.
pub fn immediate() -> Immediate {
    IMMEDIATE.fetch_add(1, Ordering::SeqCst);
    if cfg!(not(test)) && interrupted() {
        exit_interrupted();
    }
    Immediate(())
}

impl Drop for Immediate {
    fn drop(&mut self) {
        IMMEDIATE.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn exits_immediately() -> bool {
    IMMEDIATE.load(Ordering::SeqCst) > 0
}

#[cfg(test)]
pub fn set(value: bool) {
    INTERRUPTED.store(value, Ordering::SeqCst);
}
