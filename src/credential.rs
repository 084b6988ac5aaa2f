//! Repository password handling.
//!
//! A password is read interactively, optionally twice, and then exposed to
//! the engine through one environment variable for exactly one operation.
//! [`CredentialScope`] snapshots the whole environment when it opens and puts
//! it back when it drops, so the secret (and anything else the wrapped
//! operation exported) is gone on every exit path: success, error, or
//! unwinding panic.
//!
//! ```ignore
//! let code = credential::scoped(&mut Terminal, false, "RESTIC_PASSWORD", || {
//!     engine.run(&config, &args)
//! })?;
//! ```

use std::{
    collections::HashMap,
    ffi::OsString,
    fmt,
    io::{self, BufRead, IsTerminal, Write},
};

use crate::{error::RvError, interrupt};

const PROMPT: &str = "Password: ";
const CONFIRM_PROMPT: &str = "Confirm password: ";

// ─── Secret ───────────────────────────────────────────────────────────────────

/// A password.  `Debug` never shows the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

// ─── Input ────────────────────────────────────────────────────────────────────

/// Where passwords come from.
pub trait SecretSource {
    fn read_secret(&mut self, prompt: &str) -> io::Result<String>;
}

/// Reads from the controlling terminal with echo off.  When stdin is not a
/// terminal, one line is read from stdin instead and the prompt goes to
/// stderr; stdout is never written.
#[derive(Debug, Default, Clone, Copy)]
pub struct Terminal;

impl SecretSource for Terminal {
    fn read_secret(&mut self, prompt: &str) -> io::Result<String> {
        if io::stdin().is_terminal() {
            return rpassword::prompt_password(prompt);
        }
        let mut stderr = io::stderr();
        stderr.write_all(prompt.as_bytes())?;
        stderr.flush()?;
        read_line(&mut io::stdin().lock())
    }
}

/// Read one line without its terminator.  EOF before a newline-terminated
/// or non-empty line is an error.
fn read_line(reader: &mut impl BufRead) -> io::Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "no input available",
        ));
    }
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(line)
}

/// Prompt for a password, twice when `confirm` is set.
pub fn acquire(source: &mut dyn SecretSource, confirm: bool) -> Result<Secret, RvError> {
    let first = source.read_secret(PROMPT).map_err(RvError::CredentialInput)?;
    interrupt::check()?;
    if confirm {
        let second = source
            .read_secret(CONFIRM_PROMPT)
            .map_err(RvError::CredentialInput)?;
        interrupt::check()?;
        if first != second {
            return Err(RvError::CredentialMismatch);
        }
    }
    Ok(Secret::new(first))
}

// ─── Scope ────────────────────────────────────────────────────────────────────

/// Guard that holds a secret in the environment.  Dropping it restores the
/// environment captured by [`CredentialScope::enter`].
#[must_use = "the secret is removed as soon as the scope is dropped"]
pub struct CredentialScope {
    var: String,
    snapshot: HashMap<OsString, OsString>,
}

impl CredentialScope {
    /// Snapshot the environment, then export `secret` as `var`.
    pub fn enter(var: &str, secret: &Secret) -> Self {
        let snapshot = std::env::vars_os().collect();
        // SAFETY: rv is single-threaded apart from the Ctrl-C handler, which
        // never reads the environment.
        unsafe { std::env::set_var(var, secret.expose()) };
        tracing::debug!(var, "credential scope opened");
        Self {
            var: var.to_owned(),
            snapshot,
        }
    }
}

impl Drop for CredentialScope {
    fn drop(&mut self) {
        restore_environment(&self.snapshot);
        tracing::debug!(var = %self.var, "credential scope closed");
    }
}

/// Make the environment equal to `snapshot`: drop added keys, put back
/// removed or changed ones.
fn restore_environment(snapshot: &HashMap<OsString, OsString>) {
    let added: Vec<OsString> = std::env::vars_os()
        .map(|(k, _)| k)
        .filter(|k| !snapshot.contains_key(k))
        .collect();
    for key in added {
        // SAFETY: see `CredentialScope::enter`.
        unsafe { std::env::remove_var(&key) };
    }
    for (key, value) in snapshot {
        if std::env::var_os(key).as_ref() != Some(value) {
            // SAFETY: see `CredentialScope::enter`.
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// Prompt for a password and run `op` with it exported as `var`.
pub fn scoped<T>(
    source: &mut dyn SecretSource,
    confirm: bool,
    var: &str,
    op: impl FnOnce() -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    let secret = acquire(source, confirm)?;
    let _scope = CredentialScope::enter(var, &secret);
    op()
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::test_support;

    const VAR: &str = "RV_TEST_SECRET";

    /// Answers prompts from a fixed list.
    pub struct Scripted {
        answers: VecDeque<String>,
        pub prompts: Vec<String>,
    }

    impl Scripted {
        pub fn new(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|s| (*s).to_owned()).collect(),
                prompts: Vec::new(),
            }
        }
    }

    impl SecretSource for Scripted {
        fn read_secret(&mut self, prompt: &str) -> io::Result<String> {
            self.prompts.push(prompt.to_owned());
            self.answers
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
        }
    }

    fn env_snapshot() -> HashMap<OsString, OsString> {
        std::env::vars_os().collect()
    }

    // ── acquire ──────────────────────────────────────────────────────────────

    #[test]
    fn acquire_without_confirmation_prompts_once() {
        let _guard = test_support::lock();
        let mut src = Scripted::new(&["hunter2"]);
        let secret = acquire(&mut src, false).unwrap();
        assert_eq!(secret.expose(), "hunter2");
        assert_eq!(src.prompts, vec![PROMPT]);
    }

    #[test]
    fn acquire_with_matching_confirmation() {
        let _guard = test_support::lock();
        let mut src = Scripted::new(&["pw", "pw"]);
        let secret = acquire(&mut src, true).unwrap();
        assert_eq!(secret.expose(), "pw");
        assert_eq!(src.prompts, vec![PROMPT, CONFIRM_PROMPT]);
    }

    #[test]
    fn acquire_with_mismatch_fails() {
        let _guard = test_support::lock();
        let mut src = Scripted::new(&["a", "b"]);
        assert!(matches!(
            acquire(&mut src, true),
            Err(RvError::CredentialMismatch)
        ));
    }

    #[test]
    fn acquire_surfaces_input_errors() {
        let _guard = test_support::lock();
        let mut src = Scripted::new(&[]);
        assert!(matches!(
            acquire(&mut src, false),
            Err(RvError::CredentialInput(_))
        ));
    }

    #[test]
    fn secret_debug_is_redacted() {
        let s = Secret::new("topsecret");
        assert!(!format!("{s:?}").contains("topsecret"));
    }

    // ── read_line ────────────────────────────────────────────────────────────

    #[test]
    fn read_line_strips_terminators() {
        let mut input = io::Cursor::new("one\r\ntwo\nthree");
        assert_eq!(read_line(&mut input).unwrap(), "one");
        assert_eq!(read_line(&mut input).unwrap(), "two");
        assert_eq!(read_line(&mut input).unwrap(), "three");
        assert!(read_line(&mut input).is_err());
    }

    // ── scope ────────────────────────────────────────────────────────────────

    #[test]
    fn secret_is_visible_inside_the_scope_only() {
        let _guard = test_support::lock();
        let before = env_snapshot();

        let seen = scoped(&mut Scripted::new(&["s3cret"]), false, VAR, || {
            Ok(std::env::var(VAR).ok())
        })
        .unwrap();

        assert_eq!(seen.as_deref(), Some("s3cret"));
        assert!(std::env::var_os(VAR).is_none());
        assert_eq!(env_snapshot(), before);
    }

    #[test]
    fn environment_is_restored_after_an_error() {
        let _guard = test_support::lock();
        let before = env_snapshot();

        let result: anyhow::Result<()> = scoped(&mut Scripted::new(&["pw"]), false, VAR, || {
            // SAFETY: serialised by the test lock.
            unsafe { std::env::set_var("RV_TEST_LEAK", "1") };
            anyhow::bail!("engine blew up")
        });

        assert!(result.is_err());
        assert!(std::env::var_os("RV_TEST_LEAK").is_none());
        assert_eq!(env_snapshot(), before);
    }

    #[test]
    fn environment_is_restored_after_a_panic() {
        let _guard = test_support::lock();
        let before = env_snapshot();

        let result = std::panic::catch_unwind(|| {
            let _ = scoped(&mut Scripted::new(&["pw"]), false, VAR, || -> anyhow::Result<()> {
                panic!("boom")
            });
        });

        assert!(result.is_err());
        assert_eq!(env_snapshot(), before);
    }

    #[test]
    fn removed_and_changed_variables_come_back() {
        let _guard = test_support::lock();
        // SAFETY: serialised by the test lock.
        unsafe {
            std::env::set_var("RV_TEST_KEEP", "original");
            std::env::set_var("RV_TEST_GONE", "here");
        }
        let before = env_snapshot();

        scoped(&mut Scripted::new(&["pw"]), false, VAR, || {
            // SAFETY: serialised by the test lock.
            unsafe {
                std::env::set_var("RV_TEST_KEEP", "changed");
                std::env::remove_var("RV_TEST_GONE");
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(env_snapshot(), before);
        // SAFETY: serialised by the test lock.
        unsafe {
            std::env::remove_var("RV_TEST_KEEP");
            std::env::remove_var("RV_TEST_GONE");
        }
    }

    #[test]
    fn preexisting_value_of_the_secret_variable_is_restored() {
        let _guard = test_support::lock();
        // SAFETY: serialised by the test lock.
        unsafe { std::env::set_var(VAR, "outer") };

        scoped(&mut Scripted::new(&["inner"]), false, VAR, || {
            assert_eq!(std::env::var(VAR).unwrap(), "inner");
            Ok(())
        })
        .unwrap();

        assert_eq!(std::env::var(VAR).unwrap(), "outer");
        // SAFETY: serialised by the test lock.
        unsafe { std::env::remove_var(VAR) };
    }

    #[test]
    fn mismatch_never_opens_the_scope() {
        let _guard = test_support::lock();
        let mut ran = false;
        let result = scoped(&mut Scripted::new(&["a", "b"]), true, VAR, || {
            ran = true;
            Ok(())
        });
        assert!(result.is_err());
        assert!(!ran);
        assert!(std::env::var_os(VAR).is_none());
    }
}
