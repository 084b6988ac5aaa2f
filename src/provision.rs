//! Workspace creation and replacement.
//!
//! # Protocol
//!
//! | # | Step      | Notes                                                     |
//! |---|-----------|-----------------------------------------------------------|
//! | 1 | Lock      | `<project>/.rv.lock`, fails fast if held                  |
//! | 2 | Guard     | existing `.rv` without `--override` → `AlreadyExists`     |
//! | 3 | Stage     | `--override` builds in `.rv.tmp` (stale copy removed)     |
//! | 4 | Scaffold  | config document and ignore files                          |
//! | 5 | Engine    | `resticprofile init` under a confirmed credential scope   |
//! | 6 | Activate  | `.rv` → `.rv.old`, `.rv.tmp` → `.rv`, drop `.rv.old`      |
//!
//! Any failure from step 4 on, including Ctrl-C, removes whatever this run
//! created (the working directory and a freshly created outer `.rvignore`)
//! before the error reaches the caller.  The canonical `.rv` of an override
//! is never touched before step 6, and step 6 renames the old workspace
//! aside instead of deleting it, so a failed activation can put it back.

use std::{
    ffi::OsString,
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow, bail};
use fs2::FileExt;

use crate::{
    credential::{self, SecretSource},
    engine::{Engine, exit_code},
    error::RvError,
    interrupt, scaffold,
    workspace::{WORKSPACE_DIR, Workspace},
};

/// Suffix of the directory an override is built in.
pub const STAGING_SUFFIX: &str = ".tmp";

/// Suffix the replaced workspace carries while the new one is moved in.
pub const BACKUP_SUFFIX: &str = ".old";

pub const LOCK_FILE: &str = ".rv.lock";

// ─── Repository choice ────────────────────────────────────────────────────────

/// Pick the repository location for `rv init`.
///
/// An explicit location always wins.  Otherwise `--setup-only` silently takes
/// the embedded default, and a full init asks via `confirm` first.
pub fn resolve_repository(
    requested: Option<String>,
    setup_only: bool,
    confirm: impl FnOnce() -> io::Result<bool>,
) -> Result<String, RvError> {
    match requested {
        Some(repository) => Ok(repository),
        None if setup_only => Ok(scaffold::default_repository()),
        None => match confirm() {
            Ok(true) => Ok(scaffold::default_repository()),
            Ok(false) => Err(RvError::Cancelled),
            Err(e) => {
                tracing::debug!("confirmation prompt failed: {e}");
                Err(RvError::Cancelled)
            },
        },
    }
}

// ─── Request ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct InitRequest {
    pub repository: String,
    /// Write files only; skip the engine's own init.
    pub setup_only: bool,
    /// Replace an existing workspace.
    pub replace: bool,
    /// Extra arguments for `resticprofile init`.
    pub engine_args: Vec<OsString>,
}

// ─── Provisioner ──────────────────────────────────────────────────────────────

pub struct Provisioner<'a> {
    project_dir: PathBuf,
    engine: &'a Engine,
    password_env: &'a str,
}

impl<'a> Provisioner<'a> {
    pub fn new(project_dir: impl Into<PathBuf>, engine: &'a Engine, password_env: &'a str) -> Self {
        Self {
            project_dir: project_dir.into(),
            engine,
            password_env,
        }
    }

    pub fn canonical(&self) -> Workspace {
        Workspace::at(self.project_dir.join(WORKSPACE_DIR))
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        self.project_dir.join(format!("{WORKSPACE_DIR}{suffix}"))
    }

    /// Create or replace the workspace.  On error the filesystem is as it was
    /// before the call.
    pub fn provision(
        &self,
        req: &InitRequest,
        secrets: &mut dyn SecretSource,
    ) -> Result<Workspace, RvError> {
        let _lock = WorkspaceLock::acquire(&self.project_dir)?;

        let canonical = self.canonical();
        if canonical.dir().exists() && !req.replace {
            return Err(RvError::AlreadyExists {
                path: canonical.dir().to_owned(),
            });
        }

        let backup = self.sibling(BACKUP_SUFFIX);
        let working = if req.replace {
            if backup.exists() {
                return Err(provisioning(anyhow!(
                    "{} is left over from an interrupted override; restore or remove it first",
                    backup.display()
                )));
            }
            let staging = self.sibling(STAGING_SUFFIX);
            if staging.exists() {
                tracing::debug!(dir = %staging.display(), "removing stale staging directory");
                fs::remove_dir_all(&staging)
                    .with_context(|| format!("removing {}", staging.display()))
                    .map_err(provisioning)?;
            }
            Workspace::at(staging)
        } else {
            canonical.clone()
        };

        let mut rollback = Rollback::default();
        self.build(&working, req, secrets, &mut rollback)
            .and_then(|()| {
                if req.replace {
                    swap_into_place(working.dir(), canonical.dir(), &backup)
                } else {
                    Ok(())
                }
            })
            .map_err(provisioning)?;

        rollback.disarm();
        tracing::debug!(dir = %canonical.dir().display(), "workspace provisioned");
        Ok(canonical)
    }

    fn build(
        &self,
        working: &Workspace,
        req: &InitRequest,
        secrets: &mut dyn SecretSource,
        rollback: &mut Rollback,
    ) -> anyhow::Result<()> {
        fs::create_dir(working.dir())
            .with_context(|| format!("creating {}", working.dir().display()))?;
        rollback.dir = Some(working.dir().to_owned());

        let scaffolded = scaffold::write_scaffold(working, &req.repository)?;
        if scaffolded.created_outer_ignore {
            rollback.outer_ignore = Some(working.outer_ignore_path());
        }
        interrupt::check()?;

        if !req.setup_only {
            let config = working.config_file()?;
            let mut args: Vec<OsString> = vec!["init".into()];
            args.extend(req.engine_args.iter().cloned());

            let status = credential::scoped(secrets, true, self.password_env, || {
                Ok(self.engine.status(&config, &args)?)
            })?;
            if !status.success() {
                bail!(
                    "{} init exited with status {}",
                    self.engine.program(),
                    exit_code(status)
                );
            }
            interrupt::check()?;
        }
        Ok(())
    }
}

/// Wrap a failure as `Provisioning`, keeping conditions the user should see
/// as themselves.
fn provisioning(err: anyhow::Error) -> RvError {
    match err.downcast::<RvError>() {
        Ok(
            e @ (RvError::Interrupted | RvError::CredentialMismatch | RvError::CredentialInput(_)),
        ) => e,
        Ok(other) => RvError::Provisioning(Box::new(other)),
        Err(other) => RvError::Provisioning(other.into()),
    }
}

// ─── Activation ───────────────────────────────────────────────────────────────

/// Move `staging` to `canonical`, parking any existing `canonical` at
/// `backup` until the move has succeeded.
pub fn swap_into_place(staging: &Path, canonical: &Path, backup: &Path) -> anyhow::Result<()> {
    if !canonical.exists() {
        return fs::rename(staging, canonical).with_context(|| {
            format!("renaming {} to {}", staging.display(), canonical.display())
        });
    }

    fs::rename(canonical, backup)
        .with_context(|| format!("renaming {} to {}", canonical.display(), backup.display()))?;

    if let Err(e) = fs::rename(staging, canonical) {
        if let Err(restore) = fs::rename(backup, canonical) {
            return Err(e).with_context(|| {
                format!(
                    "activating {} failed and the previous workspace could not be put back \
                     ({restore}); it is preserved at {}",
                    canonical.display(),
                    backup.display()
                )
            });
        }
        return Err(e).with_context(|| format!("activating {}", canonical.display()));
    }

    if let Err(e) = fs::remove_dir_all(backup) {
        tracing::warn!(
            "new workspace is active but {} could not be removed: {e}",
            backup.display()
        );
    }
    Ok(())
}

// ─── Rollback ─────────────────────────────────────────────────────────────────

/// Removes what a provisioning run created unless disarmed.  Runs on drop so
/// early returns and panics are covered too.
#[derive(Debug, Default)]
struct Rollback {
    dir: Option<PathBuf>,
    outer_ignore: Option<PathBuf>,
}

impl Rollback {
    fn disarm(&mut self) {
        self.dir = None;
        self.outer_ignore = None;
    }
}

impl Drop for Rollback {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if dir.exists() {
                tracing::debug!(dir = %dir.display(), "rolling back");
                if let Err(e) = fs::remove_dir_all(&dir) {
                    tracing::warn!("could not remove {}: {e}", dir.display());
                }
            }
        }
        if let Some(file) = self.outer_ignore.take() {
            if let Err(e) = fs::remove_file(&file) {
                tracing::warn!("could not remove {}: {e}", file.display());
            }
        }
    }
}

// ─── Lock ─────────────────────────────────────────────────────────────────────

/// Advisory exclusive lock held for the whole provisioning run.  Released and
/// removed on drop.
#[derive(Debug)]
pub struct WorkspaceLock {
    path: PathBuf,
    file: File,
}

impl WorkspaceLock {
    pub fn acquire(project_dir: &Path) -> Result<Self, RvError> {
        let path = project_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))
            .map_err(provisioning)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { path, file }),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(RvError::Locked {
                path: project_dir.join(WORKSPACE_DIR),
            }),
            Err(e) => Err(provisioning(
                anyhow::Error::new(e).context(format!("locking {}", path.display())),
            )),
        }
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = fs::remove_file(&self.path);
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
