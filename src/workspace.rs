//! Workspace discovery and layout.
//!
//! A workspace is the `.rv` directory of a project.  Commands run from the
//! project root or from any directory below it; [`Workspace::discover`] walks
//! up from the working directory and returns the nearest `.rv`.
//!
//! ```text
//! project/
//! ├── .rvignore            outer excludes, user-owned
//! └── .rv/
//!     ├── config.yaml      resticprofile configuration
//!     ├── .rvignore        inner excludes (repo store, VCS metadata)
//!     ├── COMMIT_MESSAGE   scratch file, only during `rv commit`
//!     └── repo/            embedded repository (optional)
//! ```

use std::path::{Path, PathBuf};

use crate::error::RvError;

/// Name of the workspace directory.
pub const WORKSPACE_DIR: &str = ".rv";

pub const CONFIG_FILE: &str = "config.yaml";
pub const IGNORE_FILE: &str = ".rvignore";
pub const COMMIT_MESSAGE_FILE: &str = "COMMIT_MESSAGE";
pub const REPO_DIR: &str = "repo";

/// A located (or about-to-be-created) workspace directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    /// Wrap an explicit workspace directory without checking it exists.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Find the nearest workspace at or above `start`.
    ///
    /// Only directories count: a regular file named `.rv` is skipped and the
    /// search continues upward.
    pub fn discover(start: &Path) -> Option<Self> {
        let found = start
            .ancestors()
            .map(|dir| dir.join(WORKSPACE_DIR))
            .find(|candidate| candidate.is_dir())
            .map(Self::at);
        match &found {
            Some(ws) => tracing::debug!(dir = %ws.dir.display(), "workspace found"),
            None => tracing::debug!(start = %start.display(), "no workspace in ancestry"),
        }
        found
    }

    /// Like [`Workspace::discover`] but absence is an error.
    pub fn require(start: &Path) -> Result<Self, RvError> {
        Self::discover(start).ok_or(RvError::NotInWorkspace {
            marker: WORKSPACE_DIR,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The project directory holding the workspace.
    pub fn project_dir(&self) -> &Path {
        self.dir.parent().unwrap_or(Path::new("."))
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn ignore_path(&self) -> PathBuf {
        self.dir.join(IGNORE_FILE)
    }

    /// The ignore file next to the workspace, in the project directory.
    pub fn outer_ignore_path(&self) -> PathBuf {
        self.project_dir().join(IGNORE_FILE)
    }

    pub fn commit_message_path(&self) -> PathBuf {
        self.dir.join(COMMIT_MESSAGE_FILE)
    }

    /// Configuration document path, which must exist.
    pub fn config_file(&self) -> Result<PathBuf, RvError> {
        let path = self.config_path();
        if path.is_file() {
            Ok(path)
        } else {
            Err(RvError::ConfigMissing { path })
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn finds_workspace_in_start_dir() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join(WORKSPACE_DIR)).unwrap();

        let ws = Workspace::discover(root.path()).unwrap();
        assert_eq!(ws.dir(), root.path().join(WORKSPACE_DIR));
        assert_eq!(ws.project_dir(), root.path());
    }

    #[test]
    fn finds_workspace_from_any_depth_below_it() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join(WORKSPACE_DIR)).unwrap();
        let deep = root.path().join("a").join("b").join("c");
        fs::create_dir_all(&deep).unwrap();

        for start in [root.path().join("a"), root.path().join("a/b"), deep] {
            let ws = Workspace::discover(&start).unwrap();
            assert_eq!(ws.dir(), root.path().join(WORKSPACE_DIR));
        }
    }

    #[test]
    fn nearest_workspace_wins() {
        let root = tempfile::tempdir().unwrap();
        let inner = root.path().join("nested");
        fs::create_dir_all(root.path().join(WORKSPACE_DIR)).unwrap();
        fs::create_dir_all(inner.join(WORKSPACE_DIR)).unwrap();
        fs::create_dir_all(inner.join("src")).unwrap();

        let ws = Workspace::discover(&inner.join("src")).unwrap();
        assert_eq!(ws.dir(), inner.join(WORKSPACE_DIR));
    }

    #[test]
    fn regular_file_named_like_the_marker_is_ignored() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join(WORKSPACE_DIR)).unwrap();
        let sub = root.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join(WORKSPACE_DIR), "not a dir").unwrap();

        let ws = Workspace::discover(&sub).unwrap();
        assert_eq!(ws.dir(), root.path().join(WORKSPACE_DIR));
    }

    #[test]
    fn absent_when_no_marker_up_to_root() {
        let root = tempfile::tempdir().unwrap();
        let sub = root.path().join("x").join("y");
        fs::create_dir_all(&sub).unwrap();

        // Guard against a stray `.rv` somewhere above the temp dir.
        if root.path().ancestors().any(|d| d.join(WORKSPACE_DIR).is_dir()) {
            return;
        }
        assert!(Workspace::discover(&sub).is_none());
        assert!(matches!(
            Workspace::require(&sub),
            Err(RvError::NotInWorkspace { .. })
        ));
    }

    #[test]
    fn layout_paths() {
        let ws = Workspace::at("/work/.rv");
        assert_eq!(ws.config_path(), Path::new("/work/.rv/config.yaml"));
        assert_eq!(ws.ignore_path(), Path::new("/work/.rv/.rvignore"));
        assert_eq!(ws.outer_ignore_path(), Path::new("/work/.rvignore"));
        assert_eq!(
            ws.commit_message_path(),
            Path::new("/work/.rv/COMMIT_MESSAGE")
        );
    }

    #[test]
    fn config_file_must_exist() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::at(root.path().join(WORKSPACE_DIR));
        fs::create_dir(ws.dir()).unwrap();

        assert!(matches!(
            ws.config_file(),
            Err(RvError::ConfigMissing { .. })
        ));

        fs::write(ws.config_path(), "version: \"1\"\n").unwrap();
        assert_eq!(ws.config_file().unwrap(), ws.config_path());
    }
}
