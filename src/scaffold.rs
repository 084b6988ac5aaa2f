//! Workspace file generation: `config.yaml` and the two `.rvignore` files.
//!
//! The configuration document is a fixed resticprofile template with a single
//! substitution point, the repository location.  Nothing here rolls back on
//! failure; the caller owns the directory being written into (see
//! [`crate::provision`]).

use std::{fs, path::Path};

use anyhow::{Context, Result};

use crate::workspace::{IGNORE_FILE, REPO_DIR, Workspace, WORKSPACE_DIR};

/// Repository used when the user accepts the embedded default.
pub fn default_repository() -> String {
    format!("local:{WORKSPACE_DIR}/{REPO_DIR}")
}

// ─── Rendering ────────────────────────────────────────────────────────────────

/// Render `config.yaml` for `repository`.
pub fn render_config(repository: &str) -> String {
    let repository = yaml_quoted(repository);
    format!(
        r#"# yaml-language-server: $schema=https://creativeprojects.github.io/resticprofile/jsonschema/config.json

version: "1"

default:
  repository: {repository}

  backup:
    verbose: 1
    skip-if-unchanged: true
    exclude-file:            # paths relative to this file
      - "{IGNORE_FILE}"
      - "../{IGNORE_FILE}"
    source:
      - "."                  # relative to the working directory

  find:
    human-readable: true

  init:
    password-command: |-
      rv get-pass --confirm

  restore:
    target: "."
"#
    )
}

/// Contents of the ignore file inside the workspace.
pub fn inner_ignore() -> String {
    format!("./{WORKSPACE_DIR}/{REPO_DIR}/\n**/.git/\n")
}

/// Quote `value` as a YAML double-quoted scalar.
fn yaml_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// ─── Writing ──────────────────────────────────────────────────────────────────

/// What [`write_scaffold`] changed outside the workspace directory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Scaffolded {
    /// The outer `.rvignore` did not exist and was created empty.
    pub created_outer_ignore: bool,
}

/// Write the config document and ignore files into `workspace`, which must
/// already exist as a directory.
pub fn write_scaffold(workspace: &Workspace, repository: &str) -> Result<Scaffolded> {
    let config = workspace.config_path();
    fs::write(&config, render_config(repository))
        .with_context(|| format!("writing {}", config.display()))?;

    let ignore = workspace.ignore_path();
    fs::write(&ignore, inner_ignore()).with_context(|| format!("writing {}", ignore.display()))?;
    restrict_to_owner(&ignore)?;

    let outer = workspace.outer_ignore_path();
    let created_outer_ignore = !outer.exists();
    if created_outer_ignore {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&outer)
            .with_context(|| format!("creating {}", outer.display()))?;
    }

    tracing::debug!(dir = %workspace.dir().display(), created_outer_ignore, "scaffold written");
    Ok(Scaffolded {
        created_outer_ignore,
    })
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("chmod 600 {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> Result<()> {
    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(doc: &str) -> serde_yaml::Value {
        serde_yaml::from_str(doc).expect("rendered config must be valid YAML")
    }

    #[test]
    fn snapshot_rendered_config() {
        insta::assert_snapshot!(render_config("local:/tmp/x"), @r#"
# yaml-language-server: $schema=https://creativeprojects.github.io/resticprofile/jsonschema/config.json

version: "1"

default:
  repository: "local:/tmp/x"

  backup:
    verbose: 1
    skip-if-unchanged: true
    exclude-file:            # paths relative to this file
      - ".rvignore"
      - "../.rvignore"
    source:
      - "."                  # relative to the working directory

  find:
    human-readable: true

  init:
    password-command: |-
      rv get-pass --confirm

  restore:
    target: "."
"#);
    }

    #[test]
    fn rendered_config_has_expected_structure() {
        let doc = parse(&render_config("s3:bucket/path"));
        let default = &doc["default"];
        assert_eq!(doc["version"], "1");
        assert_eq!(default["repository"], "s3:bucket/path");
        assert_eq!(default["backup"]["verbose"], 1);
        assert_eq!(default["backup"]["skip-if-unchanged"], true);
        assert_eq!(default["backup"]["exclude-file"][0], ".rvignore");
        assert_eq!(default["backup"]["exclude-file"][1], "../.rvignore");
        assert_eq!(default["backup"]["source"][0], ".");
        assert_eq!(default["find"]["human-readable"], true);
        assert_eq!(default["init"]["password-command"], "rv get-pass --confirm");
        assert_eq!(default["restore"]["target"], ".");
    }

    #[test]
    fn awkward_repository_strings_stay_well_formed() {
        for repo in [
            r#"local:/tmp/with "quotes""#,
            r"local:C:\backups\repo",
            "sftp:user@host:/srv/repo # not a comment",
            "local:/tmp/line\nbreak",
            "local:/tmp/tab\there",
        ] {
            let doc = parse(&render_config(repo));
            assert_eq!(doc["default"]["repository"], repo, "repository {repo:?}");
        }
    }

    #[test]
    fn default_repository_is_embedded() {
        assert_eq!(default_repository(), "local:.rv/repo");
    }

    #[test]
    fn inner_ignore_excludes_repo_and_vcs() {
        let text = inner_ignore();
        assert!(text.lines().any(|l| l == "./.rv/repo/"));
        assert!(text.lines().any(|l| l == "**/.git/"));
    }

    #[test]
    fn write_scaffold_creates_files() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::at(root.path().join(WORKSPACE_DIR));
        fs::create_dir(ws.dir()).unwrap();

        let report = write_scaffold(&ws, "local:/tmp/x").unwrap();
        assert!(report.created_outer_ignore);

        let config = fs::read_to_string(ws.config_path()).unwrap();
        assert!(config.contains(r#"repository: "local:/tmp/x""#));
        assert_eq!(fs::read_to_string(ws.ignore_path()).unwrap(), inner_ignore());
        assert_eq!(fs::read_to_string(ws.outer_ignore_path()).unwrap(), "");
    }

    #[test]
    fn existing_outer_ignore_is_preserved() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::at(root.path().join(WORKSPACE_DIR));
        fs::create_dir(ws.dir()).unwrap();
        fs::write(ws.outer_ignore_path(), "target/\n").unwrap();

        let report = write_scaffold(&ws, "local:/tmp/x").unwrap();
        assert!(!report.created_outer_ignore);
        assert_eq!(
            fs::read_to_string(ws.outer_ignore_path()).unwrap(),
            "target/\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn inner_ignore_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::at(root.path().join(WORKSPACE_DIR));
        fs::create_dir(ws.dir()).unwrap();
        write_scaffold(&ws, "local:/tmp/x").unwrap();

        let mode = fs::metadata(ws.ignore_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn write_into_missing_dir_fails() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::at(root.path().join("absent").join(WORKSPACE_DIR));
        assert!(write_scaffold(&ws, "local:/tmp/x").is_err());
    }
}
