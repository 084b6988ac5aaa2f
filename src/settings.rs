//! Tool settings and loading logic.
//!
//! These are `rv`'s own knobs, not the engine configuration (that lives in
//! each workspace's `config.yaml`, see [`crate::scaffold`]).  Every field has a
//! default, so the settings file is entirely optional.
//!
//! # File format
//!
//! ```toml
//! [engine]
//! program      = "resticprofile"   # binary used for passthrough and init
//! password_env = "RESTIC_PASSWORD" # variable the secret is injected into
//!
//! [commit]
//! editor = "vi"                    # used when $EDITOR is unset
//! ```
//!
//! # Sources, lowest priority first
//!
//! 1. Built-in defaults
//! 2. `$RV_SETTINGS`, or `~/.config/rv/settings.toml` when unset
//! 3. `$RV_ENGINE` overrides `engine.program`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming an alternative settings file.
pub const SETTINGS_ENV: &str = "RV_SETTINGS";

/// Environment variable overriding the engine binary.
pub const ENGINE_ENV: &str = "RV_ENGINE";

// ─── Resolved settings ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub engine: EngineSettings,
    pub commit: CommitSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Name or path of the engine binary.
    pub program: String,

    /// Environment variable that carries the repository password to the
    /// engine while a credential scope is open.
    pub password_env: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSettings {
    /// Fallback editor for `rv commit` without `-m`.
    pub editor: String,
}

impl Default for Settings {
    fn default() -> Self {
        PartialSettings::default().resolve()
    }
}

// ─── Partial settings ─────────────────────────────────────────────────────────

/// One layer of settings as it appears on disk: every field optional.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialSettings {
    #[serde(default)]
    pub engine: PartialEngine,
    #[serde(default)]
    pub commit: PartialCommit,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialEngine {
    pub program: Option<String>,
    pub password_env: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialCommit {
    pub editor: Option<String>,
}

impl PartialSettings {
    /// Layer `other` on top of `self`; fields set in `other` win.
    pub fn merge(self, other: Self) -> Self {
        Self {
            engine: PartialEngine {
                program: other.engine.program.or(self.engine.program),
                password_env: other.engine.password_env.or(self.engine.password_env),
            },
            commit: PartialCommit {
                editor: other.commit.editor.or(self.commit.editor),
            },
        }
    }

    /// Fill every unset field with its default.
    pub fn resolve(self) -> Settings {
        Settings {
            engine: EngineSettings {
                program: self.engine.program.unwrap_or_else(default_program),
                password_env: self
                    .engine
                    .password_env
                    .unwrap_or_else(default_password_env),
            },
            commit: CommitSettings {
                editor: self.commit.editor.unwrap_or_else(default_editor),
            },
        }
    }
}

// ─── Defaults ─────────────────────────────────────────────────────────────────

pub fn default_program() -> String {
    "resticprofile".into()
}

pub fn default_password_env() -> String {
    "RESTIC_PASSWORD".into()
}

pub fn default_editor() -> String {
    "vi".into()
}

// ─── Loader ───────────────────────────────────────────────────────────────────

impl Settings {
    /// Load settings from the standard locations and the environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(SETTINGS_ENV)
            .map(PathBuf::from)
            .or_else(default_settings_path);
        let engine = std::env::var(ENGINE_ENV).ok().filter(|s| !s.is_empty());
        Self::load_from(path.as_deref(), engine)
    }

    /// Load settings from an explicit file plus an optional engine override.
    pub fn load_from(path: Option<&Path>, engine_override: Option<String>) -> Result<Self> {
        let file = match path {
            Some(p) => parse_partial(p)?.unwrap_or_default(),
            None => PartialSettings::default(),
        };
        let env = PartialSettings {
            engine: PartialEngine {
                program: engine_override,
                password_env: None,
            },
            commit: PartialCommit::default(),
        };
        let settings = file.merge(env).resolve();
        tracing::debug!(?settings, "settings loaded");
        Ok(settings)
    }
}

/// `~/.config/rv/settings.toml`, or `None` when there is no config dir.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|d| d.join("rv").join("settings.toml"))
}

/// Parse one settings layer.  A missing file is `Ok(None)`.
pub fn parse_partial(path: &Path) -> Result<Option<PartialSettings>> {
    if !path.exists() {
        return Ok(None);
    }
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let partial = toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(partial))
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_target_resticprofile() {
        let s = Settings::default();
        assert_eq!(s.engine.program, "resticprofile");
        assert_eq!(s.engine.password_env, "RESTIC_PASSWORD");
        assert_eq!(s.commit.editor, "vi");
    }

    #[test]
    fn merge_prefers_the_upper_layer() {
        let lower: PartialSettings = toml::from_str(
            r#"
            [engine]
            program = "lower"
            password_env = "LOWER_PW"
            "#,
        )
        .unwrap();
        let upper: PartialSettings = toml::from_str(
            r#"
            [engine]
            program = "upper"
            "#,
        )
        .unwrap();

        let s = lower.merge(upper).resolve();
        assert_eq!(s.engine.program, "upper");
        assert_eq!(s.engine.password_env, "LOWER_PW");
    }

    #[test]
    fn empty_file_resolves_to_defaults() {
        let partial: PartialSettings = toml::from_str("").unwrap();
        assert_eq!(partial.resolve(), Settings::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<PartialSettings, _> = toml::from_str("[engine]\nprogramm = \"x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(parse_partial(&path).unwrap().is_none());
        assert_eq!(
            Settings::load_from(Some(&path), None).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn file_values_are_applied() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"
            [engine]
            program = "/opt/bin/resticprofile"

            [commit]
            editor = "nano"
            "#
        )
        .unwrap();

        let s = Settings::load_from(Some(f.path()), None).unwrap();
        assert_eq!(s.engine.program, "/opt/bin/resticprofile");
        assert_eq!(s.commit.editor, "nano");
    }

    #[test]
    fn engine_override_beats_the_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "[engine]\nprogram = \"from-file\"\n").unwrap();

        let s = Settings::load_from(Some(f.path()), Some("from-env".into())).unwrap();
        assert_eq!(s.engine.program, "from-env");
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "not valid toml ][[[").unwrap();
        assert!(Settings::load_from(Some(f.path()), None).is_err());
    }
}
