//! Session configuration: loads optional ~/.satie/config.yaml.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dsl::ParseOptions;
use crate::playback::DEFAULT_CLIP_SECONDS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config {}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },
}

fn default_tick_seconds() -> f64 {
    0.02
}

fn default_clip_seconds() -> f64 {
    DEFAULT_CLIP_SECONDS
}

/// Settings for a playback session.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SessionConfig {
    /// RNG seed. Fresh entropy per session when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Scheduler step in seconds.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f64,
    /// Directory holding WAV clips.
    #[serde(default)]
    pub clip_root: Option<PathBuf>,
    /// Clip length used when the backend cannot report one.
    #[serde(default = "default_clip_seconds")]
    pub default_clip_seconds: f64,
    /// Treat unknown ease names as errors instead of using linear.
    #[serde(default)]
    pub strict_easing: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: None,
            tick_seconds: default_tick_seconds(),
            clip_root: None,
            default_clip_seconds: default_clip_seconds(),
            strict_easing: false,
        }
    }
}

impl SessionConfig {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            strict_easing: self.strict_easing,
        }
    }

    fn validate(self, path: &Path) -> Result<Self, ConfigError> {
        let invalid = |message: &str| ConfigError::Invalid {
            path: path.to_path_buf(),
            message: message.to_string(),
        };
        if !(self.tick_seconds.is_finite() && self.tick_seconds > 0.0) {
            return Err(invalid("tick_seconds must be positive"));
        }
        if !(self.default_clip_seconds.is_finite() && self.default_clip_seconds >= 0.0) {
            return Err(invalid("default_clip_seconds must not be negative"));
        }
        Ok(self)
    }
}

/// Get the default config file path.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".satie").join("config.yaml"))
}

/// Load config from `path`. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<SessionConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(SessionConfig::default())
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if content.trim().is_empty() {
        return Ok(SessionConfig::default());
    }
    let config: SessionConfig =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate(path)
}

/// Load config from ~/.satie/config.yaml, or defaults when there is none.
pub fn load_config() -> Result<SessionConfig, ConfigError> {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => Ok(SessionConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.seed, None);
        assert_eq!(config.tick_seconds, 0.02);
        assert_eq!(config.default_clip_seconds, 2.0);
        assert!(!config.strict_easing);
        assert!(!config.parse_options().strict_easing);
    }

    #[test]
    fn partial_yaml_config() {
        let config: SessionConfig = serde_yaml::from_str("seed: 42\nstrict_easing: true\n").unwrap();
        assert_eq!(config.seed, Some(42));
        assert!(config.strict_easing);
        assert_eq!(config.tick_seconds, 0.02);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("none.yaml")).unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn load_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "seed: 7\ntick_seconds: 0.05\nclip_root: /srv/clips\ndefault_clip_seconds: 3.5"
        )
        .unwrap();
        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.tick_seconds, 0.05);
        assert_eq!(config.clip_root, Some(PathBuf::from("/srv/clips")));
        assert_eq!(config.default_clip_seconds, 3.5);
    }

    #[test]
    fn malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "seed: [not, a, number]").unwrap();
        assert!(matches!(
            load_config_from(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn non_positive_tick_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tick_seconds: 0").unwrap();
        let err = load_config_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("tick_seconds"));
    }
}
