//! Workspace configuration.
//!
//! Settings come from `rosterd.toml`. The file is either given explicitly on
//! the command line or found in the workspace root. A missing file means
//! defaults.

use crate::model::StudentStatus;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "rosterd.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub students: StudentsConfig,

    #[serde(default)]
    pub courses: CoursesConfig,

    #[serde(default)]
    pub references: ReferencesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentsConfig {
    /// Status put on a blank student draft.
    #[serde(default)]
    pub default_status: StudentStatus,
}

impl Default for StudentsConfig {
    fn default() -> Self {
        Self {
            default_status: StudentStatus::Active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoursesConfig {
    /// Prefix for generated course codes (`<prefix>-<unix millis>`).
    #[serde(default = "default_code_prefix")]
    pub code_prefix: String,
}

impl Default for CoursesConfig {
    fn default() -> Self {
        Self {
            code_prefix: default_code_prefix(),
        }
    }
}

fn default_code_prefix() -> String {
    "COURSE".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferencesConfig {
    #[serde(default)]
    pub course_policy: CoursePolicy,
}

/// What to do when a student names a course that does not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoursePolicy {
    #[default]
    Tolerate,
    Enforce,
}

impl Config {
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Explicit path wins; otherwise `<workspace>/rosterd.toml` if it exists.
    pub fn resolve(
        explicit: Option<&Path>,
        workspace: Option<&Path>,
    ) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let candidate = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => workspace
                .map(|w| w.join(CONFIG_FILE_NAME))
                .filter(|p| p.is_file()),
        };
        match candidate {
            Some(p) => Ok((Self::load(&p)?, Some(p))),
            None => Ok((Self::default(), None)),
        }
    }
}
