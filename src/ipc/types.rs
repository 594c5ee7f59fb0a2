use crate::config::{Config, ConfigError};
use crate::db;
use crate::forms::Forms;
use crate::store::SqliteStore;
use rusqlite::Connection;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to open workspace database: {0:#}")]
    Db(anyhow::Error),
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub config: Config,
    /// File the active config came from, if any.
    pub config_path: Option<PathBuf>,
    /// `--config` from the command line; wins over the workspace file.
    pub config_override: Option<PathBuf>,
    pub forms: Forms,
}

impl AppState {
    pub fn new(config_override: Option<PathBuf>) -> Self {
        Self {
            workspace: None,
            db: None,
            config: Config::default(),
            config_path: None,
            config_override,
            forms: Forms::default(),
        }
    }

    pub fn store(&self) -> Option<SqliteStore<'_>> {
        self.db.as_ref().map(SqliteStore::new)
    }

    /// Opens (or creates) the workspace. The previous workspace stays
    /// selected if anything fails.
    pub fn open_workspace(&mut self, path: &Path) -> Result<(), WorkspaceError> {
        let (config, config_path) =
            Config::resolve(self.config_override.as_deref(), Some(path))?;
        let conn = db::open_db(path).map_err(WorkspaceError::Db)?;

        self.workspace = Some(path.to_path_buf());
        self.db = Some(conn);
        self.config = config;
        self.config_path = config_path;
        self.forms = Forms::default();
        tracing::info!(workspace = %path.display(), "workspace opened");
        Ok(())
    }

    pub fn reload_config(&mut self) -> Result<(), ConfigError> {
        let (config, config_path) =
            Config::resolve(self.config_override.as_deref(), self.workspace.as_deref())?;
        self.config = config;
        self.config_path = config_path;
        Ok(())
    }

    /// Drops the connection so the database file can be replaced. Nothing
    /// is selected afterwards until a workspace is opened again.
    pub fn close_workspace(&mut self) {
        self.workspace = None;
        self.db = None;
        self.forms = Forms::default();
    }
}
