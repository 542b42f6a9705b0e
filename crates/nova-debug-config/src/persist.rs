//! Writing corrected configurations back to the user's stored launch definitions.

use async_trait::async_trait;
use jsonc_parser::ParseOptions;
use serde_json::{json, Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::WorkspaceFolder;

/// The editor's stored `launch.configurations` list. It is read and written
/// wholesale; there is no partial update primitive.
#[async_trait]
pub trait LaunchConfigStore: Send + Sync {
    async fn read_configurations(
        &self,
        folder: Option<&WorkspaceFolder>,
    ) -> anyhow::Result<Vec<Value>>;

    async fn write_configurations(
        &self,
        folder: Option<&WorkspaceFolder>,
        configurations: Vec<Value>,
    ) -> anyhow::Result<()>;
}

/// Replaces the stored configuration structurally equal to `original` with
/// `updated`. Returns `false` (and writes nothing) when no stored entry matches,
/// which is the case for transient configurations.
pub async fn persist_configuration(
    store: &dyn LaunchConfigStore,
    folder: Option<&WorkspaceFolder>,
    original: &Value,
    updated: Value,
) -> anyhow::Result<bool> {
    let mut configurations = store.read_configurations(folder).await?;
    let Some(index) = configurations.iter().position(|stored| stored == original) else {
        tracing::debug!(
            target: "nova.debug_config.persist",
            "configuration is not backed by stored launch definitions; skipping write"
        );
        return Ok(false);
    };

    configurations[index] = updated;
    store.write_configurations(folder, configurations).await?;
    tracing::info!(
        target: "nova.debug_config.persist",
        index,
        "updated stored launch configuration"
    );
    Ok(true)
}

/// Failures of the file-backed launch configuration store.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("no workspace folder to store launch configurations in")]
    NoFolder,
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("failed to serialize {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} must contain a JSON object with a `configurations` array", .path.display())]
    Shape { path: PathBuf },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `.vscode/launch.json` inside each workspace folder.
#[derive(Debug, Clone, Default)]
pub struct LaunchJsonFile {
    /// Used when a resolution has no workspace folder.
    pub fallback_root: Option<PathBuf>,
}

impl LaunchJsonFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path_for(&self, folder: Option<&WorkspaceFolder>) -> Option<PathBuf> {
        let root = folder
            .map(|folder| folder.path.clone())
            .or_else(|| self.fallback_root.clone())?;
        Some(root.join(".vscode").join("launch.json"))
    }

    async fn read_document(path: &Path) -> Result<Map<String, Value>, PersistError> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(PersistError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        // launch.json is JSONC: comments and trailing commas are allowed.
        let document = jsonc_parser::parse_to_serde_value(&text, &ParseOptions::default())
            .map_err(|err| PersistError::Parse {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        match document {
            None => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(PersistError::Shape {
                path: path.to_path_buf(),
            }),
        }
    }

    async fn read(&self, folder: Option<&WorkspaceFolder>) -> Result<Vec<Value>, PersistError> {
        let Some(path) = self.path_for(folder) else {
            return Ok(Vec::new());
        };
        let document = Self::read_document(&path).await?;
        match document.get("configurations") {
            Some(Value::Array(items)) => Ok(items.clone()),
            Some(_) => Err(PersistError::Shape { path }),
            None => Ok(Vec::new()),
        }
    }

    async fn write(
        &self,
        folder: Option<&WorkspaceFolder>,
        configurations: Vec<Value>,
    ) -> Result<(), PersistError> {
        let path = self.path_for(folder).ok_or(PersistError::NoFolder)?;
        let mut document = Self::read_document(&path).await?;
        if document
            .get("configurations")
            .is_some_and(|configurations| !configurations.is_array())
        {
            return Err(PersistError::Shape { path });
        }
        document
            .entry("version")
            .or_insert_with(|| json!("0.2.0"));
        document.insert("configurations".to_string(), Value::Array(configurations));

        let text = serde_json::to_string_pretty(&Value::Object(document)).map_err(|source| {
            PersistError::Serialize {
                path: path.clone(),
                source,
            }
        })?;
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&target, &text))
            .await
            .map_err(|err| PersistError::Write {
                path,
                source: std::io::Error::other(err),
            })?
    }
}

#[async_trait]
impl LaunchConfigStore for LaunchJsonFile {
    async fn read_configurations(
        &self,
        folder: Option<&WorkspaceFolder>,
    ) -> anyhow::Result<Vec<Value>> {
        Ok(self.read(folder).await?)
    }

    async fn write_configurations(
        &self,
        folder: Option<&WorkspaceFolder>,
        configurations: Vec<Value>,
    ) -> anyhow::Result<()> {
        Ok(self.write(folder, configurations).await?)
    }
}

fn write_atomically(path: &Path, text: &str) -> Result<(), PersistError> {
    let write_error = |source: std::io::Error| PersistError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().ok_or(PersistError::NoFolder)?;
    std::fs::create_dir_all(dir).map_err(write_error)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_error)?;
    tmp.write_all(text.as_bytes()).map_err(write_error)?;
    tmp.write_all(b"\n").map_err(write_error)?;
    tmp.persist(path).map_err(|err| write_error(err.error))?;
    Ok(())
}
