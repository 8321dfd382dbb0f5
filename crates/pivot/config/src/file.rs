//! File-backed configuration source
//!
//! Configuration lives in external files so it can change without a
//! rebuild or redeploy. Each `*.json`/`*.yaml`/`*.yml` file in the
//! directory holds the blob for one component type; the file stem is the
//! type name.

use crate::error::{ConfigError, Result};
use crate::source::ConfigSource;
use async_trait::async_trait;
use pivot_types::TypeName;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// File-backed configuration source with mtime-aware reload
pub struct FileConfigSource {
    dir: PathBuf,
    cache: RwLock<HashMap<String, CachedBlob>>,
}

struct CachedBlob {
    value: serde_json::Value,
    modified: SystemTime,
}

impl FileConfigSource {
    /// Open a configuration directory, creating it if absent, and load all
    /// recognized files
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let source = Self {
            dir,
            cache: RwLock::new(HashMap::new()),
        };
        source.reload().await?;
        Ok(source)
    }

    /// The directory this source reads from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of all currently loaded configuration keys
    pub async fn keys(&self) -> Vec<String> {
        self.cache.read().await.keys().cloned().collect()
    }

    async fn reload_file(&self, path: &Path) -> Result<()> {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            return Ok(());
        };
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            return Ok(());
        };
        if !matches!(ext, "json" | "yaml" | "yml") {
            return Ok(());
        }

        let modified = tokio::fs::metadata(path).await?.modified()?;
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(stem) {
                if cached.modified >= modified {
                    return Ok(());
                }
            }
        }

        let contents = tokio::fs::read_to_string(path).await?;
        let parsed = parse_blob(&contents, ext).map_err(|message| ConfigError::Parse {
            file: path.display().to_string(),
            message,
        })?;

        debug!(key = stem, file = %path.display(), "Configuration loaded");
        self.cache.write().await.insert(
            stem.to_string(),
            CachedBlob {
                value: parsed,
                modified,
            },
        );
        Ok(())
    }
}

fn parse_blob(contents: &str, ext: &str) -> std::result::Result<serde_json::Value, String> {
    match ext {
        "json" => serde_json::from_str(contents).map_err(|e| e.to_string()),
        _ => {
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(contents).map_err(|e| e.to_string())?;
            serde_json::to_value(yaml).map_err(|e| e.to_string())
        }
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn load(&self, type_name: &TypeName) -> Result<Option<serde_json::Value>> {
        Ok(self
            .cache
            .read()
            .await
            .get(type_name.as_str())
            .map(|cached| cached.value.clone()))
    }

    async fn reload(&self) -> Result<()> {
        let mut dir = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            // A broken file must not take down the rest of the reload.
            if let Err(e) = self.reload_file(&path).await {
                warn!(file = %path.display(), error = %e, "Skipping unreadable configuration file");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write(dir: &Path, name: &str, contents: &str) {
        tokio::fs::write(dir.join(name), contents).await.unwrap();
    }

    #[tokio::test]
    async fn test_loads_json_and_yaml() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "sensor.json", r#"{ "gain": 2 }"#).await;
        write(tmp.path(), "sink.yaml", "buffer: 64\n").await;

        let source = FileConfigSource::open(tmp.path()).await.unwrap();

        let sensor = source.load(&TypeName::new("sensor")).await.unwrap();
        assert_eq!(sensor, Some(serde_json::json!({ "gain": 2 })));

        let sink = source.load(&TypeName::new("sink")).await.unwrap();
        assert_eq!(sink, Some(serde_json::json!({ "buffer": 64 })));

        assert!(source.load(&TypeName::new("ghost")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reload_picks_up_new_files() {
        let tmp = tempfile::tempdir().unwrap();
        let source = FileConfigSource::open(tmp.path()).await.unwrap();
        assert!(source.load(&TypeName::new("sensor")).await.unwrap().is_none());

        write(tmp.path(), "sensor.json", r#"{ "gain": 1 }"#).await;
        source.reload().await.unwrap();

        let sensor = source.load(&TypeName::new("sensor")).await.unwrap();
        assert_eq!(sensor, Some(serde_json::json!({ "gain": 1 })));
    }

    #[tokio::test]
    async fn test_broken_file_does_not_poison_reload() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "bad.json", "{ not json").await;
        write(tmp.path(), "good.json", r#"{ "ok": true }"#).await;

        let source = FileConfigSource::open(tmp.path()).await.unwrap();

        assert!(source.load(&TypeName::new("bad")).await.unwrap().is_none());
        let good = source.load(&TypeName::new("good")).await.unwrap();
        assert_eq!(good, Some(serde_json::json!({ "ok": true })));
    }

    #[tokio::test]
    async fn test_unrelated_extensions_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "notes.txt", "hello").await;

        let source = FileConfigSource::open(tmp.path()).await.unwrap();
        assert!(source.keys().await.is_empty());
    }
}
