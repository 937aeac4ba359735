use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;

use crate::formats::{ReaderSettings, StoredSettings};

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<ReaderSettings>>;
    async fn save(&self, settings: &ReaderSettings) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct LocalFsSettingsStore {
    path: PathBuf,
}

impl LocalFsSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for LocalFsSettingsStore {
    async fn load(&self) -> anyhow::Result<Option<ReaderSettings>> {
        let stored: Option<StoredSettings> = read_json(&self.path)
            .await
            .with_context(|| format!("read: {}", self.path.display()))?;
        Ok(stored.map(|stored| stored.settings))
    }

    async fn save(&self, settings: &ReaderSettings) -> anyhow::Result<()> {
        let stored = StoredSettings {
            settings: *settings,
            saved_at: Utc::now(),
        };
        write_json_atomic(&self.path, &stored)
            .await
            .context("write reader settings")?;
        tracing::debug!(path = %self.path.display(), "saved reader settings");
        Ok(())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let value = serde_json::from_slice(&bytes).context("parse json")?;
    Ok(Some(value))
}

async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create parent dir: {}", parent.display()))?;
    }

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value).context("serialize json")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}
