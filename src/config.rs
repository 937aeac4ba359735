use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::session::state::{DEFAULT_FONT_SIZE, Theme, TranslationService, Viewport};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReaderConfig {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub progress_debounce_ms: u64,
    pub settings_debounce_ms: u64,
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub font_size: f32,
    pub theme: Theme,
    pub translation_service: TranslationService,
    pub settings_path: PathBuf,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api".to_owned(),
            api_token: None,
            progress_debounce_ms: 1200,
            settings_debounce_ms: 400,
            viewport_width: 390.0,
            viewport_height: 844.0,
            font_size: DEFAULT_FONT_SIZE,
            theme: Theme::default(),
            translation_service: TranslationService::default(),
            settings_path: PathBuf::from("lexipage-settings.json"),
        }
    }
}

impl ReaderConfig {
    /// Defaults, then the optional YAML file, then `LEXIPAGE_*` environment variables.
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let config = match file {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_yaml_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        serde_yaml::from_str(&raw).with_context(|| format!("parse config: {}", path.display()))
    }

    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        if let Some(url) = get("LEXIPAGE_API_URL") {
            self.api_base_url = url;
        }
        if let Some(token) = get("LEXIPAGE_API_TOKEN") {
            self.api_token = Some(token);
        }
        if let Some(raw) = get("LEXIPAGE_PROGRESS_DEBOUNCE_MS") {
            self.progress_debounce_ms = raw
                .parse()
                .with_context(|| format!("invalid LEXIPAGE_PROGRESS_DEBOUNCE_MS={raw:?}"))?;
        }
        if let Some(path) = get("LEXIPAGE_SETTINGS_PATH") {
            self.settings_path = PathBuf::from(path);
        }
        Ok(self)
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.viewport_width,
            height: self.viewport_height,
        }
    }

    pub fn progress_debounce(&self) -> Duration {
        Duration::from_millis(self.progress_debounce_ms)
    }

    pub fn settings_debounce(&self) -> Duration {
        Duration::from_millis(self.settings_debounce_ms)
    }
}
