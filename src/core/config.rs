use std::path::Path;

use serde::Deserialize;

use super::error::{Result, SentimentError};
use crate::pipelines::utils::DeviceRequest;

pub const DEFAULT_MODEL_REPO: &str = "cardiffnlp/twitter-roberta-base-sentiment-latest";

/// Settings for the review sentiment web app.
///
/// Every field has a default, so a config file only needs the keys it wants
/// to change:
///
/// ```json
/// { "port": 9000, "device": "cpu" }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub bind_address: String,
    pub port: u16,
    /// Hugging Face repository holding the sequence-classification model.
    pub model_repo: String,
    /// `auto`, `cpu` or `cuda:<index>`.
    pub device: String,
    pub max_upload_bytes: usize,
    pub preview_rows: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8501,
            model_repo: DEFAULT_MODEL_REPO.to_string(),
            device: "auto".to_string(),
            max_upload_bytes: 50 * 1024 * 1024,
            preview_rows: 5,
        }
    }
}

impl AppConfig {
    /// Read a JSON config file, filling unspecified keys with defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SentimentError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| SentimentError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(SentimentError::Config("port cannot be zero".into()));
        }
        if self.max_upload_bytes == 0 {
            return Err(SentimentError::Config(
                "max_upload_bytes cannot be zero".into(),
            ));
        }
        if self.model_repo.trim().is_empty() {
            return Err(SentimentError::Config("model_repo cannot be empty".into()));
        }
        self.device_request()?;
        Ok(())
    }

    pub fn device_request(&self) -> Result<DeviceRequest> {
        self.device.parse()
    }

    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
