use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use review_sentiment::core::{init_tracing, AppConfig};
use review_sentiment::pipelines::sentiment::{DeviceSelectable, SentimentAnalysisPipelineBuilder};
use review_sentiment::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("failed to load config from {}", path.display()),
        None => "invalid default config".to_string(),
    })?;
    let device = config.device_request()?;

    tracing::info!(model = %config.model_repo, device = %config.device, "loading sentiment model");
    let pipeline = SentimentAnalysisPipelineBuilder::roberta(config.model_repo.clone())
        .device_request(device)
        .build()
        .await
        .with_context(|| format!("failed to load model {}", config.model_repo))?;
    tracing::info!(device = ?pipeline.device(), "sentiment model ready");

    let state = AppState::new(Arc::new(pipeline), config)?;
    server::serve(state).await.context("server stopped")?;
    Ok(())
}
