use super::model::SentimentAnalysisModel;
use super::pipeline::SentimentAnalysisPipeline;
use crate::core::{global_cache, Result};
use crate::models::roberta::{RobertaSentimentModel, RobertaSentimentOptions};
use crate::pipelines::utils::{build_cache_key, DeviceRequest, DeviceSelectable};

pub struct SentimentAnalysisPipelineBuilder<M: SentimentAnalysisModel> {
    options: M::Options,
    device_request: DeviceRequest,
}

impl<M: SentimentAnalysisModel> SentimentAnalysisPipelineBuilder<M> {
    pub fn new(options: M::Options) -> Self {
        Self {
            options,
            device_request: DeviceRequest::Default,
        }
    }

    /// Build the pipeline. The model is loaded through the global cache, so
    /// building twice with the same options and device loads it once.
    pub async fn build(self) -> Result<SentimentAnalysisPipeline<M>>
    where
        M: Clone + Send + Sync + 'static,
    {
        let device = self.device_request.resolve()?;
        let key = build_cache_key(&self.options, &device);
        let model = global_cache()
            .get_or_create(&key, || M::new(self.options.clone(), device.clone()))
            .await?;
        let tokenizer = M::get_tokenizer(self.options).await?;
        Ok(SentimentAnalysisPipeline { model, tokenizer })
    }
}

impl<M: SentimentAnalysisModel> DeviceSelectable for SentimentAnalysisPipelineBuilder<M> {
    fn device_request_mut(&mut self) -> &mut DeviceRequest {
        &mut self.device_request
    }
}

impl SentimentAnalysisPipelineBuilder<RobertaSentimentModel> {
    /// Any RoBERTa sequence-classification checkpoint on the Hub.
    pub fn roberta(repo_id: impl Into<String>) -> Self {
        Self::new(RobertaSentimentOptions::new(repo_id))
    }

    /// `cardiffnlp/twitter-roberta-base-sentiment-latest`, a three-class
    /// (negative, neutral, positive) model.
    pub fn twitter_roberta() -> Self {
        Self::new(RobertaSentimentOptions::default())
    }
}
