use tokenizers::Tokenizer;

use super::classification::{prepare_text, Classification, FallbackReason};
use super::model::{LabelScore, SentimentAnalysisModel};
use crate::core::Result;

/// Anything that can score a piece of text against sentiment classes.
///
/// [`classify`](SentimentScorer::classify) is the never-failing entry point
/// used for review labeling: it truncates the text, skips empty input, picks
/// the best class and turns every error into a neutral fallback.
pub trait SentimentScorer {
    /// Raw per-class scores for already prepared text.
    fn scores(&self, text: &str) -> Result<Vec<LabelScore>>;

    fn classify(&self, text: Option<&str>) -> Classification {
        let Some(text) = text.map(prepare_text).filter(|t| !t.is_empty()) else {
            return Classification::Fallback(FallbackReason::MissingText);
        };

        match self
            .scores(text)
            .and_then(|scores| Classification::from_scores(&scores))
        {
            Ok(classification) => classification,
            Err(e) => {
                tracing::warn!(error = %e, "sentiment scoring failed, falling back to neutral");
                Classification::Fallback(FallbackReason::ScoringFailed(e.to_string()))
            }
        }
    }
}

/// Classifies text sentiment (positive, negative, neutral).
///
/// Construct with [`SentimentAnalysisPipelineBuilder`](super::SentimentAnalysisPipelineBuilder).
pub struct SentimentAnalysisPipeline<M: SentimentAnalysisModel> {
    pub(crate) model: M,
    pub(crate) tokenizer: Tokenizer,
}

impl<M: SentimentAnalysisModel> SentimentAnalysisPipeline<M> {
    /// Predict the sentiment of `text`, surfacing any model error.
    pub fn predict(&self, text: &str) -> Result<Classification> {
        let scores = self.model.class_scores(&self.tokenizer, prepare_text(text))?;
        Classification::from_scores(&scores)
    }

    /// Returns the device (CPU/GPU) the model is running on.
    pub fn device(&self) -> &candle_core::Device {
        self.model.device()
    }
}

impl<M: SentimentAnalysisModel> SentimentScorer for SentimentAnalysisPipeline<M> {
    fn scores(&self, text: &str) -> Result<Vec<LabelScore>> {
        self.model.class_scores(&self.tokenizer, text)
    }
}
