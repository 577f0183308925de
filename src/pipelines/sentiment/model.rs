use tokenizers::Tokenizer;

use crate::core::{ModelOptions, Result};

/// Score the model assigned to one of its classes.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    /// Class name as written in the model config (e.g. `"positive"`).
    pub label: String,
    /// Softmax probability in `[0, 1]`.
    pub score: f32,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait SentimentAnalysisModel {
    type Options: ModelOptions + std::fmt::Debug + Clone;

    async fn new(options: Self::Options, device: candle_core::Device) -> Result<Self>
    where
        Self: Sized;

    /// One score per class, in class-index order.
    fn class_scores(&self, tokenizer: &Tokenizer, text: &str) -> Result<Vec<LabelScore>>;

    async fn get_tokenizer(options: Self::Options) -> Result<Tokenizer>;

    fn device(&self) -> &candle_core::Device;
}
