//! Sentiment analysis pipeline.
//!
//! Classify text as `positive`, `negative`, or `neutral` with a confidence
//! score, using a pretrained RoBERTa checkpoint running on Candle.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use review_sentiment::pipelines::sentiment::*;
//!
//! # async fn run() -> review_sentiment::core::Result<()> {
//! let pipeline = SentimentAnalysisPipelineBuilder::twitter_roberta()
//!     .cpu()
//!     .build()
//!     .await?;
//!
//! // Surfaces model errors
//! let result = pipeline.predict("I absolutely love this product!")?;
//! println!("{} ({:.2})", result.sentiment(), result.confidence());
//!
//! // Never fails: empty text or model errors give neutral / 0.5
//! let result = pipeline.classify(Some(""));
//! assert_eq!(result.sentiment(), Sentiment::Neutral);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod classification;
pub mod model;
pub mod pipeline;

pub use builder::SentimentAnalysisPipelineBuilder;
pub use classification::{
    prepare_text, Classification, FallbackReason, Sentiment, FALLBACK_CONFIDENCE, MAX_TEXT_CHARS,
};
pub use model::{LabelScore, SentimentAnalysisModel};
pub use pipeline::{SentimentAnalysisPipeline, SentimentScorer};

pub use crate::pipelines::utils::DeviceSelectable;

/// Only for generic annotations. Use [`SentimentAnalysisPipelineBuilder::twitter_roberta`].
pub type SentimentRoberta = crate::models::roberta::RobertaSentimentModel;
