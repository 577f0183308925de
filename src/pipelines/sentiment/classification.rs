use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::model::LabelScore;
use crate::core::{Result, SentimentError};

/// Characters of review text passed to the model; the rest is ignored.
pub const MAX_TEXT_CHARS: usize = 500;

/// Confidence reported whenever no model score is available.
pub const FALLBACK_CONFIDENCE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    /// Map a class name from a model config onto a sentiment.
    ///
    /// Besides the plain names this accepts the generic `LABEL_0..2` ids that
    /// older three-class sentiment checkpoints ship with (negative, neutral,
    /// positive in that order).
    pub fn from_model_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" | "label_2" => Some(Sentiment::Positive),
            "negative" | "label_0" => Some(Sentiment::Negative),
            "neutral" | "label_1" => Some(Sentiment::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = SentimentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            other => Err(SentimentError::UnexpectedOutput(format!(
                "'{other}' is not a sentiment label"
            ))),
        }
    }
}

/// Why a review received the neutral fallback instead of a model score.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// The text was missing, empty or whitespace only. The model was not run.
    MissingText,
    /// The model (or tokenizer) failed, or returned something unusable.
    ScoringFailed(String),
}

/// Outcome of classifying one review. Always carries a usable label and
/// confidence; a fallback reads as `neutral` with confidence `0.5`.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Scored { sentiment: Sentiment, confidence: f32 },
    Fallback(FallbackReason),
}

impl Classification {
    pub fn sentiment(&self) -> Sentiment {
        match self {
            Classification::Scored { sentiment, .. } => *sentiment,
            Classification::Fallback(_) => Sentiment::Neutral,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            Classification::Scored { confidence, .. } => *confidence,
            Classification::Fallback(_) => FALLBACK_CONFIDENCE,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Classification::Fallback(_))
    }

    /// Pick the highest-scoring class. Ties keep the earliest class.
    ///
    /// Unknown class names become `neutral` but keep their score.
    pub fn from_scores(scores: &[LabelScore]) -> Result<Self> {
        if let Some(bad) = scores
            .iter()
            .find(|s| !s.score.is_finite() || !(0.0..=1.0).contains(&s.score))
        {
            return Err(SentimentError::UnexpectedOutput(format!(
                "score {} for '{}' is outside [0, 1]",
                bad.score, bad.label
            )));
        }

        let best = scores
            .iter()
            .fold(None::<&LabelScore>, |best, candidate| match best {
                Some(b) if b.score >= candidate.score => Some(b),
                _ => Some(candidate),
            })
            .ok_or_else(|| SentimentError::UnexpectedOutput("model returned no scores".into()))?;

        Ok(Classification::Scored {
            sentiment: Sentiment::from_model_label(&best.label).unwrap_or(Sentiment::Neutral),
            confidence: best.score,
        })
    }
}

/// Cut `text` to its first [`MAX_TEXT_CHARS`] characters, then trim.
///
/// Truncating first means any string and its 500-character prefix are
/// classified identically.
pub fn prepare_text(text: &str) -> &str {
    let end = text
        .char_indices()
        .nth(MAX_TEXT_CHARS)
        .map_or(text.len(), |(idx, _)| idx);
    text[..end].trim()
}
