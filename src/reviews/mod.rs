//! Review tables and the labeling procedure.
//!
//! An uploaded CSV becomes a [`ReviewTable`]; [`label_all`] runs a
//! [`SentimentScorer`](crate::pipelines::sentiment::SentimentScorer) over one
//! of its text columns and returns a [`ResultSet`], which can be summarised,
//! filtered and exported back to CSV.
//!
//! ```rust
//! use review_sentiment::pipelines::sentiment::{LabelScore, SentimentScorer};
//! use review_sentiment::reviews::{label_all, ReviewTable, SentimentSummary};
//!
//! struct AlwaysPositive;
//!
//! impl SentimentScorer for AlwaysPositive {
//!     fn scores(&self, _text: &str) -> review_sentiment::core::Result<Vec<LabelScore>> {
//!         Ok(vec![LabelScore::new("positive", 0.9), LabelScore::new("negative", 0.1)])
//!     }
//! }
//!
//! let table = ReviewTable::from_csv_bytes(b"review\nGreat product!\n\"\"\n")?;
//! let results = label_all(&table, "review", &AlwaysPositive, |_| {})?;
//! let summary = SentimentSummary::from_results(&results);
//! assert_eq!((summary.positive, summary.neutral), (1, 1));
//! # Ok::<(), review_sentiment::core::SentimentError>(())
//! ```

pub mod labeling;
pub mod results;
pub mod summary;
pub mod table;

pub use labeling::{label_all, Progress};
pub use results::{LabeledReview, ResultSet, SentimentFilter, CONFIDENCE_COLUMN, SENTIMENT_COLUMN};
pub use summary::{sentiment_color, ChartSlice, SentimentSummary};
pub use table::{ColumnKind, ReviewRecord, ReviewTable};
