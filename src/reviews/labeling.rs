use std::time::Instant;

use serde::Serialize;

use crate::core::{Result, SentimentError};
use crate::pipelines::sentiment::SentimentScorer;

use super::results::{LabeledReview, ResultSet};
use super::table::ReviewTable;

/// How far a labeling run has got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Fraction of rows done, in `[0, 1]`. An empty run counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed.min(self.total) as f64 / self.total as f64
        }
    }
}

/// Classify the `text_column` cell of every row, in order, one at a time.
///
/// Rows never fail individually: missing text and model errors come back as
/// neutral fallbacks. The only error is naming a column the table lacks,
/// which is reported before any row is classified. `on_progress` is called
/// after each row.
pub fn label_all<S>(
    table: &ReviewTable,
    text_column: &str,
    scorer: &S,
    mut on_progress: impl FnMut(Progress),
) -> Result<ResultSet>
where
    S: SentimentScorer + ?Sized,
{
    let column = table
        .column_index(text_column)
        .ok_or_else(|| SentimentError::UnknownColumn(text_column.to_string()))?;

    let span = tracing::info_span!("label_all", column = text_column, rows = table.len());
    let _guard = span.enter();
    let started = Instant::now();

    let total = table.len();
    let mut labeled = Vec::with_capacity(total);
    for (index, record) in table.rows().iter().enumerate() {
        let classification = scorer.classify(record.value(column));
        labeled.push(LabeledReview {
            record: record.clone(),
            classification,
        });

        let progress = Progress {
            completed: index + 1,
            total,
        };
        tracing::debug!(completed = progress.completed, total, "labeled review");
        on_progress(progress);
    }

    let results = ResultSet::new(table.headers().to_vec(), text_column, labeled);
    tracing::info!(
        rows = results.len(),
        fallbacks = results.fallback_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "sentiment analysis complete"
    );
    Ok(results)
}
