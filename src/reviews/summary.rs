use std::f64::consts::PI;

use serde::Serialize;

use crate::pipelines::sentiment::Sentiment;

use super::results::ResultSet;

/// Chart colour for each sentiment.
pub fn sentiment_color(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Positive => "#2ecc71",
        Sentiment::Negative => "#e74c3c",
        Sentiment::Neutral => "#f39c12",
    }
}

/// Aggregate counts over a [`ResultSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SentimentSummary {
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    /// Rows that received the neutral fallback rather than a model score.
    pub fallbacks: usize,
}

impl SentimentSummary {
    pub fn from_results(results: &ResultSet) -> Self {
        let mut summary = SentimentSummary {
            total: results.len(),
            ..Default::default()
        };
        for review in results.rows() {
            match review.sentiment() {
                Sentiment::Positive => summary.positive += 1,
                Sentiment::Negative => summary.negative += 1,
                Sentiment::Neutral => summary.neutral += 1,
            }
            if review.classification.is_fallback() {
                summary.fallbacks += 1;
            }
        }
        summary
    }

    pub fn count(&self, sentiment: Sentiment) -> usize {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
        }
    }

    /// Share of all rows, in percent. Zero for an empty result set.
    pub fn percentage(&self, sentiment: Sentiment) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.count(sentiment) as f64 * 100.0 / self.total as f64
        }
    }

    /// Pie slices for the sentiments that occur, starting at twelve o'clock
    /// and running clockwise. Coordinates are in a `size x size` box.
    pub fn chart_slices(&self, size: f64) -> Vec<ChartSlice> {
        let radius = size / 2.0;
        let (cx, cy) = (radius, radius);
        let mut start = -PI / 2.0;

        Sentiment::ALL
            .iter()
            .filter(|s| self.count(**s) > 0)
            .map(|&sentiment| {
                let count = self.count(sentiment);
                let fraction = count as f64 / self.total as f64;
                let end = start + fraction * 2.0 * PI;

                let path = if count == self.total {
                    None
                } else {
                    let (x0, y0) = (cx + radius * start.cos(), cy + radius * start.sin());
                    let (x1, y1) = (cx + radius * end.cos(), cy + radius * end.sin());
                    let large_arc = u8::from(fraction > 0.5);
                    Some(format!(
                        "M {cx:.3} {cy:.3} L {x0:.3} {y0:.3} A {radius:.3} {radius:.3} 0 {large_arc} 1 {x1:.3} {y1:.3} Z"
                    ))
                };
                start = end;

                ChartSlice {
                    sentiment,
                    count,
                    fraction,
                    color: sentiment_color(sentiment),
                    path,
                }
            })
            .collect()
    }
}

/// One wedge of the sentiment pie chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSlice {
    pub sentiment: Sentiment,
    pub count: usize,
    pub fraction: f64,
    pub color: &'static str,
    /// SVG path data; `None` when this slice is the whole pie and should be
    /// drawn as a circle.
    pub path: Option<String>,
}
