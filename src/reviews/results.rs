use std::fmt;
use std::io::Write;
use std::str::FromStr;

use crate::core::{Result, SentimentError};
use crate::pipelines::sentiment::{Classification, Sentiment};

use super::table::ReviewRecord;

pub const SENTIMENT_COLUMN: &str = "sentiment";
pub const CONFIDENCE_COLUMN: &str = "confidence";

/// A review row together with the sentiment assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledReview {
    pub record: ReviewRecord,
    pub classification: Classification,
}

impl LabeledReview {
    pub fn sentiment(&self) -> Sentiment {
        self.classification.sentiment()
    }

    pub fn confidence(&self) -> f32 {
        self.classification.confidence()
    }
}

/// All labeled reviews from one analysis run, in upload order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    headers: Vec<String>,
    text_column: String,
    rows: Vec<LabeledReview>,
}

impl ResultSet {
    pub fn new(headers: Vec<String>, text_column: impl Into<String>, rows: Vec<LabeledReview>) -> Self {
        Self {
            headers,
            text_column: text_column.into(),
            rows,
        }
    }

    /// Headers of the uploaded table.
    pub fn input_headers(&self) -> &[String] {
        &self.headers
    }

    pub fn text_column(&self) -> &str {
        &self.text_column
    }

    pub fn rows(&self) -> &[LabeledReview] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn fallback_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.classification.is_fallback())
            .count()
    }

    /// Uploaded headers plus `sentiment` and `confidence`. A column that
    /// already uses one of those names is overwritten where it stands.
    pub fn output_headers(&self) -> Vec<String> {
        let mut headers = self.headers.clone();
        for added in [SENTIMENT_COLUMN, CONFIDENCE_COLUMN] {
            if !headers.iter().any(|h| h == added) {
                headers.push(added.to_string());
            }
        }
        headers
    }

    /// Cell values for `review`, aligned with [`output_headers`](Self::output_headers).
    pub fn output_row(&self, review: &LabeledReview) -> Vec<String> {
        let sentiment = review.sentiment().to_string();
        let confidence = review.confidence().to_string();

        let mut cells: Vec<String> = self
            .headers
            .iter()
            .zip(review.record.cells())
            .map(|(header, cell)| match header.as_str() {
                SENTIMENT_COLUMN => sentiment.clone(),
                CONFIDENCE_COLUMN => confidence.clone(),
                _ => cell.clone(),
            })
            .collect();

        if !self.headers.iter().any(|h| h == SENTIMENT_COLUMN) {
            cells.push(sentiment);
        }
        if !self.headers.iter().any(|h| h == CONFIDENCE_COLUMN) {
            cells.push(confidence);
        }
        cells
    }

    /// Write the results as CSV with a header row and no index column.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.output_headers())?;
        for review in &self.rows {
            writer.write_record(self.output_row(review))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(buffer)
    }

    pub fn filter(&self, filter: SentimentFilter) -> impl Iterator<Item = &LabeledReview> {
        self.rows.iter().filter(move |r| filter.matches(r.sentiment()))
    }

    /// Sentiments that occur in the results, in order of first appearance.
    pub fn sentiments_present(&self) -> Vec<Sentiment> {
        let mut present = Vec::new();
        for review in &self.rows {
            let sentiment = review.sentiment();
            if !present.contains(&sentiment) {
                present.push(sentiment);
            }
        }
        present
    }
}

/// Which rows the results view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SentimentFilter {
    #[default]
    All,
    Only(Sentiment),
}

impl SentimentFilter {
    pub fn matches(&self, sentiment: Sentiment) -> bool {
        match self {
            SentimentFilter::All => true,
            SentimentFilter::Only(wanted) => *wanted == sentiment,
        }
    }
}

impl fmt::Display for SentimentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentFilter::All => f.write_str("All"),
            SentimentFilter::Only(sentiment) => write!(f, "{sentiment}"),
        }
    }
}

impl FromStr for SentimentFilter {
    type Err = SentimentError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("all") || s.is_empty() {
            return Ok(SentimentFilter::All);
        }
        s.to_ascii_lowercase().parse().map(SentimentFilter::Only)
    }
}
