// Integration tests for the labeling procedure.
// Uses a deterministic scorer so no model download is needed.

use std::sync::Mutex;

use review_sentiment::core::{Result, SentimentError};
use review_sentiment::pipelines::sentiment::*;
use review_sentiment::reviews::*;

/// Scores by keyword and remembers every text it was handed.
#[derive(Default)]
struct KeywordScorer {
    seen: Mutex<Vec<String>>,
}

impl SentimentScorer for KeywordScorer {
    fn scores(&self, text: &str) -> Result<Vec<LabelScore>> {
        self.seen.lock().unwrap().push(text.to_string());
        if text.contains("\u{0}") {
            return Err(SentimentError::Tokenization("nul byte".into()));
        }
        let lower = text.to_lowercase();
        let (neg, neu, pos) = if lower.contains("great") || lower.contains("love") {
            (0.02, 0.08, 0.9)
        } else if lower.contains("terrible") || lower.contains("broke") {
            (0.85, 0.1, 0.05)
        } else {
            (0.25, 0.5, 0.25)
        };
        Ok(vec![
            LabelScore::new("negative", neg),
            LabelScore::new("neutral", neu),
            LabelScore::new("positive", pos),
        ])
    }
}

const REVIEWS: &str = "\
order_id,review,stars
1001,Great product!,5
1002,\"Terrible, broke immediately\",1
1003,It's okay I guess,3
1004,,
1005,NA,2
";

#[test]
fn labels_every_row_and_keeps_fields() -> anyhow::Result<()> {
    let table = ReviewTable::from_csv_bytes(REVIEWS.as_bytes())?;
    let scorer = KeywordScorer::default();
    let results = label_all(&table, "review", &scorer, |_| {})?;

    assert_eq!(results.len(), table.len());
    let labels: Vec<_> = results.rows().iter().map(|r| r.sentiment()).collect();
    assert_eq!(
        labels,
        vec![
            Sentiment::Positive,
            Sentiment::Negative,
            Sentiment::Neutral,
            Sentiment::Neutral,
            Sentiment::Neutral,
        ]
    );
    for (original, labeled) in table.rows().iter().zip(results.rows()) {
        assert_eq!(&labeled.record, original);
        assert!((0.0..=1.0).contains(&labeled.confidence()));
    }

    // Missing cells never reach the scorer.
    assert_eq!(scorer.seen.lock().unwrap().len(), 3);
    assert_eq!(results.rows()[3].confidence(), FALLBACK_CONFIDENCE);
    assert_eq!(results.rows()[4].confidence(), FALLBACK_CONFIDENCE);
    Ok(())
}

#[test]
fn counts_sum_to_total() -> anyhow::Result<()> {
    let table = ReviewTable::from_csv_bytes(REVIEWS.as_bytes())?;
    let results = label_all(&table, "review", &KeywordScorer::default(), |_| {})?;
    let summary = SentimentSummary::from_results(&results);

    assert_eq!(summary.total, 5);
    assert_eq!(summary.positive + summary.negative + summary.neutral, summary.total);
    assert_eq!(summary.fallbacks, 2);
    assert_eq!(format!("{:.1}", summary.percentage(Sentiment::Neutral)), "60.0");
    Ok(())
}

#[test]
fn exported_csv_reparses_to_the_same_values() -> anyhow::Result<()> {
    let table = ReviewTable::from_csv_bytes(REVIEWS.as_bytes())?;
    let results = label_all(&table, "review", &KeywordScorer::default(), |_| {})?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sentiment_results.csv");
    results.write_csv(std::fs::File::create(&path)?)?;
    let reparsed = ReviewTable::from_csv_reader(std::fs::File::open(&path)?)?;

    assert_eq!(
        reparsed.headers(),
        ["order_id", "review", "stars", SENTIMENT_COLUMN, CONFIDENCE_COLUMN]
    );
    assert_eq!(reparsed.len(), results.len());
    for (row, labeled) in reparsed.rows().iter().zip(results.rows()) {
        assert_eq!(&row.cells()[..3], labeled.record.cells());
        assert_eq!(row.raw(3).unwrap().parse::<Sentiment>()?, labeled.sentiment());
        assert_eq!(row.raw(4).unwrap().parse::<f32>()?, labeled.confidence());
    }
    Ok(())
}

#[test]
fn empty_text_is_neutral_regardless_of_model() -> anyhow::Result<()> {
    let table = ReviewTable::from_csv_bytes(b"review\n\"\"\n")?;
    let scorer = KeywordScorer::default();
    let results = label_all(&table, "review", &scorer, |_| {})?;

    let row = &results.rows()[0];
    assert_eq!(row.sentiment(), Sentiment::Neutral);
    assert_eq!(row.confidence(), 0.5);
    assert!(scorer.seen.lock().unwrap().is_empty());
    Ok(())
}

#[test]
fn long_reviews_are_truncated_before_scoring() -> anyhow::Result<()> {
    let long = format!("{}great", "x".repeat(MAX_TEXT_CHARS));
    let scorer = KeywordScorer::default();

    let full = scorer.classify(Some(&long));
    let prefix: String = long.chars().take(MAX_TEXT_CHARS).collect();
    let truncated = scorer.classify(Some(&prefix));

    assert_eq!(full, truncated);
    assert_eq!(full.sentiment(), Sentiment::Neutral);
    assert!(scorer
        .seen
        .lock()
        .unwrap()
        .iter()
        .all(|t| t.chars().count() <= MAX_TEXT_CHARS));
    Ok(())
}

#[test]
fn scoring_failures_degrade_to_neutral() {
    let scorer = KeywordScorer::default();
    let result = scorer.classify(Some("great\u{0}"));
    assert_eq!(result.sentiment(), Sentiment::Neutral);
    assert_eq!(result.confidence(), FALLBACK_CONFIDENCE);
    assert!(matches!(
        result,
        Classification::Fallback(FallbackReason::ScoringFailed(_))
    ));
}

#[test]
fn unknown_column_is_an_error() {
    let table = ReviewTable::from_csv_bytes(REVIEWS.as_bytes()).unwrap();
    let err = label_all(&table, "comment", &KeywordScorer::default(), |_| {}).unwrap_err();
    assert!(err.is_user_error());
    assert_eq!(err.to_string(), "Column 'comment' not found in table");
}

#[test]
fn progress_reaches_one() -> anyhow::Result<()> {
    let table = ReviewTable::from_csv_bytes(REVIEWS.as_bytes())?;
    let mut last = Progress::default();
    let mut calls = 0;
    label_all(&table, "review", &KeywordScorer::default(), |p| {
        assert!(p.completed > last.completed);
        last = p;
        calls += 1;
    })?;
    assert_eq!(calls, 5);
    assert_eq!(last.fraction(), 1.0);
    Ok(())
}
