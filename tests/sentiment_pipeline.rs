// Integration tests for the sentiment pipeline against the real model.
// These download cardiffnlp/twitter-roberta-base-sentiment-latest from the
// Hugging Face Hub; run with `cargo test -- --ignored`.

use review_sentiment::pipelines::sentiment::*;
use review_sentiment::reviews::{label_all, ReviewTable};

#[tokio::test]
#[ignore = "downloads model weights"]
async fn classifies_obvious_reviews() -> anyhow::Result<()> {
    let pipeline = SentimentAnalysisPipelineBuilder::twitter_roberta()
        .cpu()
        .build()
        .await?;

    let table = ReviewTable::from_csv_bytes(
        b"review\nGreat product!\n\"Terrible, broke immediately\"\nIt's okay I guess\n",
    )?;
    let results = label_all(&table, "review", &pipeline, |_| {})?;

    assert_eq!(results.rows()[0].sentiment(), Sentiment::Positive);
    assert_eq!(results.rows()[1].sentiment(), Sentiment::Negative);
    assert!(Sentiment::ALL.contains(&results.rows()[2].sentiment()));
    for row in results.rows() {
        assert!(!row.classification.is_fallback());
        assert!((0.0..=1.0).contains(&row.confidence()));
    }
    Ok(())
}

#[tokio::test]
#[ignore = "downloads model weights"]
async fn predict_reports_all_classes() -> anyhow::Result<()> {
    let pipeline = SentimentAnalysisPipelineBuilder::twitter_roberta()
        .cpu()
        .build()
        .await?;

    let scores = pipeline.scores("I love Rust!")?;
    assert_eq!(scores.len(), 3);
    let total: f32 = scores.iter().map(|s| s.score).sum();
    assert!((total - 1.0).abs() < 1e-4);

    let result = pipeline.predict("I love Rust!")?;
    assert_eq!(result.sentiment(), Sentiment::Positive);

    let empty = pipeline.classify(Some("   "));
    assert_eq!(empty.sentiment(), Sentiment::Neutral);
    assert_eq!(empty.confidence(), FALLBACK_CONFIDENCE);
    Ok(())
}

#[tokio::test]
#[ignore = "downloads model weights"]
async fn building_twice_reuses_the_cached_model() -> anyhow::Result<()> {
    let first = SentimentAnalysisPipelineBuilder::twitter_roberta()
        .cpu()
        .build()
        .await?;
    let second = SentimentAnalysisPipelineBuilder::twitter_roberta()
        .cpu()
        .build()
        .await?;
    assert_eq!(
        first.predict("Terrible, broke immediately")?,
        second.predict("Terrible, broke immediately")?
    );
    Ok(())
}
