//! Label a CSV of reviews from the command line.
//!
//! ```text
//! cargo run --release --example label_csv -- reviews.csv review sentiment_results.csv
//! ```

use anyhow::{bail, Context, Result};
use review_sentiment::core::init_tracing;
use review_sentiment::pipelines::sentiment::*;
use review_sentiment::reviews::{label_all, ReviewTable, SentimentSummary};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("warn");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (input, column, output) = match args.as_slice() {
        [input, column] => (input, column.as_str(), "sentiment_results.csv"),
        [input, column, output] => (input, column.as_str(), output.as_str()),
        _ => bail!("usage: label_csv <input.csv> <text column> [output.csv]"),
    };

    let file = std::fs::File::open(input).with_context(|| format!("cannot open {input}"))?;
    let table = ReviewTable::from_csv_reader(file)?;
    println!("Loaded {} reviews", table.len());

    println!("Building pipeline...");
    let pipeline = SentimentAnalysisPipelineBuilder::twitter_roberta().build().await?;
    println!("Pipeline built on {:?}.", pipeline.device());

    let results = label_all(&table, column, &pipeline, |p| {
        if p.completed % 50 == 0 || p.completed == p.total {
            println!("  {}/{} ({:.0}%)", p.completed, p.total, p.fraction() * 100.0);
        }
    })?;

    let summary = SentimentSummary::from_results(&results);
    println!("\n=== Sentiment Summary ===");
    println!("Total Reviews: {}", summary.total);
    for sentiment in Sentiment::ALL {
        println!(
            "{sentiment:>8}: {} ({:.1}%)",
            summary.count(sentiment),
            summary.percentage(sentiment)
        );
    }
    if summary.fallbacks > 0 {
        println!("{} rows fell back to neutral (no text or scoring failed)", summary.fallbacks);
    }

    let file = std::fs::File::create(output).with_context(|| format!("cannot create {output}"))?;
    results.write_csv(file)?;
    println!("\nWrote {output}");

    Ok(())
}
