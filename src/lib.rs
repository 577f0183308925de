//! Label the sentiment of customer reviews in a CSV file with a pretrained
//! RoBERTa classifier running locally on Candle.
//!
//! - [`pipelines::sentiment`] loads the model and classifies single texts.
//! - [`reviews`] parses uploaded tables, labels every row and exports results.
//! - [`server`] is the browser front end served by the binary.

pub mod core;
mod loaders;
pub mod models;
pub mod pipelines;
pub mod reviews;
pub mod server;

pub use models::roberta::{RobertaSentimentModel, RobertaSentimentOptions};
