use thiserror::Error;

#[derive(Error, Debug)]
pub enum SentimentError {
    // Model loading
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid model format: {0}")]
    ModelFormat(String),

    #[error("Model config error: {0}")]
    ModelConfig(String),

    // Tokenization
    #[error("Tokenizer not found: {0}")]
    TokenizerNotFound(String),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    // Inference
    #[error("Unexpected model output: {0}")]
    UnexpectedOutput(String),

    // Network/Download
    #[error("Download failed: {0}")]
    Download(String),

    // Device
    #[error("Device error: {0}")]
    Device(String),

    // Review tables
    #[error("No columns to parse from file")]
    EmptyTable,

    #[error("Malformed CSV at line {line}: {message}")]
    MalformedCsv { line: u64, message: String },

    #[error("Column '{0}' not found in table")]
    UnknownColumn(String),

    // Configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    // Pass-through from dependencies
    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Template(#[from] minijinja::Error),
}

impl SentimentError {
    /// True for errors caused by what the user supplied (a bad file, a wrong
    /// column) rather than by the model or the host.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            SentimentError::EmptyTable
                | SentimentError::MalformedCsv { .. }
                | SentimentError::UnknownColumn(_)
                | SentimentError::Csv(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SentimentError>;

impl From<hf_hub::api::tokio::ApiError> for SentimentError {
    fn from(value: hf_hub::api::tokio::ApiError) -> Self {
        SentimentError::Download(value.to_string())
    }
}
