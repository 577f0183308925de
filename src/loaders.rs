//! Model and tokenizer loading utilities for Hugging Face Hub integration.
//!
//! - [`HfLoader`] - fetches a single file from a repository, with retries
//! - [`TokenizerLoader`] - loads `tokenizer.json`, or assembles a byte-level
//!   BPE tokenizer from `vocab.json` + `merges.txt` for repositories that only
//!   ship the slow-tokenizer files
//! - [`ClassifierFilesLoader`] - fetches `config.json` and the weight file of
//!   a sequence-classification checkpoint
//!
//! Downloads are cached by `hf-hub` under the usual Hugging Face cache
//! directory, so only the first run touches the network.

use std::path::PathBuf;

use hf_hub::api::tokio::{ApiBuilder, ApiError};
use tokenizers::models::bpe::BPE;
use tokenizers::pre_tokenizers::byte_level::ByteLevel;
use tokenizers::processors::roberta::RobertaProcessing;
use tokenizers::{Tokenizer, TruncationParams};

use crate::core::{Result, SentimentError};

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct HfLoader {
    pub repo: String,
    pub filename: String,
}

impl HfLoader {
    pub fn new(repo: &str, filename: &str) -> Self {
        Self {
            repo: repo.into(),
            filename: filename.into(),
        }
    }

    pub async fn load(&self) -> Result<PathBuf> {
        let hf_api = ApiBuilder::new().with_progress(false).build()?;
        let hf_repo = hf_api.model(self.repo.clone());

        let mut attempt = 0;
        loop {
            match hf_repo.get(self.filename.as_str()).await {
                Ok(path) => return Ok(path),
                Err(e) if is_lock_contention(&e) && attempt + 1 < MAX_RETRIES => {
                    let wait_time = std::time::Duration::from_millis(100 * (1 << attempt));
                    tracing::debug!(
                        repo = %self.repo,
                        file = %self.filename,
                        attempt,
                        "hub cache locked, retrying"
                    );
                    tokio::time::sleep(wait_time).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn is_lock_contention(error: &ApiError) -> bool {
    error.to_string().contains("Lock acquisition failed")
}

#[derive(Debug, Clone)]
pub struct TokenizerLoader {
    repo: String,
    max_length: usize,
}

impl TokenizerLoader {
    /// `max_length` is the longest token sequence the model accepts; longer
    /// encodings are truncated.
    pub fn new(repo: &str, max_length: usize) -> Self {
        Self {
            repo: repo.into(),
            max_length,
        }
    }

    pub async fn load(&self) -> Result<Tokenizer> {
        let mut tokenizer = match HfLoader::new(&self.repo, "tokenizer.json").load().await {
            Ok(path) => Tokenizer::from_file(&path).map_err(|e| {
                SentimentError::Tokenization(format!(
                    "Failed to load tokenizer from '{}': {e}",
                    path.display()
                ))
            })?,
            Err(_) => {
                tracing::debug!(repo = %self.repo, "no tokenizer.json, building BPE from vocab/merges");
                let vocab = HfLoader::new(&self.repo, "vocab.json").load().await?;
                let merges = HfLoader::new(&self.repo, "merges.txt").load().await?;
                byte_level_bpe(&vocab, &merges)?
            }
        };

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: self.max_length,
                ..Default::default()
            }))
            .map_err(|e| SentimentError::Tokenization(e.to_string()))?;
        tokenizer.with_padding(None);

        Ok(tokenizer)
    }
}

/// Build a RoBERTa-style tokenizer: byte-level BPE wrapped in `<s> ... </s>`.
pub fn byte_level_bpe(vocab: &std::path::Path, merges: &std::path::Path) -> Result<Tokenizer> {
    let bpe = BPE::from_file(&vocab.to_string_lossy(), &merges.to_string_lossy())
        .build()
        .map_err(|e| SentimentError::TokenizerNotFound(format!("invalid BPE files: {e}")))?;

    let mut tokenizer = Tokenizer::new(bpe);
    let special_id = |token: &str| {
        tokenizer.token_to_id(token).ok_or_else(|| {
            SentimentError::TokenizerNotFound(format!("vocabulary has no '{token}' token"))
        })
    };
    let cls = special_id("<s>")?;
    let sep = special_id("</s>")?;

    tokenizer
        .with_pre_tokenizer(Some(ByteLevel::new(false, true, true)))
        .with_decoder(Some(ByteLevel::default()))
        .with_post_processor(Some(
            RobertaProcessing::new(("</s>".to_string(), sep), ("<s>".to_string(), cls))
                .trim_offsets(true)
                .add_prefix_space(false),
        ));

    Ok(tokenizer)
}

/// Paths of a downloaded sequence-classification checkpoint.
#[derive(Debug, Clone)]
pub struct ClassifierFiles {
    pub config: PathBuf,
    pub weights: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ClassifierFilesLoader {
    repo: String,
}

impl ClassifierFilesLoader {
    pub fn new(repo: &str) -> Self {
        Self { repo: repo.into() }
    }

    pub async fn load(&self) -> Result<ClassifierFiles> {
        let config = HfLoader::new(&self.repo, "config.json")
            .load()
            .await
            .map_err(|e| SentimentError::ModelNotFound(format!("{}: {e}", self.repo)))?;

        let weights = match HfLoader::new(&self.repo, "model.safetensors").load().await {
            Ok(path) => path,
            Err(_) => HfLoader::new(&self.repo, "pytorch_model.bin")
                .load()
                .await
                .map_err(|e| {
                    SentimentError::ModelNotFound(format!(
                        "{}: expected `model.safetensors` or `pytorch_model.bin`: {e}",
                        self.repo
                    ))
                })?,
        };

        Ok(ClassifierFiles { config, weights })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn builds_roberta_style_tokenizer() {
        let dir = tempfile::tempdir().unwrap();
        // "Ġ" is the byte-level encoding of a leading space.
        let vocab = write_temp(
            &dir,
            "vocab.json",
            r#"{"<s>":0,"<pad>":1,"</s>":2,"<unk>":3,"g":4,"o":5,"d":6,"go":7,"goo":8,"good":9,"Ġ":10}"#,
        );
        let merges = write_temp(&dir, "merges.txt", "#version: 0.2\ng o\ngo o\ngoo d\n");

        let tokenizer = byte_level_bpe(&vocab, &merges).unwrap();
        let encoding = tokenizer.encode("good", true).unwrap();
        let ids = encoding.get_ids();

        // <s> good </s>
        assert_eq!(ids, &[0, 9, 2]);
    }

    #[test]
    fn missing_special_tokens_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = write_temp(&dir, "vocab.json", r#"{"a":0,"b":1,"ab":2}"#);
        let merges = write_temp(&dir, "merges.txt", "#version: 0.2\na b\n");

        assert!(matches!(
            byte_level_bpe(&vocab, &merges),
            Err(SentimentError::TokenizerNotFound(_))
        ));
    }
}
