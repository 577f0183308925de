//! RoBERTa encoder with a sequence-classification head.
//!
//! This is the architecture behind most of the pretrained sentiment models on
//! the Hub, including the default `cardiffnlp/twitter-roberta-base-sentiment-latest`:
//! a post-LayerNorm BERT-style encoder whose `<s>` token representation is
//! fed through `dense -> tanh -> out_proj` to produce one logit per class.
//!
//! Weights are read from `model.safetensors` when the repository has one and
//! from `pytorch_model.bin` otherwise. Tensor names follow the Hugging Face
//! layout (`roberta.embeddings.*`, `roberta.encoder.layer.N.*`, `classifier.*`).

use std::collections::BTreeMap;
use std::collections::HashMap;

use candle_core::{DType, Device, IndexOp, Module, Tensor, D};
use candle_nn::{embedding, layer_norm, linear, ops::softmax_last_dim, Embedding, LayerNorm, Linear, VarBuilder};
use serde::Deserialize;
use tokenizers::Tokenizer;

use crate::core::{ModelOptions, Result, SentimentError};
use crate::loaders::{ClassifierFilesLoader, TokenizerLoader};
use crate::pipelines::sentiment::{LabelScore, SentimentAnalysisModel};

const MIN_VALUE_F64: f64 = f32::MIN as f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HiddenAct {
    #[default]
    Gelu,
    GeluNew,
    Relu,
}

impl HiddenAct {
    fn apply(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            HiddenAct::Gelu => xs.gelu_erf(),
            HiddenAct::GeluNew => xs.gelu(),
            HiddenAct::Relu => xs.relu(),
        }
    }
}

fn default_type_vocab_size() -> usize {
    1
}

fn default_layer_norm_eps() -> f64 {
    1e-5
}

fn default_pad_token_id() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    pub max_position_embeddings: usize,
    #[serde(default = "default_type_vocab_size")]
    pub type_vocab_size: usize,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
    #[serde(default = "default_pad_token_id")]
    pub pad_token_id: u32,
    #[serde(default)]
    pub hidden_act: HiddenAct,
    #[serde(default)]
    pub id2label: HashMap<String, String>,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)
            .map_err(|e| SentimentError::ModelConfig(format!("Failed to parse model config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.num_attention_heads == 0 || self.hidden_size % self.num_attention_heads != 0 {
            return Err(SentimentError::ModelConfig(format!(
                "hidden_size {} is not divisible by num_attention_heads {}",
                self.hidden_size, self.num_attention_heads
            )));
        }
        if self.id2label.is_empty() {
            return Err(SentimentError::ModelConfig(
                "config has no id2label mapping; not a classification checkpoint".into(),
            ));
        }
        if self.max_positions() == 0 {
            return Err(SentimentError::ModelConfig(format!(
                "max_position_embeddings {} leaves no room after the padding offset",
                self.max_position_embeddings
            )));
        }
        Ok(())
    }

    /// Labels ordered by class index.
    pub fn labels(&self) -> Result<Vec<String>> {
        let mut by_id = BTreeMap::new();
        for (id, label) in &self.id2label {
            let id: usize = id.parse().map_err(|_| {
                SentimentError::ModelConfig(format!("id2label key '{id}' is not an integer"))
            })?;
            by_id.insert(id, label.clone());
        }
        if by_id.keys().copied().ne(0..by_id.len()) {
            return Err(SentimentError::ModelConfig(
                "id2label ids are not contiguous from 0".into(),
            ));
        }
        Ok(by_id.into_values().collect())
    }

    /// Longest token sequence the position table can hold. RoBERTa positions
    /// start after the padding index.
    pub fn max_positions(&self) -> usize {
        self.max_position_embeddings
            .saturating_sub(self.pad_token_id as usize + 1)
    }
}

/// RoBERTa position ids: non-padding tokens are numbered from
/// `pad_token_id + 1`, padding tokens keep `pad_token_id`.
pub fn position_ids(input_ids: &[u32], pad_token_id: u32) -> Vec<u32> {
    let mut next = pad_token_id;
    input_ids
        .iter()
        .map(|&id| {
            if id == pad_token_id {
                pad_token_id
            } else {
                next += 1;
                next
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
struct Embeddings {
    word_embeddings: Embedding,
    position_embeddings: Embedding,
    token_type_embeddings: Embedding,
    layer_norm: LayerNorm,
}

impl Embeddings {
    fn load(vb: VarBuilder, config: &Config) -> candle_core::Result<Self> {
        Ok(Self {
            word_embeddings: embedding(config.vocab_size, config.hidden_size, vb.pp("word_embeddings"))?,
            position_embeddings: embedding(
                config.max_position_embeddings,
                config.hidden_size,
                vb.pp("position_embeddings"),
            )?,
            token_type_embeddings: embedding(
                config.type_vocab_size,
                config.hidden_size,
                vb.pp("token_type_embeddings"),
            )?,
            layer_norm: layer_norm(config.hidden_size, config.layer_norm_eps, vb.pp("LayerNorm"))?,
        })
    }

    fn forward(&self, input_ids: &Tensor, position_ids: &Tensor) -> candle_core::Result<Tensor> {
        let token_type_ids = input_ids.zeros_like()?;
        let embeddings = self.word_embeddings.forward(input_ids)?;
        let embeddings = (embeddings + self.position_embeddings.forward(position_ids)?)?;
        let embeddings = (embeddings + self.token_type_embeddings.forward(&token_type_ids)?)?;
        self.layer_norm.forward(&embeddings)
    }
}

#[derive(Debug, Clone)]
struct SelfAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    output: Linear,
    output_norm: LayerNorm,
    num_attention_heads: usize,
    attention_head_size: usize,
}

impl SelfAttention {
    fn load(vb: VarBuilder, config: &Config) -> candle_core::Result<Self> {
        let hidden = config.hidden_size;
        Ok(Self {
            query: linear(hidden, hidden, vb.pp("self.query"))?,
            key: linear(hidden, hidden, vb.pp("self.key"))?,
            value: linear(hidden, hidden, vb.pp("self.value"))?,
            output: linear(hidden, hidden, vb.pp("output.dense"))?,
            output_norm: layer_norm(hidden, config.layer_norm_eps, vb.pp("output.LayerNorm"))?,
            num_attention_heads: config.num_attention_heads,
            attention_head_size: hidden / config.num_attention_heads,
        })
    }

    fn split_heads(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let (batch, seq_len, _) = xs.dims3()?;
        xs.reshape((batch, seq_len, self.num_attention_heads, self.attention_head_size))?
            .transpose(1, 2)?
            .contiguous()
    }

    fn forward(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
        let (batch, seq_len, hidden_size) = hidden_states.dims3()?;

        let q = self.split_heads(&hidden_states.apply(&self.query)?)?;
        let k = self.split_heads(&hidden_states.apply(&self.key)?)?;
        let v = self.split_heads(&hidden_states.apply(&self.value)?)?;

        let scale = (self.attention_head_size as f64).powf(-0.5);
        let q = (q * scale)?;

        let scores = q.matmul(&k.transpose(D::Minus2, D::Minus1)?.contiguous()?)?;
        let scores = scores.broadcast_add(attention_mask)?;
        let probs = softmax_last_dim(&scores)?;

        let context = probs
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((batch, seq_len, hidden_size))?;

        let projected = context.apply(&self.output)?;
        (projected + hidden_states)?.apply(&self.output_norm)
    }
}

#[derive(Debug, Clone)]
struct EncoderLayer {
    attention: SelfAttention,
    intermediate: Linear,
    output: Linear,
    output_norm: LayerNorm,
    hidden_act: HiddenAct,
}

impl EncoderLayer {
    fn load(vb: VarBuilder, config: &Config) -> candle_core::Result<Self> {
        Ok(Self {
            attention: SelfAttention::load(vb.pp("attention"), config)?,
            intermediate: linear(
                config.hidden_size,
                config.intermediate_size,
                vb.pp("intermediate.dense"),
            )?,
            output: linear(config.intermediate_size, config.hidden_size, vb.pp("output.dense"))?,
            output_norm: layer_norm(config.hidden_size, config.layer_norm_eps, vb.pp("output.LayerNorm"))?,
            hidden_act: config.hidden_act,
        })
    }

    fn forward(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
        let attended = self.attention.forward(hidden_states, attention_mask)?;
        let intermediate = self.hidden_act.apply(&attended.apply(&self.intermediate)?)?;
        let output = intermediate.apply(&self.output)?;
        (output + attended)?.apply(&self.output_norm)
    }
}

/// `dense -> tanh -> out_proj` over the first (`<s>`) token.
#[derive(Debug, Clone)]
struct ClassificationHead {
    dense: Linear,
    out_proj: Linear,
}

impl ClassificationHead {
    fn load(vb: VarBuilder, config: &Config, num_labels: usize) -> candle_core::Result<Self> {
        Ok(Self {
            dense: linear(config.hidden_size, config.hidden_size, vb.pp("dense"))?,
            out_proj: linear(config.hidden_size, num_labels, vb.pp("out_proj"))?,
        })
    }

    fn forward(&self, hidden_states: &Tensor) -> candle_core::Result<Tensor> {
        hidden_states
            .i((.., 0, ..))?
            .apply(&self.dense)?
            .tanh()?
            .apply(&self.out_proj)
    }
}

#[derive(Debug, Clone)]
pub struct RobertaForSequenceClassification {
    embeddings: Embeddings,
    layers: Vec<EncoderLayer>,
    classifier: ClassificationHead,
}

impl RobertaForSequenceClassification {
    pub fn load(vb: VarBuilder, config: &Config, num_labels: usize) -> candle_core::Result<Self> {
        let encoder_vb = vb.pp("roberta");
        let embeddings = Embeddings::load(encoder_vb.pp("embeddings"), config)?;
        let layers = (0..config.num_hidden_layers)
            .map(|i| EncoderLayer::load(encoder_vb.pp(format!("encoder.layer.{i}")), config))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let classifier = ClassificationHead::load(vb.pp("classifier"), config, num_labels)?;

        Ok(Self {
            embeddings,
            layers,
            classifier,
        })
    }

    /// Returns logits of shape `(batch, num_labels)`.
    ///
    /// `attention_mask` holds 1 for real tokens and 0 for padding.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        position_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> candle_core::Result<Tensor> {
        let (batch, seq_len) = attention_mask.dims2()?;
        let additive_mask = attention_mask
            .to_dtype(DType::F32)?
            .affine(-1.0, 1.0)?
            .affine(MIN_VALUE_F64, 0.0)?
            .reshape((batch, 1, 1, seq_len))?;

        let mut hidden_states = self.embeddings.forward(input_ids, position_ids)?;
        for layer in &self.layers {
            hidden_states = layer.forward(&hidden_states, &additive_mask)?;
        }
        self.classifier.forward(&hidden_states)
    }
}

/// Options for [`RobertaSentimentModel`]: which Hub repository to load.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RobertaSentimentOptions {
    pub repo_id: String,
}

impl RobertaSentimentOptions {
    pub fn new(repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
        }
    }
}

impl Default for RobertaSentimentOptions {
    fn default() -> Self {
        Self::new(crate::core::config::DEFAULT_MODEL_REPO)
    }
}

impl ModelOptions for RobertaSentimentOptions {
    fn cache_key(&self) -> String {
        format!("roberta-sentiment-{}", self.repo_id)
    }
}

/// Sentiment classifier backed by a RoBERTa checkpoint.
#[derive(Clone)]
pub struct RobertaSentimentModel {
    model: RobertaForSequenceClassification,
    labels: Vec<String>,
    pad_token_id: u32,
    max_positions: usize,
    device: Device,
}

impl RobertaSentimentModel {
    pub async fn load(options: RobertaSentimentOptions, device: Device) -> Result<Self> {
        let files = ClassifierFilesLoader::new(&options.repo_id).load().await?;
        let config_content = std::fs::read_to_string(&files.config).map_err(|e| {
            SentimentError::ModelConfig(format!(
                "Failed to read config file {}: {e}",
                files.config.display()
            ))
        })?;
        let config = Config::from_json(&config_content)?;
        let labels = config.labels()?;

        let vb = if files.weights.extension().is_some_and(|ext| ext == "safetensors") {
            // SAFETY: the file is a read-only Hub cache entry that is not modified while mapped.
            unsafe { VarBuilder::from_mmaped_safetensors(&[&files.weights], DType::F32, &device)? }
        } else if files.weights.extension().is_some_and(|ext| ext == "bin") {
            VarBuilder::from_pth(&files.weights, DType::F32, &device)?
        } else {
            return Err(SentimentError::ModelFormat(format!(
                "Unsupported weight file format: {}",
                files.weights.display()
            )));
        };

        let model = RobertaForSequenceClassification::load(vb, &config, labels.len())?;
        tracing::info!(
            repo = %options.repo_id,
            layers = config.num_hidden_layers,
            labels = ?labels,
            device = ?device.location(),
            "loaded RoBERTa sentiment model"
        );

        Ok(Self {
            model,
            labels,
            pad_token_id: config.pad_token_id,
            max_positions: config.max_positions(),
            device,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn max_positions(&self) -> usize {
        self.max_positions
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn class_scores(&self, tokenizer: &Tokenizer, text: &str) -> Result<Vec<LabelScore>> {
        let encoding = tokenizer.encode(text, true).map_err(|e| {
            SentimentError::Tokenization(format!(
                "Tokenization failed on '{}': {e}",
                text.chars().take(50).collect::<String>()
            ))
        })?;

        let ids = encoding.get_ids();
        if ids.is_empty() {
            return Err(SentimentError::Tokenization("text produced no tokens".into()));
        }
        if ids.len() > self.max_positions {
            return Err(SentimentError::Tokenization(format!(
                "{} tokens exceed the model limit of {}",
                ids.len(),
                self.max_positions
            )));
        }

        let positions = position_ids(ids, self.pad_token_id);
        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let position_ids = Tensor::new(positions.as_slice(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let logits = self.model.forward(&input_ids, &position_ids, &attention_mask)?;
        let probs = softmax_last_dim(&logits)?.squeeze(0)?.to_vec1::<f32>()?;

        if probs.len() != self.labels.len() {
            return Err(SentimentError::UnexpectedOutput(format!(
                "model returned {} scores for {} labels",
                probs.len(),
                self.labels.len()
            )));
        }

        Ok(self
            .labels
            .iter()
            .zip(probs)
            .map(|(label, score)| LabelScore::new(label.clone(), score))
            .collect())
    }
}

impl SentimentAnalysisModel for RobertaSentimentModel {
    type Options = RobertaSentimentOptions;

    async fn new(options: Self::Options, device: Device) -> Result<Self> {
        RobertaSentimentModel::load(options, device).await
    }

    fn class_scores(&self, tokenizer: &Tokenizer, text: &str) -> Result<Vec<LabelScore>> {
        self.class_scores(tokenizer, text)
    }

    async fn get_tokenizer(options: Self::Options) -> Result<Tokenizer> {
        let files = ClassifierFilesLoader::new(&options.repo_id).load().await?;
        let config = Config::from_json(&std::fs::read_to_string(&files.config)?)?;
        TokenizerLoader::new(&options.repo_id, config.max_positions())
            .load()
            .await
    }

    fn device(&self) -> &Device {
        &self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_nn::VarMap;

    const TINY_CONFIG: &str = r#"{
        "vocab_size": 16,
        "hidden_size": 8,
        "num_hidden_layers": 2,
        "num_attention_heads": 2,
        "intermediate_size": 16,
        "max_position_embeddings": 12,
        "type_vocab_size": 1,
        "layer_norm_eps": 1e-5,
        "pad_token_id": 1,
        "hidden_act": "gelu",
        "id2label": {"0": "negative", "1": "neutral", "2": "positive"}
    }"#;

    #[test]
    fn parses_config_and_orders_labels() {
        let config = Config::from_json(TINY_CONFIG).unwrap();
        assert_eq!(config.labels().unwrap(), vec!["negative", "neutral", "positive"]);
        assert_eq!(config.max_positions(), 10);
        assert_eq!(config.hidden_act, HiddenAct::Gelu);
    }

    #[test]
    fn rejects_config_without_labels() {
        let json = TINY_CONFIG.replace(
            r#""id2label": {"0": "negative", "1": "neutral", "2": "positive"}"#,
            r#""id2label": {}"#,
        );
        assert!(matches!(
            Config::from_json(&json),
            Err(SentimentError::ModelConfig(_))
        ));
    }

    #[test]
    fn rejects_gapped_label_ids() {
        let json = TINY_CONFIG.replace(r#""2": "positive""#, r#""5": "positive""#);
        let config = Config::from_json(&json).unwrap();
        assert!(config.labels().is_err());
    }

    #[test]
    fn position_ids_skip_padding() {
        assert_eq!(position_ids(&[0, 7, 9, 2], 1), vec![2, 3, 4, 5]);
        assert_eq!(position_ids(&[0, 7, 2, 1, 1], 1), vec![2, 3, 4, 1, 1]);
    }

    #[test]
    fn forward_produces_one_logit_per_label() -> anyhow::Result<()> {
        let config = Config::from_json(TINY_CONFIG)?;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let model = RobertaForSequenceClassification::load(vb, &config, 3)?;

        let ids = [0u32, 5, 6, 7, 2];
        let positions = position_ids(&ids, config.pad_token_id);
        let input_ids = Tensor::new(&ids, &Device::Cpu)?.unsqueeze(0)?;
        let position_ids = Tensor::new(positions.as_slice(), &Device::Cpu)?.unsqueeze(0)?;
        let mask = Tensor::new(&[1u32; 5], &Device::Cpu)?.unsqueeze(0)?;

        let logits = model.forward(&input_ids, &position_ids, &mask)?;
        assert_eq!(logits.dims(), &[1, 3]);

        let probs = softmax_last_dim(&logits)?.squeeze(0)?.to_vec1::<f32>()?;
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        Ok(())
    }
}
