//! Encoder model configuration parsed from config.json.
//!
//! Field names and defaults follow the HuggingFace RoBERTa/BERT config
//! schema; missing optional fields get the RoBERTa-base values.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{EncoderError, EncoderResult};

/// Transformer encoder configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EncoderConfig {
    /// Vocabulary size (50265 for RoBERTa-base).
    pub vocab_size: usize,
    /// Hidden layer size (768 for RoBERTa-base).
    pub hidden_size: usize,
    /// Number of encoder layers (12 for RoBERTa-base).
    pub num_hidden_layers: usize,
    /// Number of attention heads (12 for RoBERTa-base).
    pub num_attention_heads: usize,
    /// Intermediate FFN size (usually 4x hidden_size).
    pub intermediate_size: usize,
    /// Maximum position embeddings (514 for RoBERTa: 512 + offset 2).
    #[serde(default = "default_max_position")]
    pub max_position_embeddings: usize,
    /// Token type vocabulary size (1 for RoBERTa).
    #[serde(default = "default_type_vocab")]
    pub type_vocab_size: usize,
    /// Layer normalization epsilon.
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
    /// Padding token ID (1 for RoBERTa). Position IDs are offset by
    /// `pad_token_id + 1`, the RoBERTa convention.
    #[serde(default = "default_pad_token_id")]
    pub pad_token_id: usize,
    /// Model type string (roberta, bert, ...).
    #[serde(default = "default_model_type")]
    pub model_type: String,
}

fn default_max_position() -> usize {
    514
}

fn default_type_vocab() -> usize {
    1
}

fn default_layer_norm_eps() -> f64 {
    1e-5
}

fn default_pad_token_id() -> usize {
    1
}

fn default_model_type() -> String {
    "roberta".to_string()
}

impl EncoderConfig {
    /// Load and parse config.json from a model directory.
    pub fn load(model_dir: &Path) -> EncoderResult<Self> {
        let config_path = model_dir.join("config.json");
        let contents = fs::read_to_string(&config_path).map_err(|e| {
            EncoderError::ConfigNotFound {
                path: config_path.clone(),
                source: e,
            }
        })?;
        serde_json::from_str(&contents).map_err(|e| EncoderError::ConfigParseError {
            path: config_path,
            message: e.to_string(),
        })
    }

    /// Per-head dimension.
    pub fn head_dim(&self) -> usize {
        self.hidden_size / self.num_attention_heads
    }

    /// RoBERTa position offset: position IDs start at `pad_token_id + 1`.
    pub fn position_offset(&self) -> usize {
        self.pad_token_id + 1
    }
}
