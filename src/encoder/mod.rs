//! RoBERTa sentence encoder.
//!
//! Loads a local RoBERTa checkpoint (config.json, tokenizer.json,
//! model.safetensors) and produces one CLS-token embedding per input text.
//! Batches are chunked so arbitrarily large inputs never build one giant
//! tensor.

pub mod config;
pub mod device;
mod forward;
pub mod weights;

use std::path::Path;

use tokenizers::Tokenizer;

pub use config::EncoderConfig;
pub use device::init_device;
pub use weights::RobertaWeights;

use crate::error::{EncoderError, EncoderResult};

/// RoBERTa encoder with loaded weights and tokenizer.
pub struct RobertaEncoder {
    weights: RobertaWeights,
    tokenizer: Tokenizer,
    max_tokens: usize,
    max_batch_size: usize,
}

impl RobertaEncoder {
    /// Load the encoder from a model directory containing config.json,
    /// tokenizer.json and model.safetensors.
    pub fn load(model_dir: &Path, max_tokens: usize, max_batch_size: usize) -> EncoderResult<Self> {
        if !model_dir.is_dir() {
            return Err(EncoderError::ModelDirectoryNotFound {
                path: model_dir.to_path_buf(),
            });
        }

        let config = EncoderConfig::load(model_dir)?;

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(|e| EncoderError::TokenizerLoadError {
                path: tokenizer_path,
                message: e.to_string(),
            })?;

        let device = device::init_device();
        let weights = RobertaWeights::load(model_dir, config, device)?;

        tracing::info!(
            model_dir = %model_dir.display(),
            params = weights.param_count(),
            max_tokens,
            max_batch_size,
            "RoBERTa encoder ready"
        );

        Ok(Self {
            weights,
            tokenizer,
            max_tokens,
            max_batch_size,
        })
    }

    /// Embedding dimensionality (hidden_size of the loaded model).
    pub fn hidden_size(&self) -> usize {
        self.weights.config.hidden_size
    }

    /// Encode texts into CLS-token embeddings, one `Vec<f32>` per input.
    ///
    /// Inputs are processed in chunks of at most `max_batch_size`; the
    /// output order matches the input order.
    pub fn encode(&self, texts: &[&str]) -> EncoderResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(EncoderError::EmptyInput);
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.max_batch_size) {
            let chunk_embeddings =
                forward::forward_batch(chunk, &self.weights, &self.tokenizer, self.max_tokens)?;
            embeddings.extend(chunk_embeddings);
        }

        tracing::debug!(
            texts = texts.len(),
            dim = self.hidden_size(),
            "Encoded text batch"
        );

        Ok(embeddings)
    }
}
