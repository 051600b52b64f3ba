//! Weight structures and safetensors loading for the RoBERTa encoder.
//!
//! Tensor storage for the architecture components:
//! - Embeddings (word, position, token_type, LayerNorm)
//! - Self-attention (Q, K, V projections and output)
//! - Feed-forward networks (intermediate and output projections)
//!
//! Checkpoints exported from different toolchains prefix tensor names
//! differently (`roberta.embeddings...` vs bare `embeddings...`); loading
//! probes for the prefixed form first and falls back to the bare names.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;

use super::config::EncoderConfig;
use crate::error::{EncoderError, EncoderResult};

/// Embedding weights (word, position, token_type, LayerNorm).
#[derive(Debug)]
pub struct EmbeddingWeights {
    /// Word embeddings: [vocab_size, hidden_size]
    pub word_embeddings: Tensor,
    /// Position embeddings: [max_position, hidden_size]
    pub position_embeddings: Tensor,
    /// Token type embeddings: [type_vocab_size, hidden_size]
    pub token_type_embeddings: Tensor,
    /// LayerNorm weight: [hidden_size]
    pub layer_norm_weight: Tensor,
    /// LayerNorm bias: [hidden_size]
    pub layer_norm_bias: Tensor,
}

/// Self-attention weights for a single layer.
#[derive(Debug)]
pub struct AttentionWeights {
    /// Query projection: [hidden_size, hidden_size]
    pub query_weight: Tensor,
    /// Query bias: [hidden_size]
    pub query_bias: Tensor,
    /// Key projection: [hidden_size, hidden_size]
    pub key_weight: Tensor,
    /// Key bias: [hidden_size]
    pub key_bias: Tensor,
    /// Value projection: [hidden_size, hidden_size]
    pub value_weight: Tensor,
    /// Value bias: [hidden_size]
    pub value_bias: Tensor,
    /// Output projection: [hidden_size, hidden_size]
    pub output_weight: Tensor,
    /// Output bias: [hidden_size]
    pub output_bias: Tensor,
    /// Attention output LayerNorm weight: [hidden_size]
    pub layer_norm_weight: Tensor,
    /// Attention output LayerNorm bias: [hidden_size]
    pub layer_norm_bias: Tensor,
}

/// Feed-forward network weights for a single layer.
#[derive(Debug)]
pub struct FfnWeights {
    /// Intermediate (up) projection: [intermediate_size, hidden_size]
    pub intermediate_weight: Tensor,
    /// Intermediate bias: [intermediate_size]
    pub intermediate_bias: Tensor,
    /// Output (down) projection: [hidden_size, intermediate_size]
    pub output_weight: Tensor,
    /// Output bias: [hidden_size]
    pub output_bias: Tensor,
    /// Output LayerNorm weight: [hidden_size]
    pub layer_norm_weight: Tensor,
    /// Output LayerNorm bias: [hidden_size]
    pub layer_norm_bias: Tensor,
}

/// Complete weights for a single encoder layer.
#[derive(Debug)]
pub struct EncoderLayerWeights {
    /// Self-attention weights.
    pub attention: AttentionWeights,
    /// Feed-forward network weights.
    pub ffn: FfnWeights,
}

/// Complete RoBERTa encoder weights loaded from safetensors.
#[derive(Debug)]
pub struct RobertaWeights {
    /// Model configuration.
    pub config: EncoderConfig,
    /// Embedding layer weights.
    pub embeddings: EmbeddingWeights,
    /// Encoder layer weights (one per layer).
    pub encoder_layers: Vec<EncoderLayerWeights>,
    /// Device the weights are loaded on.
    pub(crate) device: &'static Device,
}

impl RobertaWeights {
    /// Load all weights from `model.safetensors` in the model directory.
    pub fn load(
        model_dir: &Path,
        config: EncoderConfig,
        device: &'static Device,
    ) -> EncoderResult<Self> {
        let safetensors_path = model_dir.join("model.safetensors");
        if !safetensors_path.exists() {
            return Err(EncoderError::SafetensorsNotFound {
                path: safetensors_path,
            });
        }

        // Memory-mapped load; the file must outlive the builder, which the
        // VarBuilder guarantees by owning the mapping.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[safetensors_path.clone()], DType::F32, device)
                .map_err(|e| EncoderError::SafetensorsLoadError {
                    path: safetensors_path,
                    message: e.to_string(),
                })?
        };

        let prefix = if vb.contains_tensor("roberta.embeddings.word_embeddings.weight") {
            "roberta."
        } else {
            ""
        };
        let model_path = model_dir.display().to_string();

        let embeddings = load_embeddings(&vb, &config, &model_path, prefix)?;
        let mut encoder_layers = Vec::with_capacity(config.num_hidden_layers);
        for layer_idx in 0..config.num_hidden_layers {
            encoder_layers.push(load_encoder_layer(
                &vb,
                &config,
                &model_path,
                prefix,
                layer_idx,
            )?);
        }

        tracing::info!(
            layers = encoder_layers.len(),
            hidden_size = config.hidden_size,
            prefix = prefix,
            "Encoder weights loaded"
        );

        Ok(Self {
            config,
            embeddings,
            encoder_layers,
            device,
        })
    }

    /// Get the device these weights are loaded on.
    pub fn device(&self) -> &'static Device {
        self.device
    }

    /// Get total parameter count.
    pub fn param_count(&self) -> usize {
        let embedding_params = self.embeddings.word_embeddings.elem_count()
            + self.embeddings.position_embeddings.elem_count()
            + self.embeddings.token_type_embeddings.elem_count()
            + self.embeddings.layer_norm_weight.elem_count()
            + self.embeddings.layer_norm_bias.elem_count();

        let layer_params: usize = self
            .encoder_layers
            .iter()
            .map(|layer| {
                layer.attention.query_weight.elem_count()
                    + layer.attention.query_bias.elem_count()
                    + layer.attention.key_weight.elem_count()
                    + layer.attention.key_bias.elem_count()
                    + layer.attention.value_weight.elem_count()
                    + layer.attention.value_bias.elem_count()
                    + layer.attention.output_weight.elem_count()
                    + layer.attention.output_bias.elem_count()
                    + layer.attention.layer_norm_weight.elem_count()
                    + layer.attention.layer_norm_bias.elem_count()
                    + layer.ffn.intermediate_weight.elem_count()
                    + layer.ffn.intermediate_bias.elem_count()
                    + layer.ffn.output_weight.elem_count()
                    + layer.ffn.output_bias.elem_count()
                    + layer.ffn.layer_norm_weight.elem_count()
                    + layer.ffn.layer_norm_bias.elem_count()
            })
            .sum();

        embedding_params + layer_params
    }
}

/// Get a tensor from VarBuilder with shape validation.
fn get_tensor(
    vb: &VarBuilder,
    name: &str,
    expected_shape: &[usize],
    model_path: &str,
) -> EncoderResult<Tensor> {
    let tensor = vb.get(expected_shape, name).map_err(|e| {
        let err_str = e.to_string();
        if err_str.contains("shape") || err_str.contains("Shape") {
            EncoderError::ShapeMismatch {
                weight_name: name.to_string(),
                expected: expected_shape.to_vec(),
                actual: vec![],
            }
        } else {
            EncoderError::WeightNotFound {
                weight_name: name.to_string(),
                model_path: model_path.to_string(),
            }
        }
    })?;

    let actual_shape: Vec<usize> = tensor.dims().to_vec();
    if actual_shape != expected_shape {
        return Err(EncoderError::ShapeMismatch {
            weight_name: name.to_string(),
            expected: expected_shape.to_vec(),
            actual: actual_shape,
        });
    }

    Ok(tensor)
}

/// Load embedding layer weights with the detected name prefix.
fn load_embeddings(
    vb: &VarBuilder,
    config: &EncoderConfig,
    model_path: &str,
    model_prefix: &str,
) -> EncoderResult<EmbeddingWeights> {
    let prefix = format!("{}embeddings", model_prefix);

    let word_embeddings = get_tensor(
        vb,
        &format!("{}.word_embeddings.weight", prefix),
        &[config.vocab_size, config.hidden_size],
        model_path,
    )?;

    let position_embeddings = get_tensor(
        vb,
        &format!("{}.position_embeddings.weight", prefix),
        &[config.max_position_embeddings, config.hidden_size],
        model_path,
    )?;

    let token_type_embeddings = get_tensor(
        vb,
        &format!("{}.token_type_embeddings.weight", prefix),
        &[config.type_vocab_size, config.hidden_size],
        model_path,
    )?;

    let layer_norm_weight = get_tensor(
        vb,
        &format!("{}.LayerNorm.weight", prefix),
        &[config.hidden_size],
        model_path,
    )?;
    let layer_norm_bias = get_tensor(
        vb,
        &format!("{}.LayerNorm.bias", prefix),
        &[config.hidden_size],
        model_path,
    )?;

    Ok(EmbeddingWeights {
        word_embeddings,
        position_embeddings,
        token_type_embeddings,
        layer_norm_weight,
        layer_norm_bias,
    })
}

/// Load one encoder layer's attention and FFN weights.
fn load_encoder_layer(
    vb: &VarBuilder,
    config: &EncoderConfig,
    model_path: &str,
    model_prefix: &str,
    layer_idx: usize,
) -> EncoderResult<EncoderLayerWeights> {
    let h = config.hidden_size;
    let i = config.intermediate_size;
    let prefix = format!("{}encoder.layer.{}", model_prefix, layer_idx);

    let attention = AttentionWeights {
        query_weight: get_tensor(
            vb,
            &format!("{}.attention.self.query.weight", prefix),
            &[h, h],
            model_path,
        )?,
        query_bias: get_tensor(
            vb,
            &format!("{}.attention.self.query.bias", prefix),
            &[h],
            model_path,
        )?,
        key_weight: get_tensor(
            vb,
            &format!("{}.attention.self.key.weight", prefix),
            &[h, h],
            model_path,
        )?,
        key_bias: get_tensor(
            vb,
            &format!("{}.attention.self.key.bias", prefix),
            &[h],
            model_path,
        )?,
        value_weight: get_tensor(
            vb,
            &format!("{}.attention.self.value.weight", prefix),
            &[h, h],
            model_path,
        )?,
        value_bias: get_tensor(
            vb,
            &format!("{}.attention.self.value.bias", prefix),
            &[h],
            model_path,
        )?,
        output_weight: get_tensor(
            vb,
            &format!("{}.attention.output.dense.weight", prefix),
            &[h, h],
            model_path,
        )?,
        output_bias: get_tensor(
            vb,
            &format!("{}.attention.output.dense.bias", prefix),
            &[h],
            model_path,
        )?,
        layer_norm_weight: get_tensor(
            vb,
            &format!("{}.attention.output.LayerNorm.weight", prefix),
            &[h],
            model_path,
        )?,
        layer_norm_bias: get_tensor(
            vb,
            &format!("{}.attention.output.LayerNorm.bias", prefix),
            &[h],
            model_path,
        )?,
    };

    let ffn = FfnWeights {
        intermediate_weight: get_tensor(
            vb,
            &format!("{}.intermediate.dense.weight", prefix),
            &[i, h],
            model_path,
        )?,
        intermediate_bias: get_tensor(
            vb,
            &format!("{}.intermediate.dense.bias", prefix),
            &[i],
            model_path,
        )?,
        output_weight: get_tensor(
            vb,
            &format!("{}.output.dense.weight", prefix),
            &[h, i],
            model_path,
        )?,
        output_bias: get_tensor(
            vb,
            &format!("{}.output.dense.bias", prefix),
            &[h],
            model_path,
        )?,
        layer_norm_weight: get_tensor(
            vb,
            &format!("{}.output.LayerNorm.weight", prefix),
            &[h],
            model_path,
        )?,
        layer_norm_bias: get_tensor(
            vb,
            &format!("{}.output.LayerNorm.bias", prefix),
            &[h],
            model_path,
        )?,
    };

    Ok(EncoderLayerWeights { attention, ffn })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_safetensors_is_not_found() {
        let config: EncoderConfig = serde_json::from_str(
            r#"{
                "vocab_size": 50265,
                "hidden_size": 768,
                "num_hidden_layers": 12,
                "num_attention_heads": 12,
                "intermediate_size": 3072
            }"#,
        )
        .unwrap();
        let device = crate::encoder::device::init_device();
        let err = RobertaWeights::load(Path::new("/nonexistent/model"), config, device)
            .unwrap_err();
        assert!(matches!(err, EncoderError::SafetensorsNotFound { .. }));
        println!("[PASS] missing model.safetensors reported as SafetensorsNotFound");
    }
}
