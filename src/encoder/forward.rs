//! Batched forward pass through the RoBERTa encoder.
//!
//! One forward pass per batch: tokenize, pad to the batch max length, run
//! embeddings + encoder layers, then take the CLS (first) token's hidden
//! state as the sentence embedding. No L2 normalization is applied; the
//! downstream confidence proxy consumes raw dot products.

use candle_core::{Tensor, D};
use tokenizers::Tokenizer;

use super::config::EncoderConfig;
use super::weights::{AttentionWeights, EncoderLayerWeights, FfnWeights, RobertaWeights};
use crate::error::{EncoderError, EncoderResult};

/// Map a candle error into [`EncoderError::TensorError`] tagged with the
/// failing operation.
fn op_err(operation: &'static str) -> impl FnOnce(candle_core::Error) -> EncoderError {
    move |e| EncoderError::TensorError {
        operation: operation.to_string(),
        message: e.to_string(),
    }
}

/// Run the batched forward pass for a slice of texts.
///
/// # Pipeline
///
/// 1. Tokenize all input texts to token IDs
/// 2. Truncate to `max_tokens` and pad all sequences to the batch max
/// 3. Create tensors: [batch_size, max_seq_len]
/// 4. Embedding lookup (word + position + token_type) with LayerNorm
/// 5. Run transformer encoder layers (batch parallel)
/// 6. CLS pooling: first token's hidden state per sequence
pub(crate) fn forward_batch(
    texts: &[&str],
    weights: &RobertaWeights,
    tokenizer: &Tokenizer,
    max_tokens: usize,
) -> EncoderResult<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let device = weights.device();
    let config = &weights.config;
    let batch_size = texts.len();

    // Step 1: tokenize all inputs
    let encodings: Vec<_> = texts
        .iter()
        .map(|text| {
            tokenizer
                .encode(*text, true)
                .map_err(|e| EncoderError::TokenizationError {
                    message: format!("batch tokenization failed: {}", e),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Step 2: truncate and find the batch max length. Position embeddings
    // hold max_position rows of which the first position_offset are
    // reserved, so sequences cap below that.
    let max_len = max_tokens.min(config.max_position_embeddings - config.position_offset());
    let actual_max_len = encodings
        .iter()
        .map(|e| e.get_ids().len().min(max_len))
        .max()
        .unwrap_or(1);

    // Step 3: padded batch buffers. Padding slots keep pad_token_id and
    // position 0; the attention mask zeroes them out of every score.
    let mut all_token_ids = vec![config.pad_token_id as u32; batch_size * actual_max_len];
    let mut all_attention_mask = vec![0.0f32; batch_size * actual_max_len];
    let mut all_position_ids = vec![0u32; batch_size * actual_max_len];
    let all_token_type_ids = vec![0u32; batch_size * actual_max_len]; // all zeros for RoBERTa

    let position_offset = config.position_offset() as u32;
    for (batch_idx, encoding) in encodings.iter().enumerate() {
        let token_ids = encoding.get_ids();
        let seq_len = token_ids.len().min(actual_max_len);
        let offset = batch_idx * actual_max_len;

        for (i, &tid) in token_ids[..seq_len].iter().enumerate() {
            all_token_ids[offset + i] = tid;
        }
        for i in 0..seq_len {
            all_attention_mask[offset + i] = 1.0;
            all_position_ids[offset + i] = (i as u32) + position_offset;
        }
    }

    let input_ids = Tensor::from_slice(&all_token_ids, (batch_size, actual_max_len), device)
        .map_err(op_err("input_ids tensor"))?;
    let attention_mask_tensor =
        Tensor::from_slice(&all_attention_mask, (batch_size, actual_max_len), device)
            .map_err(op_err("attention_mask tensor"))?;
    let position_tensor =
        Tensor::from_slice(&all_position_ids, (batch_size, actual_max_len), device)
            .map_err(op_err("position_ids tensor"))?;
    let token_type_tensor =
        Tensor::from_slice(&all_token_type_ids, (batch_size, actual_max_len), device)
            .map_err(op_err("token_type tensor"))?;

    // Step 4: embeddings + LayerNorm
    let embeddings = compute_embeddings_batch(
        &input_ids,
        &position_tensor,
        &token_type_tensor,
        weights,
        batch_size,
        actual_max_len,
    )?;
    let embeddings = layer_norm(
        &embeddings,
        &weights.embeddings.layer_norm_weight,
        &weights.embeddings.layer_norm_bias,
        config.layer_norm_eps,
    )?;

    // Step 5: encoder layers
    let extended_attention_mask = create_attention_mask_batch(&attention_mask_tensor)?;
    let mut hidden_states = embeddings;
    for layer in weights.encoder_layers.iter() {
        hidden_states =
            encoder_layer_forward(&hidden_states, layer, &extended_attention_mask, config)?;
    }

    // Step 6: CLS pooling
    let pooled = cls_pool_batch(&hidden_states)?;

    tensor_to_batch_vecs(&pooled, batch_size)
}

/// Compute embeddings for batch: word + position + token_type.
fn compute_embeddings_batch(
    input_ids: &Tensor,
    position_tensor: &Tensor,
    token_type_tensor: &Tensor,
    weights: &RobertaWeights,
    batch_size: usize,
    seq_len: usize,
) -> EncoderResult<Tensor> {
    let config = &weights.config;

    // Flatten for index_select: [batch * seq]
    let input_flat = input_ids.flatten_all().map_err(op_err("flatten input_ids"))?;
    let word_embeds = weights
        .embeddings
        .word_embeddings
        .index_select(&input_flat, 0)
        .map_err(op_err("word embedding lookup"))?
        .reshape((batch_size, seq_len, config.hidden_size))
        .map_err(op_err("word embedding reshape"))?;

    let position_flat = position_tensor
        .flatten_all()
        .map_err(op_err("flatten position_ids"))?;
    let position_embeds = weights
        .embeddings
        .position_embeddings
        .index_select(&position_flat, 0)
        .map_err(op_err("position embedding lookup"))?
        .reshape((batch_size, seq_len, config.hidden_size))
        .map_err(op_err("position embedding reshape"))?;

    let token_type_flat = token_type_tensor
        .flatten_all()
        .map_err(op_err("flatten token_type_ids"))?;
    let token_type_embeds = weights
        .embeddings
        .token_type_embeddings
        .index_select(&token_type_flat, 0)
        .map_err(op_err("token_type embedding lookup"))?
        .reshape((batch_size, seq_len, config.hidden_size))
        .map_err(op_err("token_type embedding reshape"))?;

    let combined = ((word_embeds + position_embeds).map_err(op_err("embedding add 1"))?
        + token_type_embeds)
        .map_err(op_err("embedding add 2"))?;

    Ok(combined)
}

/// Create extended attention mask for batch: [batch, 1, 1, seq_len].
///
/// Converts mask values 1.0 -> 0.0, 0.0 -> -10000.0 so masked positions
/// vanish after softmax.
fn create_attention_mask_batch(attention_mask_tensor: &Tensor) -> EncoderResult<Tensor> {
    let extended = attention_mask_tensor
        .unsqueeze(1)
        .map_err(op_err("attention mask unsqueeze 1"))?
        .unsqueeze(2)
        .map_err(op_err("attention mask unsqueeze 2"))?;

    let inverted = ((extended * (-1.0)).map_err(op_err("attention mask mul"))? + 1.0)
        .map_err(op_err("attention mask add"))?
        * (-10000.0f64);

    inverted.map_err(op_err("attention mask scale"))
}

/// Layer normalization over the last dimension.
fn layer_norm(input: &Tensor, weight: &Tensor, bias: &Tensor, eps: f64) -> EncoderResult<Tensor> {
    let mean = input
        .mean_keepdim(D::Minus1)
        .map_err(op_err("layer_norm mean"))?;
    let diff = input
        .broadcast_sub(&mean)
        .map_err(op_err("layer_norm sub"))?;
    let variance = diff
        .sqr()
        .map_err(op_err("layer_norm sqr"))?
        .mean_keepdim(D::Minus1)
        .map_err(op_err("layer_norm var_mean"))?;
    let std = (variance + eps)
        .map_err(op_err("layer_norm add_eps"))?
        .sqrt()
        .map_err(op_err("layer_norm sqrt"))?;
    let normalized = diff
        .broadcast_div(&std)
        .map_err(op_err("layer_norm div"))?;

    normalized
        .broadcast_mul(weight)
        .map_err(op_err("layer_norm scale"))?
        .broadcast_add(bias)
        .map_err(op_err("layer_norm bias"))
}

/// Run a single encoder layer forward pass.
fn encoder_layer_forward(
    hidden_states: &Tensor,
    layer: &EncoderLayerWeights,
    attention_mask: &Tensor,
    config: &EncoderConfig,
) -> EncoderResult<Tensor> {
    // Self-attention
    let attention_output =
        self_attention_forward(hidden_states, &layer.attention, attention_mask, config)?;

    // Add & norm (attention)
    let attention_output =
        (hidden_states + &attention_output).map_err(op_err("attention residual"))?;
    let attention_output = layer_norm(
        &attention_output,
        &layer.attention.layer_norm_weight,
        &layer.attention.layer_norm_bias,
        config.layer_norm_eps,
    )?;

    // FFN
    let ffn_output = ffn_forward(&attention_output, &layer.ffn, config)?;

    // Add & norm (FFN)
    let output = (attention_output + &ffn_output).map_err(op_err("ffn residual"))?;
    layer_norm(
        &output,
        &layer.ffn.layer_norm_weight,
        &layer.ffn.layer_norm_bias,
        config.layer_norm_eps,
    )
}

/// Multi-head self-attention forward pass.
fn self_attention_forward(
    hidden_states: &Tensor,
    attention: &AttentionWeights,
    attention_mask: &Tensor,
    config: &EncoderConfig,
) -> EncoderResult<Tensor> {
    let (batch, seq_len, hidden_size) =
        hidden_states.dims3().map_err(op_err("attention dims"))?;
    let head_dim = config.head_dim();

    // Flatten to [batch*seq, hidden] for matmul (candle doesn't broadcast 3D x 2D)
    let hidden_flat = hidden_states
        .reshape((batch * seq_len, hidden_size))
        .map_err(op_err("hidden flatten"))?;

    let project = |weight: &Tensor, bias: &Tensor, name: &'static str| -> EncoderResult<Tensor> {
        hidden_flat
            .matmul(&weight.t().map_err(op_err(name))?)
            .map_err(op_err(name))?
            .reshape((batch, seq_len, hidden_size))
            .map_err(op_err(name))?
            .broadcast_add(bias)
            .map_err(op_err(name))
    };

    let query = project(&attention.query_weight, &attention.query_bias, "query projection")?;
    let key = project(&attention.key_weight, &attention.key_bias, "key projection")?;
    let value = project(&attention.value_weight, &attention.value_bias, "value projection")?;

    // Reshape to [batch, heads, seq, head_dim]
    let split_heads = |t: Tensor, name: &'static str| -> EncoderResult<Tensor> {
        t.reshape((batch, seq_len, config.num_attention_heads, head_dim))
            .map_err(op_err(name))?
            .transpose(1, 2)
            .map_err(op_err(name))?
            .contiguous()
            .map_err(op_err(name))
    };

    let query = split_heads(query, "query head split")?;
    let key = split_heads(key, "key head split")?;
    let value = split_heads(value, "value head split")?;

    // Scaled dot-product scores
    let scale = 1.0 / (head_dim as f64).sqrt();
    let key_t = key
        .transpose(2, 3)
        .map_err(op_err("key transpose for scores"))?
        .contiguous()
        .map_err(op_err("key_t contiguous"))?;
    let scores = (query.matmul(&key_t).map_err(op_err("attention scores matmul"))? * scale)
        .map_err(op_err("attention scale"))?;

    let scores = scores
        .broadcast_add(attention_mask)
        .map_err(op_err("attention mask add"))?;

    let probs = candle_nn::ops::softmax(&scores, D::Minus1).map_err(op_err("attention softmax"))?;

    let context = probs.matmul(&value).map_err(op_err("attention context matmul"))?;

    // Reshape back to [batch, seq, hidden]
    let context = context
        .transpose(1, 2)
        .map_err(op_err("context transpose"))?
        .contiguous()
        .map_err(op_err("context contiguous"))?
        .reshape((batch, seq_len, config.hidden_size))
        .map_err(op_err("context reshape"))?;

    // Output projection (flatten to 2D for matmul)
    let context_flat = context
        .reshape((batch * seq_len, config.hidden_size))
        .map_err(op_err("context flatten"))?;

    context_flat
        .matmul(&attention.output_weight.t().map_err(op_err("output transpose"))?)
        .map_err(op_err("output matmul"))?
        .reshape((batch, seq_len, config.hidden_size))
        .map_err(op_err("output reshape"))?
        .broadcast_add(&attention.output_bias)
        .map_err(op_err("output bias"))
}

/// Feed-forward network forward pass.
fn ffn_forward(
    hidden_states: &Tensor,
    ffn: &FfnWeights,
    config: &EncoderConfig,
) -> EncoderResult<Tensor> {
    let (batch, seq_len, hidden_size) = hidden_states.dims3().map_err(op_err("ffn dims"))?;

    let hidden_flat = hidden_states
        .reshape((batch * seq_len, hidden_size))
        .map_err(op_err("ffn flatten"))?;

    let intermediate = hidden_flat
        .matmul(&ffn.intermediate_weight.t().map_err(op_err("ffn intermediate transpose"))?)
        .map_err(op_err("ffn intermediate matmul"))?
        .broadcast_add(&ffn.intermediate_bias)
        .map_err(op_err("ffn intermediate bias"))?;

    let activated = intermediate.gelu().map_err(op_err("ffn gelu"))?;

    activated
        .matmul(&ffn.output_weight.t().map_err(op_err("ffn output transpose"))?)
        .map_err(op_err("ffn output matmul"))?
        .reshape((batch, seq_len, config.hidden_size))
        .map_err(op_err("ffn output reshape"))?
        .broadcast_add(&ffn.output_bias)
        .map_err(op_err("ffn output bias"))
}

/// CLS pooling: first token's hidden state, [batch, seq, hidden] -> [batch, hidden].
fn cls_pool_batch(hidden_states: &Tensor) -> EncoderResult<Tensor> {
    hidden_states
        .narrow(1, 0, 1)
        .map_err(op_err("cls_pool narrow"))?
        .squeeze(1)
        .map_err(op_err("cls_pool squeeze"))
}

/// Convert batch tensor to Vec<Vec<f32>>.
fn tensor_to_batch_vecs(tensor: &Tensor, batch_size: usize) -> EncoderResult<Vec<Vec<f32>>> {
    let flat: Vec<f32> = tensor
        .flatten_all()
        .map_err(op_err("tensor_to_vec flatten"))?
        .to_vec1()
        .map_err(op_err("tensor_to_vec to_vec1"))?;

    let hidden_size = flat.len() / batch_size;
    let results: Vec<Vec<f32>> = flat.chunks(hidden_size).map(|c| c.to_vec()).collect();

    if results.len() != batch_size {
        return Err(EncoderError::TensorError {
            operation: "tensor_to_vec".to_string(),
            message: format!(
                "batch size mismatch: expected {}, got {}",
                batch_size,
                results.len()
            ),
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_layer_norm_normalizes_last_dim() {
        let device = Device::Cpu;
        let input = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], (1, 1, 4), &device).unwrap();
        let weight = Tensor::from_slice(&[1.0f32, 1.0, 1.0, 1.0], 4, &device).unwrap();
        let bias = Tensor::from_slice(&[0.0f32, 0.0, 0.0, 0.0], 4, &device).unwrap();

        let out = layer_norm(&input, &weight, &bias, 1e-5).unwrap();
        let values: Vec<f32> = out.flatten_all().unwrap().to_vec1().unwrap();

        let mean: f32 = values.iter().sum::<f32>() / values.len() as f32;
        assert!(mean.abs() < 1e-5, "mean should be ~0, got {}", mean);
        let var: f32 =
            values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / values.len() as f32;
        assert!((var - 1.0).abs() < 1e-3, "variance should be ~1, got {}", var);
        println!("[PASS] layer_norm output has zero mean, unit variance");
    }

    #[test]
    fn test_attention_mask_values() {
        let device = Device::Cpu;
        let mask = Tensor::from_slice(&[1.0f32, 1.0, 0.0], (1, 3), &device).unwrap();
        let extended = create_attention_mask_batch(&mask).unwrap();
        assert_eq!(extended.dims(), &[1, 1, 1, 3]);

        let values: Vec<f32> = extended.flatten_all().unwrap().to_vec1().unwrap();
        assert_eq!(values[0], 0.0);
        assert_eq!(values[1], 0.0);
        assert_eq!(values[2], -10000.0);
        println!("[PASS] mask maps 1->0 and 0->-10000");
    }

    #[test]
    fn test_cls_pool_takes_first_token() {
        let device = Device::Cpu;
        // 2 sequences, 3 tokens, hidden 2
        let data: Vec<f32> = vec![
            1.0, 2.0, 9.0, 9.0, 9.0, 9.0, // seq 0: CLS = [1, 2]
            3.0, 4.0, 9.0, 9.0, 9.0, 9.0, // seq 1: CLS = [3, 4]
        ];
        let hidden = Tensor::from_slice(&data, (2, 3, 2), &device).unwrap();
        let pooled = cls_pool_batch(&hidden).unwrap();
        assert_eq!(pooled.dims(), &[2, 2]);
        let values: Vec<f32> = pooled.flatten_all().unwrap().to_vec1().unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
        println!("[PASS] CLS pooling selects the first token per sequence");
    }

    #[test]
    fn test_tensor_to_batch_vecs_shapes() {
        let device = Device::Cpu;
        let tensor = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], (2, 3), &device).unwrap();
        let vecs = tensor_to_batch_vecs(&tensor, 2).unwrap();
        assert_eq!(vecs.len(), 2);
        assert_eq!(vecs[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(vecs[1], vec![4.0, 5.0, 6.0]);
    }
}
