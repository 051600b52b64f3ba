//! Error types for the hybrid classification pipeline.
//!
//! Two layers, matching the two failure domains:
//! - [`EncoderError`]: model loading and tensor operations (all fatal)
//! - [`PipelineError`]: everything downstream of the encoder
//!
//! Errors propagate; nothing is retried. The degenerate cases the pipeline
//! deliberately tolerates (odd sample counts, zero-confidence fusion
//! weights) are handled in place and never surface here.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from encoder model loading and inference.
#[derive(Debug, Error)]
pub enum EncoderError {
    /// Model directory does not exist or is not accessible.
    #[error("Model directory not found: {path}")]
    ModelDirectoryNotFound { path: PathBuf },

    /// config.json file missing or unreadable.
    #[error("Config file not found at {path}: {source}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// config.json parsing failed.
    #[error("Config parse error for {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// tokenizer.json loading failed.
    #[error("Tokenizer load failed at {path}: {message}")]
    TokenizerLoadError { path: PathBuf, message: String },

    /// model.safetensors file missing.
    #[error("Safetensors file not found at {path}")]
    SafetensorsNotFound { path: PathBuf },

    /// Safetensors file loading failed.
    #[error("Failed to load safetensors from {path}: {message}")]
    SafetensorsLoadError { path: PathBuf, message: String },

    /// Specific weight tensor not found in safetensors.
    #[error("Weight not found: {weight_name} in {model_path}")]
    WeightNotFound {
        weight_name: String,
        model_path: String,
    },

    /// Weight tensor has unexpected shape.
    #[error("Shape mismatch for {weight_name}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        weight_name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Tokenization failed (encoding error, malformed input).
    #[error("Tokenization error: {message}")]
    TokenizationError { message: String },

    /// Candle tensor operation failed during the forward pass.
    #[error("Tensor operation failed for {operation}: {message}")]
    TensorError { operation: String, message: String },

    /// Empty text batch provided.
    #[error("Empty input not allowed")]
    EmptyInput,
}

impl From<candle_core::Error> for EncoderError {
    fn from(err: candle_core::Error) -> Self {
        EncoderError::TensorError {
            operation: "candle".to_string(),
            message: err.to_string(),
        }
    }
}

/// Top-level error type for the pipeline binary and library surface.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Encoder loading or inference failed.
    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),

    /// Configuration validation failed.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Feature matrix width does not match the expected column count.
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// SVM training failed to produce a usable model.
    #[error("SVM training error: {message}")]
    TrainingError { message: String },

    /// Row-aligned inputs disagree on sample count.
    #[error("Sample count mismatch: {left} vs {right}")]
    SampleCountMismatch { left: usize, right: usize },

    /// Empty dataset or partition where samples are required.
    #[error("Empty input not allowed")]
    EmptyInput,
}

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type alias for encoder operations.
pub type EncoderResult<T> = Result<T, EncoderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_display() {
        let err = EncoderError::ShapeMismatch {
            weight_name: "embeddings.word_embeddings.weight".to_string(),
            expected: vec![50265, 768],
            actual: vec![50265, 1024],
        };
        let msg = format!("{}", err);
        assert!(msg.contains("50265"));
        assert!(msg.contains("768"));
        assert!(msg.contains("1024"));
    }

    #[test]
    fn test_candle_error_conversion() {
        let err = candle_core::Error::Msg("device mismatch".to_string());
        let enc_err: EncoderError = err.into();
        match enc_err {
            EncoderError::TensorError { operation, message } => {
                assert_eq!(operation, "candle");
                assert!(message.contains("device mismatch"));
            }
            _ => panic!("Expected TensorError"),
        }
    }

    #[test]
    fn test_pipeline_error_wraps_encoder() {
        let err: PipelineError = EncoderError::EmptyInput.into();
        assert!(format!("{}", err).contains("Empty input"));
    }
}
