//! Pipeline configuration.
//!
//! Every literal constant of the experiment lives here as a default, so the
//! binary runs with no arguments while tests can vary individual knobs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Number of structured feature columns: 24 user + 18 sensor + 12 interaction.
/// The grouping is documentation only; no computation distinguishes them.
pub const NUM_STRUCTURED_FEATURES: usize = 54;

/// Sentence used for every class-0 sample.
pub const CLASS_0_SENTENCE: &str = "The network is slow and I can't stream video.";

/// Sentence used for every class-1 sample.
pub const CLASS_1_SENTENCE: &str = "I prefer dark mode and battery saving features.";

/// Configuration for the full hybrid pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Total synthetic samples. Odd values silently drop one sample from the
    /// class-1 half (integer division, preserved from the original design).
    pub num_samples: usize,

    /// Random seed for dataset generation, splitting and SVM pair selection.
    pub seed: u64,

    /// Fraction of samples held out for testing.
    pub test_fraction: f64,

    /// Structured feature column count.
    pub num_features: usize,

    /// Maximum tokens per text; longer inputs are silently truncated.
    pub max_tokens: usize,

    /// Maximum texts per encoder forward pass; the corpus is chunked to this.
    pub max_batch_size: usize,

    /// SVM regularization strength.
    pub svm_c: f64,

    /// SVM RBF kernel coefficient.
    pub svm_gamma: f64,

    /// Directory containing config.json, tokenizer.json, model.safetensors.
    pub model_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_samples: 1000,
            seed: 42,
            test_fraction: 0.2,
            num_features: NUM_STRUCTURED_FEATURES,
            max_tokens: 128,
            max_batch_size: 32,
            svm_c: 10.0,
            svm_gamma: 0.1,
            model_dir: PathBuf::from("./models/roberta-base"),
        }
    }
}

impl PipelineConfig {
    /// Create config with a custom model directory.
    pub fn with_model_dir(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            ..Default::default()
        }
    }

    /// Set the sample count.
    pub fn with_num_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = num_samples;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the held-out test fraction.
    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    /// Validate the configuration.
    ///
    /// Sample-count parity is deliberately NOT validated: an odd
    /// `num_samples` drops one sample, matching the original behavior.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.num_samples < 2 {
            return Err(PipelineError::ConfigError {
                message: format!("num_samples must be >= 2, got {}", self.num_samples),
            });
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(PipelineError::ConfigError {
                message: format!(
                    "test_fraction must be in (0, 1), got {}",
                    self.test_fraction
                ),
            });
        }
        if self.num_features == 0 {
            return Err(PipelineError::ConfigError {
                message: "num_features cannot be zero".to_string(),
            });
        }
        if self.max_batch_size == 0 {
            return Err(PipelineError::ConfigError {
                message: "max_batch_size cannot be zero".to_string(),
            });
        }
        if self.svm_c <= 0.0 || self.svm_gamma <= 0.0 {
            return Err(PipelineError::ConfigError {
                message: format!(
                    "svm_c and svm_gamma must be positive, got C={} gamma={}",
                    self.svm_c, self.svm_gamma
                ),
            });
        }
        Ok(())
    }
}
