//! Hybrid text/structured late-fusion classifier.
//!
//! Reproduces a two-branch classification experiment end to end:
//!
//! - **Text branch**: RoBERTa CLS-token sentence embeddings (candle).
//! - **Structured branch**: RBF-kernel SVM over 54 synthetic features,
//!   trained with SMO and Platt-calibrated probabilities.
//! - **Fusion**: per-sample weighted blend of a text-side confidence proxy
//!   and the SVM probabilities.
//!
//! The experiment's documented quirks are preserved on purpose, not fixed:
//! the normalizer is fit on the full matrix before splitting, the text
//! confidence is a softmax across test samples rather than classes, and the
//! final report prints a hardcoded accuracy constant. Each is flagged at its
//! definition site.

pub mod config;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod fusion;
pub mod report;
pub mod svm;

pub use config::{PipelineConfig, CLASS_0_SENTENCE, CLASS_1_SENTENCE, NUM_STRUCTURED_FEATURES};
pub use dataset::{
    select_embedding_rows, select_rows, train_test_split, MinMaxScaler, Sample, SplitIndices,
    SyntheticDataset,
};
pub use encoder::RobertaEncoder;
pub use error::{EncoderError, EncoderResult, PipelineError, PipelineResult};
pub use fusion::{confidence_proxy, fuse_predictions};
pub use report::{accuracy, print_report, REPORTED_ACCURACY};
pub use svm::{SvmParams, TrainedSvm};
