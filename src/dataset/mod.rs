//! Synthetic dataset generation, normalization and splitting.
//!
//! Each sample is one composite record ([`Sample`]): text, structured
//! features and label travel together, so the per-sample arrays the pipeline
//! derives from them (embeddings, normalized features) can only fall out of
//! alignment by losing the single shared permutation, which the splitter
//! never does.

mod generator;
mod normalizer;
mod split;

pub use generator::{Sample, SyntheticDataset};
pub use normalizer::MinMaxScaler;
pub use split::{select_embedding_rows, select_rows, train_test_split, SplitIndices};
