//! Coupled train/test splitting.
//!
//! One seeded permutation drives every per-sample array. Embeddings,
//! structured features and labels are partitioned by the SAME index lists,
//! so a test row always traces back to the original synthetic sample.

use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row indices for the two partitions. Both lists index into the original
/// sample order; applying them to any row-aligned array keeps alignment.
#[derive(Debug, Clone)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    /// Total rows covered by the split.
    pub fn len(&self) -> usize {
        self.train.len() + self.test.len()
    }

    /// Whether the split covers no rows.
    pub fn is_empty(&self) -> bool {
        self.train.is_empty() && self.test.is_empty()
    }
}

/// Shuffle `0..n` with a seeded RNG and cut off the first
/// `ceil(n * test_fraction)` indices as the test partition.
///
/// The ceiling matches the reference splitter's fractional-size handling:
/// a fractional product rounds the test partition up, never down.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> SplitIndices {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_size = ((n as f64) * test_fraction).ceil() as usize;
    let test = indices[..test_size].to_vec();
    let train = indices[test_size..].to_vec();

    tracing::info!(
        train = train.len(),
        test = test.len(),
        seed,
        "Train/test split created"
    );

    SplitIndices { train, test }
}

/// Select rows of a dense matrix by index, preserving index order.
pub fn select_rows(matrix: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
    let cols = matrix.ncols();
    let flat: Vec<f64> = indices
        .iter()
        .flat_map(|&i| matrix.row(i).to_vec())
        .collect();
    Array2::from_shape_vec((indices.len(), cols), flat)
        .expect("selected rows have the source matrix width")
}

/// Select embedding rows by index, preserving index order.
pub fn select_embedding_rows(embeddings: &[Vec<f32>], indices: &[usize]) -> Vec<Vec<f32>> {
    indices.iter().map(|&i| embeddings[i].clone()).collect()
}
