//! RBF-kernel binary SVM over structured features.
//!
//! Trained with simplified SMO on a precomputed Gram matrix, calibrated with
//! Platt scaling so `predict_proba` returns per-class probabilities.
//!
//! - Decision function: `f(x) = Σ(coefᵢ·exp(-γ‖x-xᵢ‖²)) + b` where
//!   `coefᵢ = αᵢ·yᵢ` over the support vectors
//! - Probability: `P(y=1|f) = 1 / (1 + exp(A·f + B))` with (A, B) fitted on
//!   the training decision values

mod platt;
mod trainer;

pub use platt::PlattScale;

use ndarray::{Array2, ArrayView1};

use crate::error::{PipelineError, PipelineResult};

/// Training hyperparameters for the SMO solver.
#[derive(Debug, Clone)]
pub struct SvmParams {
    /// Regularization strength.
    pub c: f64,
    /// RBF kernel coefficient.
    pub gamma: f64,
    /// KKT violation tolerance.
    pub tol: f64,
    /// Passes without an alpha change before stopping.
    pub max_passes: usize,
    /// Hard cap on outer iterations.
    pub max_iter: usize,
    /// Seed for working-pair partner selection. Fixed seed, reproducible fit.
    pub seed: u64,
}

impl SvmParams {
    /// Parameters for the experiment: C=10, γ=0.1.
    pub fn new(c: f64, gamma: f64, seed: u64) -> Self {
        Self {
            c,
            gamma,
            tol: 1e-4,
            max_passes: 10,
            max_iter: 10_000,
            seed,
        }
    }
}

/// Fitted SVM state: support vectors plus calibration. Immutable after fit.
#[derive(Debug, Clone)]
pub struct TrainedSvm {
    /// Support vectors: [num_sv, num_features].
    support_vectors: Array2<f64>,
    /// Dual coefficients `αᵢ·yᵢ`, one per support vector.
    coefficients: Vec<f64>,
    /// Bias term.
    bias: f64,
    /// RBF kernel coefficient.
    gamma: f64,
    /// Platt sigmoid parameters for probability calibration.
    platt: PlattScale,
}

impl TrainedSvm {
    pub(crate) fn new(
        support_vectors: Array2<f64>,
        coefficients: Vec<f64>,
        bias: f64,
        gamma: f64,
        platt: PlattScale,
    ) -> Self {
        Self {
            support_vectors,
            coefficients,
            bias,
            gamma,
            platt,
        }
    }

    /// Train on structured features and binary labels.
    ///
    /// # Errors
    /// - `PipelineError::SampleCountMismatch` if rows and labels disagree
    /// - `PipelineError::EmptyInput` for an empty training set
    /// - `PipelineError::TrainingError` if both classes are not present
    pub fn fit(features: &Array2<f64>, labels: &[u8], params: &SvmParams) -> PipelineResult<Self> {
        trainer::fit(features, labels, params)
    }

    /// RBF kernel between a sample and one support vector.
    #[inline]
    fn rbf_kernel(&self, x: &ArrayView1<f64>, sv_row: usize) -> f64 {
        let sv = self.support_vectors.row(sv_row);
        let sq_dist: f64 = x
            .iter()
            .zip(sv.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        (-self.gamma * sq_dist).exp()
    }

    /// Raw decision value for one sample.
    pub fn decision_function(&self, x: &ArrayView1<f64>) -> f64 {
        let mut sum = self.bias;
        for (i, coef) in self.coefficients.iter().enumerate() {
            sum += coef * self.rbf_kernel(x, i);
        }
        sum
    }

    /// Per-class probabilities, one `[P(0), P(1)]` row per input row.
    ///
    /// Rows sum to 1 within numerical tolerance.
    ///
    /// # Errors
    /// - `PipelineError::DimensionMismatch` if the feature width differs
    ///   from the training width
    pub fn predict_proba(&self, features: &Array2<f64>) -> PipelineResult<Array2<f64>> {
        if features.ncols() != self.support_vectors.ncols() {
            return Err(PipelineError::DimensionMismatch {
                expected: self.support_vectors.ncols(),
                got: features.ncols(),
            });
        }
        let n = features.nrows();
        let mut probs = Array2::<f64>::zeros((n, 2));
        for (i, row) in features.rows().into_iter().enumerate() {
            let decision = self.decision_function(&row);
            let p1 = self.platt.probability(decision);
            probs[[i, 0]] = 1.0 - p1;
            probs[[i, 1]] = p1;
        }
        Ok(probs)
    }

    /// Hard class predictions (argmax of `predict_proba`, ties to class 0).
    pub fn predict(&self, features: &Array2<f64>) -> PipelineResult<Vec<u8>> {
        let probs = self.predict_proba(features)?;
        Ok(probs
            .rows()
            .into_iter()
            .map(|row| u8::from(row[1] > row[0]))
            .collect())
    }

    /// Number of support vectors retained from training.
    pub fn num_support_vectors(&self) -> usize {
        self.support_vectors.nrows()
    }

    /// Fitted Platt sigmoid.
    pub fn platt(&self) -> &PlattScale {
        &self.platt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::distributions::{Distribution, Uniform};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Two well-separated uniform blobs in 2D.
    fn blob_data(n_per_class: usize, seed: u64) -> (Array2<f64>, Vec<u8>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let jitter = Uniform::new(0.0, 0.2);
        let mut flat = Vec::with_capacity(n_per_class * 4);
        let mut labels = Vec::with_capacity(n_per_class * 2);
        for _ in 0..n_per_class {
            flat.push(0.1 + jitter.sample(&mut rng));
            flat.push(0.1 + jitter.sample(&mut rng));
            labels.push(0);
        }
        for _ in 0..n_per_class {
            flat.push(0.8 + jitter.sample(&mut rng));
            flat.push(0.8 + jitter.sample(&mut rng));
            labels.push(1);
        }
        (
            Array2::from_shape_vec((n_per_class * 2, 2), flat).unwrap(),
            labels,
        )
    }

    #[test]
    fn test_fit_separable_blobs() {
        let (x, y) = blob_data(40, 42);
        let svm = TrainedSvm::fit(&x, &y, &SvmParams::new(10.0, 0.1, 42)).unwrap();
        let preds = svm.predict(&x).unwrap();
        let correct = preds.iter().zip(&y).filter(|(p, l)| p == l).count();
        assert!(
            correct as f64 / y.len() as f64 > 0.95,
            "separable blobs should be nearly perfectly classified, got {}/{}",
            correct,
            y.len()
        );
        assert!(svm.num_support_vectors() > 0);
        println!("[PASS] RBF SVM separates the blobs: {}/{}", correct, y.len());
    }

    #[test]
    fn test_predict_proba_rows_sum_to_one() {
        let (x, y) = blob_data(25, 1);
        let svm = TrainedSvm::fit(&x, &y, &SvmParams::new(10.0, 0.1, 1)).unwrap();
        let probs = svm.predict_proba(&x).unwrap();
        for row in probs.rows() {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6, "row sums to {}", sum);
            assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
        println!("[PASS] predict_proba rows sum to 1 within 1e-6");
    }

    #[test]
    fn test_fit_is_reproducible_for_fixed_seed() {
        let (x, y) = blob_data(20, 3);
        let params = SvmParams::new(10.0, 0.1, 3);
        let a = TrainedSvm::fit(&x, &y, &params).unwrap();
        let b = TrainedSvm::fit(&x, &y, &params).unwrap();
        let pa = a.predict_proba(&x).unwrap();
        let pb = b.predict_proba(&x).unwrap();
        for (va, vb) in pa.iter().zip(pb.iter()) {
            assert!((va - vb).abs() < 1e-12);
        }
        println!("[PASS] same seed and data give bit-identical probabilities");
    }

    #[test]
    fn test_predict_proba_rejects_width_mismatch() {
        let (x, y) = blob_data(10, 5);
        let svm = TrainedSvm::fit(&x, &y, &SvmParams::new(10.0, 0.1, 5)).unwrap();
        let wrong = Array2::<f64>::zeros((3, 5));
        assert!(matches!(
            svm.predict_proba(&wrong),
            Err(PipelineError::DimensionMismatch { expected: 2, got: 5 })
        ));
    }

    #[test]
    fn test_fit_rejects_single_class() {
        let x = Array2::<f64>::zeros((4, 2));
        let y = vec![0u8; 4];
        assert!(matches!(
            TrainedSvm::fit(&x, &y, &SvmParams::new(10.0, 0.1, 0)),
            Err(PipelineError::TrainingError { .. })
        ));
    }

    #[test]
    fn test_fit_rejects_count_mismatch() {
        let x = Array2::<f64>::zeros((4, 2));
        let y = vec![0u8, 1];
        assert!(matches!(
            TrainedSvm::fit(&x, &y, &SvmParams::new(10.0, 0.1, 0)),
            Err(PipelineError::SampleCountMismatch { left: 4, right: 2 })
        ));
    }
}
