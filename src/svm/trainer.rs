//! Simplified SMO training for the RBF SVM.
//!
//! The kernel matrix is precomputed once; the solver then works purely on
//! Gram entries. Partner indices are drawn from a seeded RNG so a fixed
//! seed gives a reproducible fit within one build of the crate.

use ndarray::Array2;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{PipelineError, PipelineResult};

use super::platt::PlattScale;
use super::{SvmParams, TrainedSvm};

/// Alphas below this are treated as zero when extracting support vectors.
const SV_EPSILON: f64 = 1e-8;

/// Precompute the RBF Gram matrix `K[i][j] = exp(-γ‖xᵢ-xⱼ‖²)`.
fn gram_matrix(features: &Array2<f64>, gamma: f64) -> Array2<f64> {
    let n = features.nrows();
    let mut gram = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        gram[[i, i]] = 1.0;
        let xi = features.row(i);
        for j in (i + 1)..n {
            let xj = features.row(j);
            let sq_dist: f64 = xi
                .iter()
                .zip(xj.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            let k = (-gamma * sq_dist).exp();
            gram[[i, j]] = k;
            gram[[j, i]] = k;
        }
    }
    gram
}

/// Decision value for training sample `idx` under the current alphas.
fn margin(gram: &Array2<f64>, labels: &[f64], alpha: &[f64], bias: f64, idx: usize) -> f64 {
    let mut f = bias;
    for i in 0..alpha.len() {
        if alpha[i] > 0.0 {
            f += alpha[i] * labels[i] * gram[[i, idx]];
        }
    }
    f
}

pub(super) fn fit(
    features: &Array2<f64>,
    labels: &[u8],
    params: &SvmParams,
) -> PipelineResult<TrainedSvm> {
    let n = features.nrows();
    if n == 0 {
        return Err(PipelineError::EmptyInput);
    }
    if labels.len() != n {
        return Err(PipelineError::SampleCountMismatch {
            left: n,
            right: labels.len(),
        });
    }
    if !labels.contains(&0) || !labels.contains(&1) {
        return Err(PipelineError::TrainingError {
            message: "training set must contain both classes".to_string(),
        });
    }

    // Map {0, 1} to {-1, +1} for the dual problem.
    let y: Vec<f64> = labels.iter().map(|&l| if l == 1 { 1.0 } else { -1.0 }).collect();

    let gram = gram_matrix(features, params.gamma);
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);

    let c = params.c;
    let tol = params.tol;
    let mut alpha = vec![0.0f64; n];
    let mut bias = 0.0f64;

    let mut passes = 0;
    let mut iter = 0;

    while passes < params.max_passes && iter < params.max_iter {
        let mut num_changed = 0;

        for i in 0..n {
            let ei = margin(&gram, &y, &alpha, bias, i) - y[i];

            // KKT violation check for alpha[i].
            if (y[i] * ei < -tol && alpha[i] < c) || (y[i] * ei > tol && alpha[i] > 0.0) {
                let mut j = rng.gen_range(0..n);
                while j == i {
                    j = rng.gen_range(0..n);
                }

                let ej = margin(&gram, &y, &alpha, bias, j) - y[j];

                let ai_old = alpha[i];
                let aj_old = alpha[j];

                let (lo, hi) = if y[i] != y[j] {
                    (
                        f64::max(0.0, alpha[j] - alpha[i]),
                        f64::min(c, c + alpha[j] - alpha[i]),
                    )
                } else {
                    (
                        f64::max(0.0, alpha[i] + alpha[j] - c),
                        f64::min(c, alpha[i] + alpha[j]),
                    )
                };

                if (lo - hi).abs() < 1e-4 {
                    continue;
                }

                let eta = 2.0 * gram[[i, j]] - gram[[i, i]] - gram[[j, j]];
                if eta >= 0.0 {
                    continue;
                }

                alpha[j] = (aj_old - y[j] * (ei - ej) / eta).clamp(lo, hi);
                if (alpha[j] - aj_old).abs() < 1e-4 {
                    continue;
                }

                alpha[i] = ai_old + y[i] * y[j] * (aj_old - alpha[j]);

                let b1 = bias
                    - ei
                    - y[i] * (alpha[i] - ai_old) * gram[[i, i]]
                    - y[j] * (alpha[j] - aj_old) * gram[[i, j]];
                let b2 = bias
                    - ej
                    - y[i] * (alpha[i] - ai_old) * gram[[i, j]]
                    - y[j] * (alpha[j] - aj_old) * gram[[j, j]];

                bias = if alpha[i] > 0.0 && alpha[i] < c {
                    b1
                } else if alpha[j] > 0.0 && alpha[j] < c {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };

                num_changed += 1;
            }
        }

        iter += 1;
        if num_changed == 0 {
            passes += 1;
        } else {
            passes = 0;
        }
    }

    // Extract support vectors (alpha > 0) and their dual coefficients.
    let support_indices: Vec<usize> = (0..n).filter(|&i| alpha[i] > SV_EPSILON).collect();
    if support_indices.is_empty() {
        return Err(PipelineError::TrainingError {
            message: "SMO converged with no support vectors".to_string(),
        });
    }

    let cols = features.ncols();
    let sv_flat: Vec<f64> = support_indices
        .iter()
        .flat_map(|&i| features.row(i).to_vec())
        .collect();
    let support_vectors = Array2::from_shape_vec((support_indices.len(), cols), sv_flat)
        .expect("support vector rows have the training width");
    let coefficients: Vec<f64> = support_indices.iter().map(|&i| alpha[i] * y[i]).collect();

    tracing::info!(
        support_vectors = support_indices.len(),
        iterations = iter,
        c = params.c,
        gamma = params.gamma,
        "SVM training complete"
    );

    // Calibrate probabilities on the training decision values.
    let decisions: Vec<f64> = (0..n).map(|i| margin(&gram, &y, &alpha, bias, i)).collect();
    let platt = PlattScale::fit(&decisions, labels);

    Ok(TrainedSvm::new(
        support_vectors,
        coefficients,
        bias,
        params.gamma,
        platt,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_gram_matrix_properties() {
        let x = array![[0.0, 0.0], [1.0, 0.0], [0.0, 2.0]];
        let gram = gram_matrix(&x, 0.5);
        // Unit diagonal, symmetric, exp(-gamma * sq_dist) off-diagonal.
        for i in 0..3 {
            assert_eq!(gram[[i, i]], 1.0);
        }
        assert!((gram[[0, 1]] - (-0.5f64).exp()).abs() < 1e-12);
        assert!((gram[[0, 2]] - (-2.0f64).exp()).abs() < 1e-12);
        assert_eq!(gram[[1, 2]], gram[[2, 1]]);
        println!("[PASS] Gram matrix is symmetric with unit diagonal");
    }

    #[test]
    fn test_fit_empty_is_error() {
        let x = Array2::<f64>::zeros((0, 2));
        assert!(matches!(
            fit(&x, &[], &SvmParams::new(1.0, 1.0, 0)),
            Err(PipelineError::EmptyInput)
        ));
    }
}
