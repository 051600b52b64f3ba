//! Platt scaling: sigmoid calibration of SVM decision values.
//!
//! Fits `P(y=1|f) = 1 / (1 + exp(A·f + B))` by minimizing the negative
//! log-likelihood with Newton's method and backtracking line search
//! (Platt 1999, with the numerically robust updates from Lin/Weng/Keerthi).

/// Fitted sigmoid parameters. Immutable after fit.
#[derive(Debug, Clone, Copy)]
pub struct PlattScale {
    a: f64,
    b: f64,
}

impl PlattScale {
    /// Fit the sigmoid on training decision values and binary labels.
    ///
    /// Targets use the standard smoothed estimates
    /// `t⁺ = (N⁺+1)/(N⁺+2)` and `t⁻ = 1/(N⁻+2)` rather than raw 0/1,
    /// which keeps the likelihood bounded.
    pub fn fit(decisions: &[f64], labels: &[u8]) -> Self {
        let n = decisions.len();
        let prior1 = labels.iter().filter(|&&l| l == 1).count() as f64;
        let prior0 = n as f64 - prior1;

        let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
        let lo_target = 1.0 / (prior0 + 2.0);
        let targets: Vec<f64> = labels
            .iter()
            .map(|&l| if l == 1 { hi_target } else { lo_target })
            .collect();

        let mut a = 0.0f64;
        let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();

        const MAX_ITER: usize = 100;
        const MIN_STEP: f64 = 1e-10;
        const SIGMA: f64 = 1e-12; // Hessian ridge

        let fval = |a: f64, b: f64| -> f64 {
            let mut val = 0.0;
            for (f, t) in decisions.iter().zip(&targets) {
                let f_ab = a * f + b;
                // Stable log(1 + exp(...)) in both branches.
                if f_ab >= 0.0 {
                    val += t * f_ab + (1.0 + (-f_ab).exp()).ln();
                } else {
                    val += (t - 1.0) * f_ab + (1.0 + f_ab.exp()).ln();
                }
            }
            val
        };

        let mut obj = fval(a, b);

        for _ in 0..MAX_ITER {
            // Gradient and Hessian of the NLL.
            let (mut h11, mut h22, mut h21) = (SIGMA, SIGMA, 0.0);
            let (mut g1, mut g2) = (0.0, 0.0);
            for (f, t) in decisions.iter().zip(&targets) {
                let f_ab = a * f + b;
                let (p, q) = if f_ab >= 0.0 {
                    let e = (-f_ab).exp();
                    (e / (1.0 + e), 1.0 / (1.0 + e))
                } else {
                    let e = f_ab.exp();
                    (1.0 / (1.0 + e), e / (1.0 + e))
                };
                let d1 = t - p;
                let d2 = p * q;
                h11 += f * f * d2;
                h22 += d2;
                h21 += f * d2;
                g1 += f * d1;
                g2 += d1;
            }

            if g1.abs() < 1e-5 && g2.abs() < 1e-5 {
                break;
            }

            // Newton direction via the 2x2 inverse.
            let det = h11 * h22 - h21 * h21;
            let da = -(h22 * g1 - h21 * g2) / det;
            let db = -(-h21 * g1 + h11 * g2) / det;
            let grad_dot_dir = g1 * da + g2 * db;

            // Backtracking line search.
            let mut step = 1.0;
            while step >= MIN_STEP {
                let new_a = a + step * da;
                let new_b = b + step * db;
                let new_obj = fval(new_a, new_b);
                if new_obj < obj + 1e-4 * step * grad_dot_dir {
                    a = new_a;
                    b = new_b;
                    obj = new_obj;
                    break;
                }
                step /= 2.0;
            }
            if step < MIN_STEP {
                break;
            }
        }

        Self { a, b }
    }

    /// Calibrated `P(y=1|f)` for a decision value.
    pub fn probability(&self, decision: f64) -> f64 {
        let f_ab = self.a * decision + self.b;
        if f_ab >= 0.0 {
            let e = (-f_ab).exp();
            e / (1.0 + e)
        } else {
            1.0 / (1.0 + f_ab.exp())
        }
    }

    /// Slope of the fitted sigmoid.
    pub fn slope(&self) -> f64 {
        self.a
    }

    /// Intercept of the fitted sigmoid.
    pub fn intercept(&self) -> f64 {
        self.b
    }
}
