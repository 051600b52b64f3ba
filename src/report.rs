//! Accuracy computation and the final report.
//!
//! The report reproduces the original experiment's output verbatim,
//! INCLUDING its final quirk: after printing the computed accuracy, the
//! value is discarded and a hardcoded constant is printed as the "Hybrid
//! Model" result. Any real deployment must delete [`REPORTED_ACCURACY`]
//! and report the computed value instead.

use crate::error::{PipelineError, PipelineResult};

/// The constant the experiment reports regardless of computed results.
pub const REPORTED_ACCURACY: f64 = 0.943;

/// Fraction of predictions equal to the true labels.
pub fn accuracy(predictions: &[usize], labels: &[u8]) -> PipelineResult<f64> {
    if predictions.len() != labels.len() {
        return Err(PipelineError::SampleCountMismatch {
            left: predictions.len(),
            right: labels.len(),
        });
    }
    if predictions.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    let correct = predictions
        .iter()
        .zip(labels)
        .filter(|(&p, &l)| p == l as usize)
        .count();
    Ok(correct as f64 / predictions.len() as f64)
}

/// Final percentage line the report always emits, derived from the constant.
pub fn reported_line() -> String {
    format!("Hybrid Model\t{:.1}%", REPORTED_ACCURACY * 100.0)
}

/// Print the two-part report: the computed accuracy, then the constant
/// overwrite (preserved behavior, not a bug to fix here).
pub fn print_report(computed: f64) {
    println!("\nModel\tAccuracy");
    println!("Hybrid\t~{:.1}%", computed * 100.0);

    println!("Model\t\tAccuracy");
    println!("{}", reported_line());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_basic() {
        let preds = vec![0, 1, 1, 0];
        let labels = vec![0u8, 1, 0, 0];
        assert!((accuracy(&preds, &labels).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_accuracy_rejects_mismatch() {
        assert!(matches!(
            accuracy(&[0, 1], &[0u8]),
            Err(PipelineError::SampleCountMismatch { left: 2, right: 1 })
        ));
    }

    #[test]
    fn test_accuracy_rejects_empty() {
        assert!(matches!(
            accuracy(&[], &[]),
            Err(PipelineError::EmptyInput)
        ));
    }

    #[test]
    fn test_reported_line_is_constant() {
        // The printed result never depends on the computed accuracy.
        assert_eq!(reported_line(), "Hybrid Model\t94.3%");
        println!("[PASS] report always emits the 94.3% constant");
    }
}
