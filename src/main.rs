//! Hybrid classifier pipeline binary.
//!
//! Runs the full experiment once: generate the synthetic dataset, embed the
//! texts, train the SVM on the structured features, fuse both branches and
//! print the report. No flags; `HYBRID_MODEL_DIR` overrides the encoder
//! weights directory.

use hybrid_classifier::{
    accuracy, confidence_proxy, fuse_predictions, print_report, select_embedding_rows,
    select_rows, train_test_split, MinMaxScaler, PipelineConfig, PipelineResult, RobertaEncoder,
    SvmParams, SyntheticDataset, TrainedSvm,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run() {
        tracing::error!(error = %e, "Pipeline failed");
        std::process::exit(1);
    }
}

fn run() -> PipelineResult<()> {
    let mut config = PipelineConfig::default();
    if let Ok(model_dir) = std::env::var("HYBRID_MODEL_DIR") {
        config.model_dir = model_dir.into();
    }
    config.validate()?;

    tracing::info!(
        num_samples = config.num_samples,
        seed = config.seed,
        model_dir = %config.model_dir.display(),
        "Starting hybrid pipeline"
    );

    // Synthetic dataset: two constant sentences, uniform structured features.
    let dataset = SyntheticDataset::generate(&config);
    let labels = dataset.labels();

    // Normalize over the FULL matrix before splitting. The test rows leak
    // into the column mins/maxs; preserved from the original experiment.
    let (_, features) = MinMaxScaler::fit_transform(&dataset.feature_matrix())?;

    // Embed every text with the RoBERTa encoder.
    let encoder =
        RobertaEncoder::load(&config.model_dir, config.max_tokens, config.max_batch_size)?;
    let texts = dataset.texts();
    let embeddings = encoder.encode(&texts)?;

    // One permutation drives features, embeddings and labels alike.
    let split = train_test_split(dataset.len(), config.test_fraction, config.seed);
    let train_features = select_rows(&features, &split.train);
    let test_features = select_rows(&features, &split.test);
    let train_embeddings = select_embedding_rows(&embeddings, &split.train);
    let test_embeddings = select_embedding_rows(&embeddings, &split.test);
    let train_labels: Vec<u8> = split.train.iter().map(|&i| labels[i]).collect();
    let test_labels: Vec<u8> = split.test.iter().map(|&i| labels[i]).collect();

    // Structured branch: RBF SVM with Platt-calibrated probabilities.
    let params = SvmParams::new(config.svm_c, config.svm_gamma, config.seed);
    let svm = TrainedSvm::fit(&train_features, &train_labels, &params)?;
    let svm_probs = svm.predict_proba(&test_features)?;

    // Text branch: dot-with-first-training-embedding proxy, then fusion.
    let text_confidence = confidence_proxy(&test_embeddings, &train_embeddings)?;
    let predictions = fuse_predictions(&text_confidence, &svm_probs)?;

    let computed = accuracy(&predictions, &test_labels)?;
    tracing::info!(
        test_samples = test_labels.len(),
        support_vectors = svm.num_support_vectors(),
        accuracy = computed,
        "Pipeline complete"
    );

    print_report(computed);
    Ok(())
}
