// training.rs
// ============================================================================
// Autor:   Marcus Schlieper (ExpChat.ai)
// Hinweis: Ende-zu-Ende-Eigenschaften des VAE+GAN-Trainings.
// ============================================================================

use approx::assert_abs_diff_eq;
use ndarray::Array2;

use molvaegan::latent::kl_divergence;
use molvaegan::math::all_finite;
use molvaegan::{LatentParams, ModelConfig, SmilesTokenizer, StepOutcome, TokenCorpus, VaeGan};

fn small_config(seed: u64) -> ModelConfig {
    ModelConfig {
        seq_len: 8,
        latent_dim: 4,
        hidden_dim: 16,
        learning_rate: 5e-3,
        epochs: 1,
        batch_size: 1,
        seed: Some(seed),
    }
}

fn two_sequence_corpus() -> TokenCorpus {
    TokenCorpus::from_ids(vec![vec![4, 4, 3, 1, 0, 0, 0, 0], vec![4, 3, 3, 1, 1, 0, 0, 0]], 4).unwrap()
}

#[test]
fn kl_is_zero_at_standard_normal() {
    let p = LatentParams { mu: Array2::zeros((1, 128)), logvar: Array2::zeros((1, 128)) };
    assert_abs_diff_eq!(kl_divergence(&p), 0.0);
}

#[test]
fn sampler_returns_requested_count_in_unit_interval() {
    let mut model = VaeGan::new(small_config(3)).unwrap();
    let out = model.generate(5);
    assert_eq!(out.dim(), (5, 8));
    assert!(out.iter().all(|&v| (0.0..=1.0).contains(&v)));
}

#[test]
fn seeded_runs_are_bit_identical() {
    let corpus = two_sequence_corpus();
    let run = || {
        let mut model = VaeGan::new(small_config(42)).unwrap();
        let summaries = model.train(&corpus, 3, || false).unwrap();
        let samples = model.generate(4);
        (model.params().clone(), summaries.last().map(|s| s.mean_recon), samples)
    };
    let (p1, r1, s1) = run();
    let (p2, r2, s2) = run();
    assert_eq!(p1, p2);
    assert_eq!(r1, r2);
    assert_eq!(s1, s2);
}

#[test]
fn reconstruction_improves_on_tiny_corpus() {
    let corpus = two_sequence_corpus();
    let mut model = VaeGan::new(small_config(7)).unwrap();
    let d_before = model.reconstruction_error(&corpus);

    let summaries = model.train(&corpus, 150, || false).unwrap();
    assert_eq!(summaries.len(), 150);
    assert!(summaries.iter().all(|s| s.completed && s.skipped == 0));

    let d_after = model.reconstruction_error(&corpus);
    assert!(d_after < d_before, "eval recon {d_before} -> {d_after}");

    let d_head: f32 = summaries[..20].iter().map(|s| s.mean_recon).sum::<f32>() / 20.0;
    let d_tail: f32 = summaries[130..].iter().map(|s| s.mean_recon).sum::<f32>() / 20.0;
    assert!(d_tail < d_head, "windowed recon {d_head} -> {d_tail}");

    for s in &summaries {
        assert!(s.mean_disc.is_finite() && s.mean_gen.is_finite());
    }
}

#[test]
fn non_finite_example_is_skipped_and_training_continues() {
    let mut rows = Array2::from_elem((3, 8), 0.25f32);
    rows[(1, 2)] = f32::NAN;
    let corpus = TokenCorpus::from_normalized(rows).unwrap();

    let mut model = VaeGan::new(small_config(5)).unwrap();
    let summary = model.train_epoch(&corpus, &mut || false).unwrap();
    assert_eq!(summary.applied, 2);
    assert_eq!(summary.skipped, 1);
    assert!(summary.mean_recon.is_finite());
    assert!(all_finite(&model.params().encoder.fc1.w));
    assert!(all_finite(&model.params().decoder.fc2.w));
}

#[test]
fn single_step_on_nan_leaves_model_untouched() {
    let mut model = VaeGan::new(small_config(9)).unwrap();
    let before = model.params().clone();
    let outcome = model.train_step(&Array2::from_elem((1, 8), f32::NAN));
    assert!(matches!(outcome, StepOutcome::Skipped(_)));
    assert_eq!(model.params(), &before);
}

#[test]
fn tokenized_corpus_trains_end_to_end() {
    let smiles: Vec<String> = ["CCO", "CC(=O)O", "c1ccccc1", "CN"].iter().map(|s| s.to_string()).collect();
    let tok = SmilesTokenizer::fit(&smiles, Some(8)).unwrap();
    let corpus = tok.build_corpus(&smiles).unwrap();
    assert_eq!(corpus.seq_len(), 8);

    let mut model = VaeGan::new(small_config(11)).unwrap();
    let summaries = model.train(&corpus, 2, || false).unwrap();
    assert_eq!(summaries.iter().map(|s| s.applied).sum::<usize>(), 8);
    assert_eq!(model.state().epoch, 2);
}

#[test]
fn configured_epoch_count_drives_default_training() {
    let dir = tempfile::tempdir().unwrap();
    let p_config = dir.path().join("config.json");
    ModelConfig { epochs: 3, ..small_config(13) }.save(&p_config).unwrap();

    let cfg = ModelConfig::load(&p_config).unwrap();
    assert_eq!(cfg.epochs, 3);
    let mut model = VaeGan::new(cfg).unwrap();
    let summaries = model.train_configured(&two_sequence_corpus(), || false).unwrap();
    assert_eq!(summaries.len(), 3);
    assert!(summaries.iter().all(|s| s.completed));
    assert_eq!(model.state().epoch, 3);
}
