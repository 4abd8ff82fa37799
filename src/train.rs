// train.rs
// ============================================================================
// Autor:   Marcus Schlieper (ExpChat.ai)
// Hinweis: VAE+GAN orchestration: parameters, optimizer state, the three
//          phase training step, epoch loop, diagnostics, sampling entry.
// ============================================================================
//
//  One training step over one batch (usually one example):
//
//      ┌──────────────────────────────────────────────────────────────┐
//      │ 1 Representation  encode ▸ reparameterize ▸ decode           │
//      │                   MSE + KL  →  Adam(encoder, decoder)         │
//      ├──────────────────────────────────────────────────────────────┤
//      │ 2 Discrimination  D(real), D(recon as constant)              │
//      │                   BCE       →  Adam(discriminator)            │
//      ├──────────────────────────────────────────────────────────────┤
//      │ 3 Adversarial     D'(recon) through the retained VAE graph   │
//      │                   -log D'   →  Adam(encoder, decoder)         │
//      └──────────────────────────────────────────────────────────────┘
//
//  A non-finite phase 1 loss skips the whole step; nothing is updated.
// ============================================================================

#![forbid(unsafe_code)]

use std::time::Instant;

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::ModelConfig;
use crate::decoder::{DecoderAdam, DecoderGraph, DecoderGrads, DecoderParams};
use crate::discriminator::{DiscriminatorAdam, DiscriminatorParams};
use crate::encoder::{EncoderAdam, EncoderGraph, EncoderGrads, EncoderParams};
use crate::error::VaeGanError;
use crate::latent::{kl_divergence, kl_grad, reparameterize, LatentNoise, LatentParams, LatentVector};
use crate::math::{discriminator_loss, generator_loss, mse_grad, mse_loss};
use crate::sampler;
use crate::tokenize::TokenCorpus;

// ---------------------------------------------------------------------------
// Parameters and optimizer state
// ---------------------------------------------------------------------------

/// The three independently owned parameter sets.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelParameters {
    pub encoder: EncoderParams,
    pub decoder: DecoderParams,
    pub discriminator: DiscriminatorParams,
}

impl ModelParameters {
    /// Initialises encoder, decoder and discriminator in that order from `rng`.
    pub fn new<R: Rng>(cfg: &ModelConfig, rng: &mut R) -> Self {
        let encoder = EncoderParams::new(cfg.seq_len, cfg.hidden_dim, cfg.latent_dim, rng);
        let decoder = DecoderParams::new(cfg.latent_dim, cfg.hidden_dim, cfg.seq_len, rng);
        let discriminator = DiscriminatorParams::new(cfg.seq_len, cfg.hidden_dim, rng);
        Self { encoder, decoder, discriminator }
    }

    pub fn total_parameters(&self) -> usize {
        self.encoder.parameter_count()
            + self.decoder.parameter_count()
            + self.discriminator.parameter_count()
    }

    /// Checks every set against the dimensions of `cfg`.
    pub fn check_shapes(&self, cfg: &ModelConfig) -> Result<(), VaeGanError> {
        let checks: [(&'static str, usize, usize); 5] = [
            ("encoder input", cfg.seq_len, self.encoder.input_dim()),
            ("encoder latent", cfg.latent_dim, self.encoder.latent_dim()),
            ("decoder latent", cfg.latent_dim, self.decoder.latent_dim()),
            ("decoder output", cfg.seq_len, self.decoder.output_dim()),
            ("discriminator input", cfg.seq_len, self.discriminator.input_dim()),
        ];
        for (what, expected, actual) in checks {
            if expected != actual {
                return Err(VaeGanError::ShapeMismatch { what, expected, actual });
            }
        }
        Ok(())
    }
}

/// Shared optimizer of encoder and decoder.
#[derive(Clone, Debug)]
pub struct VaeOptimizer {
    encoder: EncoderAdam,
    decoder: DecoderAdam,
}

impl VaeOptimizer {
    pub fn new(encoder: &EncoderParams, decoder: &DecoderParams) -> Self {
        Self { encoder: EncoderAdam::new(encoder), decoder: DecoderAdam::new(decoder) }
    }

    pub fn step(
        &mut self,
        encoder: &mut EncoderParams,
        decoder: &mut DecoderParams,
        grads: &VaeGrads,
        lr: f32,
    ) {
        self.encoder.step(encoder, &grads.encoder, lr);
        self.decoder.step(decoder, &grads.decoder, lr);
    }

    /// Applied steps as (encoder, decoder).
    pub fn steps(&self) -> (usize, usize) {
        (self.encoder.steps(), self.decoder.steps())
    }
}

/// Optimizer state of both objectives. The two halves never share moments.
#[derive(Clone, Debug)]
pub struct OptimizerState {
    pub vae: VaeOptimizer,
    pub discriminator: DiscriminatorAdam,
}

impl OptimizerState {
    pub fn new(params: &ModelParameters) -> Self {
        Self {
            vae: VaeOptimizer::new(&params.encoder, &params.decoder),
            discriminator: DiscriminatorAdam::new(&params.discriminator),
        }
    }
}

// ---------------------------------------------------------------------------
// Retained VAE graph
// ---------------------------------------------------------------------------

/// Forward state of encoder ▸ sampler ▸ decoder, kept alive after the phase 1
/// update so the adversarial phase can backpropagate through the same
/// reconstruction.
pub struct VaeGraph {
    latent: LatentParams,
    encoder: EncoderGraph,
    noise: LatentNoise,
    decoder: DecoderGraph,
}

pub struct VaeGrads {
    pub encoder: EncoderGrads,
    pub decoder: DecoderGrads,
}

impl VaeGraph {
    pub fn reconstruction(&self) -> &Array2<f32> {
        self.decoder.reconstruction()
    }

    /// Gradients of `reconstruction loss + KL`.
    fn backward_vae(&self, d_recon: &Array2<f32>) -> VaeGrads {
        let decoder = self.decoder.backward(d_recon);
        let (mut d_mu, mut d_logvar) = self.noise.backward(&decoder.d_z);
        let (kl_mu, kl_logvar) = kl_grad(&self.latent);
        d_mu += &kl_mu;
        d_logvar += &kl_logvar;
        let encoder = self.encoder.backward(&d_mu, &d_logvar);
        VaeGrads { encoder, decoder }
    }

    /// Gradients of a loss that reaches the model only through the
    /// reconstruction.
    fn backward_reconstruction(&self, d_recon: &Array2<f32>) -> VaeGrads {
        let decoder = self.decoder.backward(d_recon);
        let (d_mu, d_logvar) = self.noise.backward(&decoder.d_z);
        let encoder = self.encoder.backward(&d_mu, &d_logvar);
        VaeGrads { encoder, decoder }
    }
}

// ---------------------------------------------------------------------------
// Step outcome
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepLosses {
    pub recon: f32,
    pub kl: f32,
    pub vae: f32,
    pub disc: f32,
    pub gen: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SkipReason {
    /// Phase 1 loss was NaN or infinite.
    NonFiniteLoss { recon: f32, kl: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepOutcome {
    Applied(StepLosses),
    Skipped(SkipReason),
}

impl StepOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, StepOutcome::Applied(_))
    }
}

/// Result of an applied representation phase.
pub struct RepresentationPass {
    pub graph: VaeGraph,
    pub recon_loss: f32,
    pub kl: f32,
}

/// Phase 1: encode ▸ reparameterize ▸ decode, MSE + KL, one Adam step on
/// encoder and decoder. A non-finite loss returns before any update.
pub fn representation_phase<R: Rng>(
    encoder: &mut EncoderParams,
    decoder: &mut DecoderParams,
    optim: &mut VaeOptimizer,
    x: &Array2<f32>,
    lr: f32,
    rng: &mut R,
) -> Result<RepresentationPass, SkipReason> {
    let (latent, encoder_graph) = encoder.encode_tracked(x);
    let (z, noise) = reparameterize(&latent, rng);
    let (recon, decoder_graph) = decoder.decode_tracked(&z);

    let d_recon_loss = mse_loss(&recon, x);
    let d_kl = kl_divergence(&latent);
    if !(d_recon_loss + d_kl).is_finite() {
        return Err(SkipReason::NonFiniteLoss { recon: d_recon_loss, kl: d_kl });
    }

    let graph = VaeGraph { latent, encoder: encoder_graph, noise, decoder: decoder_graph };
    let grads = graph.backward_vae(&mse_grad(&recon, x));
    optim.step(encoder, decoder, &grads, lr);
    Ok(RepresentationPass { graph, recon_loss: d_recon_loss, kl: d_kl })
}

/// Phase 2: BCE on the real batch and on `fake` taken as a constant, one Adam
/// step on the discriminator. Returns the discriminator loss.
pub fn discrimination_phase(
    discriminator: &mut DiscriminatorParams,
    optim: &mut DiscriminatorAdam,
    x: &Array2<f32>,
    fake: &Array2<f32>,
    lr: f32,
) -> f32 {
    let (p_real, real_graph) = discriminator.score_tracked(x);
    let (p_fake, fake_graph) = discriminator.score_tracked(fake);
    let (d_disc, g_real, g_fake) = discriminator_loss(&p_real, &p_fake);
    let grads = real_graph.param_grads(&g_real).merge(&fake_graph.param_grads(&g_fake));
    optim.step(discriminator, &grads, lr);
    d_disc
}

/// Phase 3: `-log D(recon)` with the discriminator read-only, backpropagated
/// through the retained VAE graph, one Adam step on encoder and decoder.
/// Returns the generator loss.
pub fn adversarial_phase(
    encoder: &mut EncoderParams,
    decoder: &mut DecoderParams,
    optim: &mut VaeOptimizer,
    discriminator: &DiscriminatorParams,
    graph: &VaeGraph,
    lr: f32,
) -> f32 {
    let (p_fake, adv_graph) = discriminator.score_tracked(graph.reconstruction());
    let (d_gen, g_fake) = generator_loss(&p_fake);
    let d_recon = adv_graph.input_grad(&g_fake);
    let grads = graph.backward_reconstruction(&d_recon);
    optim.step(encoder, decoder, &grads, lr);
    d_gen
}

/// One full three-phase update on the batch `x` (`[batch, seq_len]`).
///
/// Parameters and optimizer state are passed in explicitly; the function
/// owns nothing between calls.
pub fn train_step<R: Rng>(
    params: &mut ModelParameters,
    optim: &mut OptimizerState,
    x: &Array2<f32>,
    lr: f32,
    rng: &mut R,
) -> StepOutcome {
    let pass = match representation_phase(
        &mut params.encoder,
        &mut params.decoder,
        &mut optim.vae,
        x,
        lr,
        rng,
    ) {
        Ok(pass) => pass,
        Err(reason) => return StepOutcome::Skipped(reason),
    };

    let d_disc = discrimination_phase(
        &mut params.discriminator,
        &mut optim.discriminator,
        x,
        pass.graph.reconstruction(),
        lr,
    );

    let d_gen = adversarial_phase(
        &mut params.encoder,
        &mut params.decoder,
        &mut optim.vae,
        &params.discriminator,
        &pass.graph,
        lr,
    );

    StepOutcome::Applied(StepLosses {
        recon: pass.recon_loss,
        kl: pass.kl,
        vae: pass.recon_loss + pass.kl,
        disc: d_disc,
        gen: d_gen,
    })
}

// ---------------------------------------------------------------------------
// Training state
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct EpochSummary {
    pub epoch: usize,
    pub mean_recon: f32,
    pub mean_kl: f32,
    pub mean_disc: f32,
    pub mean_gen: f32,
    pub applied: usize,
    pub skipped: usize,
    pub secs: f32,
    /// False when the stop predicate ended the epoch early.
    pub completed: bool,
}

#[derive(Clone, Debug, Default)]
pub struct TrainingState {
    /// Completed epochs.
    pub epoch: usize,
    pub last: Option<StepLosses>,
    pub applied_steps: usize,
    pub skipped_steps: usize,
    pub history: Vec<EpochSummary>,
}

// ---------------------------------------------------------------------------
// VaeGan
// ---------------------------------------------------------------------------

pub struct VaeGan {
    config: ModelConfig,
    params: ModelParameters,
    optim: OptimizerState,
    state: TrainingState,
    rng: StdRng,
}

impl VaeGan {
    pub fn new(config: ModelConfig) -> Result<Self, VaeGanError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let params = ModelParameters::new(&config, &mut rng);
        let optim = OptimizerState::new(&params);
        Ok(Self { config, params, optim, state: TrainingState::default(), rng })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn params(&self) -> &ModelParameters {
        &self.params
    }

    pub fn state(&self) -> &TrainingState {
        &self.state
    }

    /// Replaces all parameters (e.g. from a checkpoint) and resets the
    /// optimizer moments.
    pub fn set_parameters(&mut self, params: ModelParameters) -> Result<(), VaeGanError> {
        params.check_shapes(&self.config)?;
        self.optim = OptimizerState::new(&params);
        self.params = params;
        Ok(())
    }

    pub fn network_description(&self) -> String {
        let c = &self.config;
        format!(
            "Encoder({}→{}→2×{}), Decoder({}→{}→{}), Discriminator({}→{}→1)",
            c.seq_len, c.hidden_dim, c.latent_dim,
            c.latent_dim, c.hidden_dim, c.seq_len,
            c.seq_len, c.hidden_dim
        )
    }

    /// Runs one three-phase step and records its outcome.
    pub fn train_step(&mut self, x: &Array2<f32>) -> StepOutcome {
        let outcome = train_step(&mut self.params, &mut self.optim, x, self.config.learning_rate, &mut self.rng);
        match outcome {
            StepOutcome::Applied(losses) => {
                self.state.applied_steps += 1;
                self.state.last = Some(losses);
                debug!(
                    recon = losses.recon,
                    kl = losses.kl,
                    disc = losses.disc,
                    gen = losses.gen,
                    "step applied"
                );
            }
            StepOutcome::Skipped(SkipReason::NonFiniteLoss { recon, kl }) => {
                self.state.skipped_steps += 1;
                warn!(
                    epoch = self.state.epoch,
                    recon = recon,
                    kl = kl,
                    "non-finite VAE loss, update skipped"
                );
            }
        }
        outcome
    }

    fn check_corpus(&self, corpus: &TokenCorpus) -> Result<(), VaeGanError> {
        if corpus.is_empty() {
            return Err(VaeGanError::EmptyCorpus);
        }
        if corpus.seq_len() != self.config.seq_len {
            return Err(VaeGanError::ShapeMismatch {
                what: "corpus seq_len",
                expected: self.config.seq_len,
                actual: corpus.seq_len(),
            });
        }
        Ok(())
    }

    /// One pass over the corpus in order, `batch_size` rows per step.
    /// `should_stop` is polled before every step.
    pub fn train_epoch(
        &mut self,
        corpus: &TokenCorpus,
        should_stop: &mut dyn FnMut() -> bool,
    ) -> Result<EpochSummary, VaeGanError> {
        self.check_corpus(corpus)?;

        let t_epoch_start = Instant::now();
        let (mut d_recon, mut d_kl, mut d_disc, mut d_gen) = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
        let (mut i_applied, mut i_skipped) = (0usize, 0usize);
        let mut b_completed = true;

        for a_batch in corpus.data().axis_chunks_iter(Axis(0), self.config.batch_size) {
            if should_stop() {
                b_completed = false;
                break;
            }
            match self.train_step(&a_batch.to_owned()) {
                StepOutcome::Applied(l) => {
                    d_recon += l.recon;
                    d_kl += l.kl;
                    d_disc += l.disc;
                    d_gen += l.gen;
                    i_applied += 1;
                }
                StepOutcome::Skipped(_) => i_skipped += 1,
            }
        }

        let d_n = i_applied.max(1) as f32;
        let summary = EpochSummary {
            epoch: self.state.epoch,
            mean_recon: d_recon / d_n,
            mean_kl: d_kl / d_n,
            mean_disc: d_disc / d_n,
            mean_gen: d_gen / d_n,
            applied: i_applied,
            skipped: i_skipped,
            secs: t_epoch_start.elapsed().as_secs_f32(),
            completed: b_completed,
        };

        info!(
            epoch = summary.epoch,
            recon = summary.mean_recon,
            kl = summary.mean_kl,
            disc = summary.mean_disc,
            gen = summary.mean_gen,
            skipped = summary.skipped,
            secs = summary.secs,
            "epoch finished"
        );

        if b_completed {
            self.state.epoch += 1;
        }
        self.state.history.push(summary.clone());
        Ok(summary)
    }

    /// Runs up to `i_epochs` epochs; stops early once `should_stop` fires.
    pub fn train(
        &mut self,
        corpus: &TokenCorpus,
        i_epochs: usize,
        mut should_stop: impl FnMut() -> bool,
    ) -> Result<Vec<EpochSummary>, VaeGanError> {
        self.check_corpus(corpus)?;
        let mut v_summaries = Vec::with_capacity(i_epochs);
        for _ in 0..i_epochs {
            let summary = self.train_epoch(corpus, &mut should_stop)?;
            let b_completed = summary.completed;
            v_summaries.push(summary);
            if !b_completed {
                info!("training interrupted after {} completed epochs", self.state.epoch);
                break;
            }
        }
        Ok(v_summaries)
    }

    /// [`train`](Self::train) for the epoch count of the configuration.
    pub fn train_configured(
        &mut self,
        corpus: &TokenCorpus,
        should_stop: impl FnMut() -> bool,
    ) -> Result<Vec<EpochSummary>, VaeGanError> {
        let i_epochs = self.config.epochs;
        self.train(corpus, i_epochs, should_stop)
    }

    /// Mean reconstruction error decoded from the latent mean. No noise, no
    /// parameter change.
    pub fn reconstruction_error(&self, corpus: &TokenCorpus) -> f32 {
        let latent = self.params.encoder.encode(corpus.data());
        let recon = self.params.decoder.decode(&LatentVector { z: latent.mu });
        mse_loss(&recon, corpus.data())
    }

    /// `n` new sequences decoded from prior noise, `[n, seq_len]`.
    pub fn generate(&mut self, n: usize) -> Array2<f32> {
        sampler::generate(&self.params.decoder, n, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::all_finite;

    fn tiny_config(seed: u64) -> ModelConfig {
        ModelConfig {
            seq_len: 6,
            latent_dim: 3,
            hidden_dim: 8,
            learning_rate: 1e-3,
            epochs: 1,
            batch_size: 1,
            seed: Some(seed),
        }
    }

    fn row(v: &[f32]) -> Array2<f32> {
        Array2::from_shape_vec((1, v.len()), v.to_vec()).unwrap()
    }

    #[test]
    fn applied_step_updates_all_three_sets() {
        let mut model = VaeGan::new(tiny_config(1)).unwrap();
        let before = model.params().clone();
        let outcome = model.train_step(&row(&[0.2, 0.4, 0.6, 0.8, 0.0, 0.0]));
        assert!(outcome.is_applied());
        let after = model.params();
        assert_ne!(before.encoder, after.encoder);
        assert_ne!(before.decoder, after.decoder);
        assert_ne!(before.discriminator, after.discriminator);
        assert_eq!(model.state().applied_steps, 1);
    }

    #[test]
    fn losses_are_finite_and_non_negative() {
        let mut model = VaeGan::new(tiny_config(2)).unwrap();
        match model.train_step(&row(&[0.5; 6])) {
            StepOutcome::Applied(l) => {
                for v in [l.recon, l.disc, l.gen] {
                    assert!(v.is_finite() && v >= 0.0);
                }
                assert!(l.kl.is_finite() && l.kl > -1e-5);
                assert!((l.vae - (l.recon + l.kl)).abs() < 1e-5);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn nan_input_skips_without_touching_parameters() {
        let mut model = VaeGan::new(tiny_config(3)).unwrap();
        let before = model.params().clone();
        let outcome = model.train_step(&row(&[f32::NAN; 6]));
        assert!(matches!(outcome, StepOutcome::Skipped(SkipReason::NonFiniteLoss { .. })));
        assert_eq!(model.params(), &before);
        assert_eq!(model.state().skipped_steps, 1);

        assert!(model.train_step(&row(&[0.1; 6])).is_applied());
    }

    fn phase_fixture(seed: u64) -> (ModelConfig, ModelParameters, OptimizerState, StdRng) {
        let cfg = tiny_config(seed);
        let mut rng = StdRng::seed_from_u64(seed);
        let params = ModelParameters::new(&cfg, &mut rng);
        let optim = OptimizerState::new(&params);
        (cfg, params, optim, rng)
    }

    #[test]
    fn representation_phase_updates_only_the_vae() {
        let (cfg, mut params, mut optim, mut rng) = phase_fixture(4);
        let before = params.clone();
        let x = row(&[0.3, 0.6, 0.9, 0.1, 0.0, 0.0]);

        let pass = representation_phase(
            &mut params.encoder,
            &mut params.decoder,
            &mut optim.vae,
            &x,
            cfg.learning_rate,
            &mut rng,
        );
        assert!(pass.is_ok());
        assert_ne!(params.encoder, before.encoder);
        assert_ne!(params.decoder, before.decoder);
        assert_eq!(params.discriminator, before.discriminator);
        assert_eq!(optim.vae.steps(), (1, 1));
        assert_eq!(optim.discriminator.steps(), 0);
    }

    #[test]
    fn discrimination_phase_never_touches_the_vae() {
        let (cfg, mut params, mut optim, mut rng) = phase_fixture(5);
        let x = row(&[0.3, 0.6, 0.9, 0.1, 0.0, 0.0]);
        let Ok(pass) = representation_phase(
            &mut params.encoder,
            &mut params.decoder,
            &mut optim.vae,
            &x,
            cfg.learning_rate,
            &mut rng,
        ) else {
            panic!("finite input must not be skipped");
        };
        let before = params.clone();

        let d_disc = discrimination_phase(
            &mut params.discriminator,
            &mut optim.discriminator,
            &x,
            pass.graph.reconstruction(),
            cfg.learning_rate,
        );
        assert!(d_disc.is_finite());
        assert_eq!(params.encoder, before.encoder);
        assert_eq!(params.decoder, before.decoder);
        assert_ne!(params.discriminator, before.discriminator);
        assert_eq!(optim.vae.steps(), (1, 1));
        assert_eq!(optim.discriminator.steps(), 1);
    }

    #[test]
    fn adversarial_phase_never_touches_the_discriminator() {
        let (cfg, mut params, mut optim, mut rng) = phase_fixture(6);
        let x = row(&[0.3, 0.6, 0.9, 0.1, 0.0, 0.0]);
        let Ok(pass) = representation_phase(
            &mut params.encoder,
            &mut params.decoder,
            &mut optim.vae,
            &x,
            cfg.learning_rate,
            &mut rng,
        ) else {
            panic!("finite input must not be skipped");
        };
        discrimination_phase(
            &mut params.discriminator,
            &mut optim.discriminator,
            &x,
            pass.graph.reconstruction(),
            cfg.learning_rate,
        );
        let before = params.clone();

        let d_gen = adversarial_phase(
            &mut params.encoder,
            &mut params.decoder,
            &mut optim.vae,
            &params.discriminator,
            &pass.graph,
            cfg.learning_rate,
        );
        assert!(d_gen.is_finite());
        assert_eq!(params.discriminator, before.discriminator);
        assert_ne!(params.encoder, before.encoder);
        assert_ne!(params.decoder, before.decoder);
        assert_eq!(optim.vae.steps(), (2, 2));
        assert_eq!(optim.discriminator.steps(), 1);
    }

    #[test]
    fn full_step_advances_each_optimizer_as_scheduled() {
        let (cfg, mut params, mut optim, mut rng) = phase_fixture(7);
        let outcome = train_step(&mut params, &mut optim, &row(&[0.5; 6]), cfg.learning_rate, &mut rng);
        assert!(outcome.is_applied());
        assert_eq!(optim.vae.steps(), (2, 2));
        assert_eq!(optim.discriminator.steps(), 1);

        let outcome = train_step(&mut params, &mut optim, &row(&[f32::NAN; 6]), cfg.learning_rate, &mut rng);
        assert!(!outcome.is_applied());
        assert_eq!(optim.vae.steps(), (2, 2));
        assert_eq!(optim.discriminator.steps(), 1);
    }

    #[test]
    fn corpus_shape_is_checked() {
        let mut model = VaeGan::new(tiny_config(5)).unwrap();
        let corpus = TokenCorpus::from_ids(vec![vec![1, 2, 0]], 2).unwrap();
        let err = model.train(&corpus, 1, || false).unwrap_err();
        assert!(matches!(err, VaeGanError::ShapeMismatch { .. }));
    }

    #[test]
    fn stop_predicate_interrupts_between_steps() {
        let mut model = VaeGan::new(tiny_config(6)).unwrap();
        let corpus = TokenCorpus::from_ids(
            vec![vec![1, 2, 3, 0, 0, 0], vec![2, 1, 0, 0, 0, 0], vec![3, 3, 1, 2, 0, 0]],
            3,
        )
        .unwrap();
        let mut i_calls = 0;
        let summaries = model
            .train(&corpus, 5, || {
                i_calls += 1;
                i_calls > 4
            })
            .unwrap();
        assert_eq!(summaries.len(), 2);
        assert!(summaries[0].completed);
        assert!(!summaries[1].completed);
        assert_eq!(summaries[1].applied, 1);
        assert_eq!(model.state().epoch, 1);
        assert_eq!(model.state().applied_steps, 4);
    }

    #[test]
    fn batched_steps_cover_the_corpus() {
        let mut cfg = tiny_config(7);
        cfg.batch_size = 2;
        let mut model = VaeGan::new(cfg).unwrap();
        let corpus = TokenCorpus::from_ids(
            vec![vec![1, 2, 3, 0, 0, 0], vec![2, 1, 0, 0, 0, 0], vec![3, 3, 1, 2, 0, 0]],
            3,
        )
        .unwrap();
        let s = model.train_epoch(&corpus, &mut || false).unwrap();
        assert_eq!(s.applied, 2);
        assert!(all_finite(&model.generate(2)));
    }

    #[test]
    fn set_parameters_rejects_wrong_shapes() {
        let mut model = VaeGan::new(tiny_config(8)).unwrap();
        let mut other = tiny_config(8);
        other.seq_len = 9;
        let mut rng = StdRng::seed_from_u64(8);
        let wrong = ModelParameters::new(&other, &mut rng);
        assert!(model.set_parameters(wrong).is_err());
    }
}
