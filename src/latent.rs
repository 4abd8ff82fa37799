// latent.rs
// ============================================================================
// Autor:   Marcus Schlieper (ExpChat.ai)
// Hinweis: Latent space: Gaussian parameters, reparameterised sampling,
//          KL regulariser against N(0, I), prior sampling.
// Historie:
//  - 2026-02-02: Erste Version.
// ============================================================================

#![forbid(unsafe_code)]

use ndarray::{Array2, Zip};
use rand::Rng;
use rand_distr::StandardNormal;

/// Mean and log-variance of the approximate posterior, `[batch, latent_dim]`.
#[derive(Clone, Debug, PartialEq)]
pub struct LatentParams {
    pub mu: Array2<f32>,
    pub logvar: Array2<f32>,
}

impl LatentParams {
    pub fn latent_dim(&self) -> usize {
        self.mu.ncols()
    }
}

/// A point in latent space, `[batch, latent_dim]`.
#[derive(Clone, Debug, PartialEq)]
pub struct LatentVector {
    pub z: Array2<f32>,
}

impl LatentVector {
    pub fn dim(&self) -> usize {
        self.z.ncols()
    }
}

/// The noise draw behind one reparameterised sample. Treated as a constant:
/// gradients flow through it to `mu` and `logvar`, never into it.
#[derive(Clone, Debug)]
pub struct LatentNoise {
    eps: Array2<f32>,
    std: Array2<f32>,
}

impl LatentNoise {
    pub fn eps(&self) -> &Array2<f32> {
        &self.eps
    }

    /// d_mu = d_z ,  d_logvar = d_z · eps · 0.5 · exp(0.5·logvar)
    pub fn backward(&self, d_z: &Array2<f32>) -> (Array2<f32>, Array2<f32>) {
        let d_mu = d_z.clone();
        let mut d_logvar = d_z.clone();
        Zip::from(&mut d_logvar)
            .and(&self.eps)
            .and(&self.std)
            .for_each(|d, &e, &s| *d *= e * 0.5 * s);
        (d_mu, d_logvar)
    }
}

pub fn standard_normal<R: Rng>(rng: &mut R, shape: (usize, usize)) -> Array2<f32> {
    Array2::from_shape_simple_fn(shape, || rng.sample::<f32, _>(StandardNormal))
}

/// z = mu + exp(0.5·logvar)·eps with a fresh eps ~ N(0, I) per call and
/// per component.
pub fn reparameterize<R: Rng>(params: &LatentParams, rng: &mut R) -> (LatentVector, LatentNoise) {
    assert_eq!(params.mu.dim(), params.logvar.dim(), "mu/logvar shape mismatch");
    let eps = standard_normal(rng, params.mu.dim());
    let std = params.logvar.mapv(|l| (0.5 * l).exp());
    let z = &params.mu + &(&std * &eps);
    (LatentVector { z }, LatentNoise { eps, std })
}

/// Draws `n` latent vectors from the prior N(0, I).
pub fn sample_prior<R: Rng>(rng: &mut R, n: usize, latent_dim: usize) -> LatentVector {
    LatentVector { z: standard_normal(rng, (n, latent_dim)) }
}

/// KL(q || N(0, I)) = -0.5 · Σ (1 + logvar − mu² − exp(logvar)), summed over
/// all latent dimensions and rows.
pub fn kl_divergence(params: &LatentParams) -> f32 {
    let mut d_sum = 0.0f32;
    Zip::from(&params.mu).and(&params.logvar).for_each(|&m, &l| {
        d_sum += 1.0 + l - m * m - l.exp();
    });
    -0.5 * d_sum
}

/// Gradient of [`kl_divergence`]: (mu, 0.5·(exp(logvar) − 1)).
pub fn kl_grad(params: &LatentParams) -> (Array2<f32>, Array2<f32>) {
    let d_mu = params.mu.clone();
    let d_logvar = params.logvar.mapv(|l| 0.5 * (l.exp() - 1.0));
    (d_mu, d_logvar)
}
