// math.rs
// ============================================================================
// Autor:   Marcus Schlieper (ExpChat.ai)
// Hinweis: Numerics: activations, reconstruction loss, adversarial losses
//          with probability clamping, finiteness checks.
// ============================================================================

#![forbid(unsafe_code)]

use ndarray::{Array2, Zip};

/// Lower clamp bound for probabilities before any logarithm. The upper bound
/// is `1 - PROB_EPS`; both are representable in f32.
pub const PROB_EPS: f32 = 1e-7;

// ---------------- Activations ----------------

pub fn relu(m: &Array2<f32>) -> Array2<f32> {
    m.mapv(|x| x.max(0.0))
}

/// Gradient through ReLU, given the pre-activation.
pub fn relu_backward(pre: &Array2<f32>, grad: &Array2<f32>) -> Array2<f32> {
    let mut out = grad.clone();
    Zip::from(&mut out).and(pre).for_each(|g, &x| {
        if x <= 0.0 {
            *g = 0.0;
        }
    });
    out
}

#[inline]
pub fn sigmoid_scalar(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

pub fn sigmoid(m: &Array2<f32>) -> Array2<f32> {
    m.mapv(sigmoid_scalar)
}

/// Gradient through the sigmoid, given its output.
pub fn sigmoid_backward(out: &Array2<f32>, grad: &Array2<f32>) -> Array2<f32> {
    let mut g = grad.clone();
    Zip::from(&mut g).and(out).for_each(|g, &y| *g *= y * (1.0 - y));
    g
}

// ---------------- Reconstruction loss ----------------

/// Mean squared error over all elements.
pub fn mse_loss(pred: &Array2<f32>, target: &Array2<f32>) -> f32 {
    assert_eq!(pred.dim(), target.dim(), "mse shape mismatch");
    let n = pred.len().max(1) as f32;
    let sum: f32 = pred.iter().zip(target.iter()).map(|(&p, &t)| (p - t) * (p - t)).sum();
    sum / n
}

pub fn mse_grad(pred: &Array2<f32>, target: &Array2<f32>) -> Array2<f32> {
    let n = pred.len().max(1) as f32;
    let mut g = pred - target;
    g.mapv_inplace(|d| 2.0 * d / n);
    g
}

// ---------------- Probability clamping ----------------

#[inline]
pub fn clamp_probability(p: f32) -> f32 {
    p.clamp(PROB_EPS, 1.0 - PROB_EPS)
}

/// 1 where the clamp is the identity (gradient passes), 0 where it saturates.
#[inline]
fn clamp_pass(p: f32) -> f32 {
    if (PROB_EPS..=1.0 - PROB_EPS).contains(&p) {
        1.0
    } else {
        0.0
    }
}

/// Discriminator objective `-mean(log p_real + log(1 - p_fake))` on clamped
/// scores. Returns the loss and its gradients w.r.t. the raw scores.
pub fn discriminator_loss(
    real: &Array2<f32>,
    fake: &Array2<f32>,
) -> (f32, Array2<f32>, Array2<f32>) {
    assert_eq!(real.dim(), fake.dim(), "score shape mismatch");
    let n = real.len().max(1) as f32;

    let mut d_loss = 0.0f32;
    for (&r, &f) in real.iter().zip(fake.iter()) {
        d_loss -= clamp_probability(r).ln() + (1.0 - clamp_probability(f)).ln();
    }
    d_loss /= n;

    let g_real = real.mapv(|r| -clamp_pass(r) / (n * clamp_probability(r)));
    let g_fake = fake.mapv(|f| clamp_pass(f) / (n * (1.0 - clamp_probability(f))));
    (d_loss, g_real, g_fake)
}

/// Generator objective `-mean(log p_fake)` on clamped scores, with its
/// gradient w.r.t. the raw scores.
pub fn generator_loss(fake: &Array2<f32>) -> (f32, Array2<f32>) {
    let n = fake.len().max(1) as f32;
    let g_loss = -fake.iter().map(|&f| clamp_probability(f).ln()).sum::<f32>() / n;
    let g_fake = fake.mapv(|f| -clamp_pass(f) / (n * clamp_probability(f)));
    (g_loss, g_fake)
}

// ---------------- Helpers ----------------

pub fn all_finite(m: &Array2<f32>) -> bool {
    m.iter().all(|x| x.is_finite())
}
