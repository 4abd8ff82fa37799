// layers.rs
// ============================================================================
// Autor:   Marcus Schlieper (ExpChat.ai)
// Hinweis: Dense (fully connected) layer as a plain parameter struct with
//          pure forward functions. Parameters and optimizer state are kept
//          apart; the tracked forward returns a cache that owns everything
//          its backward pass needs.
// Historie:
//  - 2026-02-02: Split parameters from optimizer state, explicit caches.
// ============================================================================

#![forbid(unsafe_code)]

use bincode::{Decode, Encode};
use ndarray::{Array2, Axis};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Dense
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Dense {
    #[bincode(with_serde)]
    pub w: Array2<f32>, // [in, out]
    #[bincode(with_serde)]
    pub b: Array2<f32>, // [1, out]
}

impl Dense {
    /// He initialisation for the weights, zero bias.
    pub fn new<R: Rng>(i_in: usize, i_out: usize, rng: &mut R) -> Self {
        let std = (2.0 / i_in as f32).sqrt();
        Self {
            w: Array2::from_shape_simple_fn((i_in, i_out), || std * rng.sample::<f32, _>(StandardNormal)),
            b: Array2::zeros((1, i_out)),
        }
    }

    pub fn input_dim(&self) -> usize {
        self.w.nrows()
    }

    pub fn output_dim(&self) -> usize {
        self.w.ncols()
    }

    pub fn parameter_count(&self) -> usize {
        self.w.len() + self.b.len()
    }

    /// Value only, nothing retained.
    pub fn apply(&self, x: &Array2<f32>) -> Array2<f32> {
        x.dot(&self.w) + &self.b
    }

    /// Forward pass that keeps its operands for a later backward pass.
    ///
    /// The cache holds a snapshot of the weight, so the backward pass stays
    /// valid after the parameters have been updated in place.
    pub fn forward(&self, x: &Array2<f32>) -> (Array2<f32>, DenseCache) {
        let y = self.apply(x);
        (y, DenseCache { input: x.clone(), weight: self.w.clone() })
    }
}

#[derive(Clone, Debug)]
pub struct DenseCache {
    input: Array2<f32>,
    weight: Array2<f32>,
}

impl DenseCache {
    /// grad_w = xᵀ·g, grad_b = Σ_rows g, grad_x = g·Wᵀ
    pub fn backward(&self, grad_out: &Array2<f32>) -> DenseGrads {
        DenseGrads {
            w: self.input.t().dot(grad_out),
            b: grad_out.sum_axis(Axis(0)).insert_axis(Axis(0)),
            input: grad_out.dot(&self.weight.t()),
        }
    }

    /// Only the gradient w.r.t. the layer input.
    pub fn backward_input(&self, grad_out: &Array2<f32>) -> Array2<f32> {
        grad_out.dot(&self.weight.t())
    }
}

#[derive(Clone, Debug)]
pub struct DenseGrads {
    pub w: Array2<f32>,
    pub b: Array2<f32>,
    pub input: Array2<f32>,
}
