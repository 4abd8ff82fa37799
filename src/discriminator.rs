// discriminator.rs
// ============================================================================
// Autor:   Marcus Schlieper (ExpChat.ai)
// Hinweis: Discriminator: probability that a fixed-length vector is a real
//          corpus sequence rather than a reconstruction.
//
//              h = relu(x · W1 + b1)
//              p = sigmoid(h · W2 + b2)          one score per row
//
//          Two forward variants: `score` computes values only, while
//          `score_tracked` keeps a graph. The graph hands out parameter
//          gradients and input gradients separately, so every caller
//          states which side of the network its objective may reach.
// Historie:
//  - 2026-02-02: Erste Version.
// ============================================================================

#![forbid(unsafe_code)]

use bincode::{Decode, Encode};
use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::adam::DenseAdam;
use crate::layers::{Dense, DenseCache, DenseGrads};
use crate::math::{relu, relu_backward, sigmoid, sigmoid_backward};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct DiscriminatorParams {
    pub fc1: Dense,
    pub fc2: Dense,
}

impl DiscriminatorParams {
    pub fn new<R: Rng>(seq_len: usize, hidden_dim: usize, rng: &mut R) -> Self {
        Self { fc1: Dense::new(seq_len, hidden_dim, rng), fc2: Dense::new(hidden_dim, 1, rng) }
    }

    pub fn input_dim(&self) -> usize {
        self.fc1.input_dim()
    }

    pub fn parameter_count(&self) -> usize {
        self.fc1.parameter_count() + self.fc2.parameter_count()
    }

    /// Scores without gradient tracking, `[batch, 1]`.
    pub fn score(&self, x: &Array2<f32>) -> Array2<f32> {
        let h = relu(&self.fc1.apply(x));
        sigmoid(&self.fc2.apply(&h))
    }

    /// Scores with a retained graph for a later backward pass.
    pub fn score_tracked(&self, x: &Array2<f32>) -> (Array2<f32>, DiscriminatorGraph) {
        let (h_pre, fc1) = self.fc1.forward(x);
        let h = relu(&h_pre);
        let (logits, fc2) = self.fc2.forward(&h);
        let p = sigmoid(&logits);
        (p.clone(), DiscriminatorGraph { fc1, h_pre, fc2, p })
    }
}

#[derive(Clone, Debug)]
pub struct DiscriminatorGraph {
    fc1: DenseCache,
    h_pre: Array2<f32>,
    fc2: DenseCache,
    p: Array2<f32>,
}

impl DiscriminatorGraph {
    /// Gradients w.r.t. the discriminator's own parameters. The input is
    /// treated as a constant.
    pub fn param_grads(&self, d_score: &Array2<f32>) -> DiscriminatorGrads {
        let d_logits = sigmoid_backward(&self.p, d_score);
        let g_fc2 = self.fc2.backward(&d_logits);
        let d_h_pre = relu_backward(&self.h_pre, &g_fc2.input);
        let g_fc1 = self.fc1.backward(&d_h_pre);
        DiscriminatorGrads { fc1: g_fc1, fc2: g_fc2 }
    }

    /// Gradient w.r.t. the scored input only; the parameters receive none.
    pub fn input_grad(&self, d_score: &Array2<f32>) -> Array2<f32> {
        let d_logits = sigmoid_backward(&self.p, d_score);
        let d_h = self.fc2.backward_input(&d_logits);
        let d_h_pre = relu_backward(&self.h_pre, &d_h);
        self.fc1.backward_input(&d_h_pre)
    }
}

#[derive(Clone, Debug)]
pub struct DiscriminatorGrads {
    pub fc1: DenseGrads,
    pub fc2: DenseGrads,
}

impl DiscriminatorGrads {
    /// Sums the parameter gradients of two passes through the same weights.
    pub fn merge(mut self, other: &DiscriminatorGrads) -> Self {
        self.fc1.w += &other.fc1.w;
        self.fc1.b += &other.fc1.b;
        self.fc2.w += &other.fc2.w;
        self.fc2.b += &other.fc2.b;
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct DiscriminatorAdam {
    fc1: DenseAdam,
    fc2: DenseAdam,
}

impl DiscriminatorAdam {
    /// Number of Adam steps applied so far.
    pub fn steps(&self) -> usize {
        self.fc1.w.timestep()
    }

    pub fn new(params: &DiscriminatorParams) -> Self {
        Self { fc1: DenseAdam::for_layer(&params.fc1), fc2: DenseAdam::for_layer(&params.fc2) }
    }

    pub fn step(&mut self, params: &mut DiscriminatorParams, grads: &DiscriminatorGrads, lr: f32) {
        self.fc1.step(&mut params.fc1, &grads.fc1, lr);
        self.fc2.step(&mut params.fc2, &grads.fc2, lr);
    }
}
