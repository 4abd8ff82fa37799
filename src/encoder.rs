// encoder.rs
// ============================================================================
// Autor:   Marcus Schlieper (ExpChat.ai)
// Hinweis: Sequence encoder. Maps a normalised token sequence to the
//          parameters of a diagonal Gaussian in latent space:
//
//              h      = relu(x · W1 + b1)
//              mu     = h · Wmu + bmu
//              logvar = h · Wlv + blv
// Historie:
//  - 2026-02-02: Erste Version.
// ============================================================================

#![forbid(unsafe_code)]

use bincode::{Decode, Encode};
use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::adam::DenseAdam;
use crate::latent::LatentParams;
use crate::layers::{Dense, DenseCache, DenseGrads};
use crate::math::{relu, relu_backward};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct EncoderParams {
    pub fc1: Dense,
    pub fc_mu: Dense,
    pub fc_logvar: Dense,
}

impl EncoderParams {
    pub fn new<R: Rng>(seq_len: usize, hidden_dim: usize, latent_dim: usize, rng: &mut R) -> Self {
        Self {
            fc1: Dense::new(seq_len, hidden_dim, rng),
            fc_mu: Dense::new(hidden_dim, latent_dim, rng),
            fc_logvar: Dense::new(hidden_dim, latent_dim, rng),
        }
    }

    pub fn input_dim(&self) -> usize {
        self.fc1.input_dim()
    }

    pub fn latent_dim(&self) -> usize {
        self.fc_mu.output_dim()
    }

    pub fn parameter_count(&self) -> usize {
        self.fc1.parameter_count() + self.fc_mu.parameter_count() + self.fc_logvar.parameter_count()
    }

    pub fn encode(&self, x: &Array2<f32>) -> LatentParams {
        let h = relu(&self.fc1.apply(x));
        LatentParams { mu: self.fc_mu.apply(&h), logvar: self.fc_logvar.apply(&h) }
    }

    pub fn encode_tracked(&self, x: &Array2<f32>) -> (LatentParams, EncoderGraph) {
        let (h_pre, fc1) = self.fc1.forward(x);
        let h = relu(&h_pre);
        let (mu, fc_mu) = self.fc_mu.forward(&h);
        let (logvar, fc_logvar) = self.fc_logvar.forward(&h);
        (LatentParams { mu, logvar }, EncoderGraph { fc1, h_pre, fc_mu, fc_logvar })
    }
}

/// Retained forward state of one encoder pass.
#[derive(Clone, Debug)]
pub struct EncoderGraph {
    fc1: DenseCache,
    h_pre: Array2<f32>,
    fc_mu: DenseCache,
    fc_logvar: DenseCache,
}

impl EncoderGraph {
    pub fn backward(&self, d_mu: &Array2<f32>, d_logvar: &Array2<f32>) -> EncoderGrads {
        let g_mu = self.fc_mu.backward(d_mu);
        let g_logvar = self.fc_logvar.backward(d_logvar);
        let d_h = &g_mu.input + &g_logvar.input;
        let d_h_pre = relu_backward(&self.h_pre, &d_h);
        let g_fc1 = self.fc1.backward(&d_h_pre);
        EncoderGrads { fc1: g_fc1, fc_mu: g_mu, fc_logvar: g_logvar }
    }
}

#[derive(Clone, Debug)]
pub struct EncoderGrads {
    pub fc1: DenseGrads,
    pub fc_mu: DenseGrads,
    pub fc_logvar: DenseGrads,
}

#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct EncoderAdam {
    fc1: DenseAdam,
    fc_mu: DenseAdam,
    fc_logvar: DenseAdam,
}

impl EncoderAdam {
    /// Number of Adam steps applied so far.
    pub fn steps(&self) -> usize {
        self.fc1.w.timestep()
    }

    pub fn new(params: &EncoderParams) -> Self {
        Self {
            fc1: DenseAdam::for_layer(&params.fc1),
            fc_mu: DenseAdam::for_layer(&params.fc_mu),
            fc_logvar: DenseAdam::for_layer(&params.fc_logvar),
        }
    }

    pub fn step(&mut self, params: &mut EncoderParams, grads: &EncoderGrads, lr: f32) {
        self.fc1.step(&mut params.fc1, &grads.fc1, lr);
        self.fc_mu.step(&mut params.fc_mu, &grads.fc_mu, lr);
        self.fc_logvar.step(&mut params.fc_logvar, &grads.fc_logvar, lr);
    }
}
