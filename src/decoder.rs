// decoder.rs
// ============================================================================
// Autor:   Marcus Schlieper (ExpChat.ai)
// Hinweis: Sequence decoder (the generator of the GAN half):
//
//              h     = relu(z · W1 + b1)
//              recon = sigmoid(h · W2 + b2)      each component in [0, 1]
// Historie:
//  - 2026-02-02: Erste Version.
// ============================================================================

#![forbid(unsafe_code)]

use bincode::{Decode, Encode};
use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::adam::DenseAdam;
use crate::latent::LatentVector;
use crate::layers::{Dense, DenseCache, DenseGrads};
use crate::math::{relu, relu_backward, sigmoid, sigmoid_backward};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct DecoderParams {
    pub fc1: Dense,
    pub fc2: Dense,
}

impl DecoderParams {
    pub fn new<R: Rng>(latent_dim: usize, hidden_dim: usize, seq_len: usize, rng: &mut R) -> Self {
        Self {
            fc1: Dense::new(latent_dim, hidden_dim, rng),
            fc2: Dense::new(hidden_dim, seq_len, rng),
        }
    }

    pub fn latent_dim(&self) -> usize {
        self.fc1.input_dim()
    }

    pub fn output_dim(&self) -> usize {
        self.fc2.output_dim()
    }

    pub fn parameter_count(&self) -> usize {
        self.fc1.parameter_count() + self.fc2.parameter_count()
    }

    pub fn decode(&self, z: &LatentVector) -> Array2<f32> {
        let h = relu(&self.fc1.apply(&z.z));
        sigmoid(&self.fc2.apply(&h))
    }

    pub fn decode_tracked(&self, z: &LatentVector) -> (Array2<f32>, DecoderGraph) {
        let (h_pre, fc1) = self.fc1.forward(&z.z);
        let h = relu(&h_pre);
        let (logits, fc2) = self.fc2.forward(&h);
        let recon = sigmoid(&logits);
        (recon.clone(), DecoderGraph { fc1, h_pre, fc2, recon })
    }
}

#[derive(Clone, Debug)]
pub struct DecoderGraph {
    fc1: DenseCache,
    h_pre: Array2<f32>,
    fc2: DenseCache,
    recon: Array2<f32>,
}

impl DecoderGraph {
    pub fn reconstruction(&self) -> &Array2<f32> {
        &self.recon
    }

    pub fn backward(&self, d_recon: &Array2<f32>) -> DecoderGrads {
        let d_logits = sigmoid_backward(&self.recon, d_recon);
        let g_fc2 = self.fc2.backward(&d_logits);
        let d_h_pre = relu_backward(&self.h_pre, &g_fc2.input);
        let g_fc1 = self.fc1.backward(&d_h_pre);
        let d_z = g_fc1.input.clone();
        DecoderGrads { fc1: g_fc1, fc2: g_fc2, d_z }
    }
}

#[derive(Clone, Debug)]
pub struct DecoderGrads {
    pub fc1: DenseGrads,
    pub fc2: DenseGrads,
    /// Gradient w.r.t. the latent input, handed on to the sampler.
    pub d_z: Array2<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct DecoderAdam {
    fc1: DenseAdam,
    fc2: DenseAdam,
}

impl DecoderAdam {
    /// Number of Adam steps applied so far.
    pub fn steps(&self) -> usize {
        self.fc1.w.timestep()
    }

    pub fn new(params: &DecoderParams) -> Self {
        Self { fc1: DenseAdam::for_layer(&params.fc1), fc2: DenseAdam::for_layer(&params.fc2) }
    }

    pub fn step(&mut self, params: &mut DecoderParams, grads: &DecoderGrads, lr: f32) {
        self.fc1.step(&mut params.fc1, &grads.fc1, lr);
        self.fc2.step(&mut params.fc2, &grads.fc2, lr);
    }
}
