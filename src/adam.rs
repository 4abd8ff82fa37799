// adam.rs
// ============================================================================
// Autor:   Marcus Schlieper (ExpChat.ai)
// Hinweis: Adam-Optimierer je Matrix, ein Paar (Gewicht, Bias) je Dense-Layer.
// ============================================================================

#![forbid(unsafe_code)]               // Gewährleistet ausschließliche Nutzung von Safe Rust

// --- Externe Abhängigkeiten -----------------------------------------------
use bincode::{Decode, Encode};        // Binäre Serialisierung
use ndarray::{Array2, Zip};           // Dicht besetzte 2-D-Arrays
use serde::{Deserialize, Serialize};

use crate::layers::{Dense, DenseGrads};

// --- Datentyp --------------------------------------------------------------
/// Internal state of the Adam optimizer for one parameter matrix.
///
/// • `beta1`, `beta2` – decay rates of the first and second moment estimates
/// • `epsilon`        – keeps the denominator away from zero
/// • `timestep`       – number of applied steps (starts at 0)
/// • `m`, `v`         – first and second moment estimates
#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct Adam {
    beta1:    f32,
    beta2:    f32,
    epsilon:  f32,
    timestep: usize,

    #[bincode(with_serde)]
    pub m: Array2<f32>,
    #[bincode(with_serde)]
    pub v: Array2<f32>,
}

impl Adam {
    /// Zero moments, standard hyperparameters (β₁=0.9, β₂=0.999, ε=1e-8).
    pub fn new(shape: (usize, usize)) -> Self {
        Self {
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            timestep: 0,
            m: Array2::zeros(shape),
            v: Array2::zeros(shape),
        }
    }

    pub fn timestep(&self) -> usize {
        self.timestep
    }

    /// One update θ ← θ − α·m̂_t /(√v̂_t + ε).
    ///
    /// `grads` is consumed as-is: nothing is accumulated between calls, so
    /// every step starts from a cleared gradient.
    pub fn step(&mut self, params: &mut Array2<f32>, grads: &Array2<f32>, lr: f32) {
        assert_eq!(params.dim(), grads.dim(), "adam: gradient shape mismatch");
        self.timestep += 1;

        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);

        // m_t = β₁·m_{t-1} + (1 − β₁)·g_t ,  v_t = β₂·v_{t-1} + (1 − β₂)·g_t²
        Zip::from(&mut self.m).and(grads).for_each(|m, &g| *m = b1 * *m + (1.0 - b1) * g);
        Zip::from(&mut self.v).and(grads).for_each(|v, &g| *v = b2 * *v + (1.0 - b2) * g * g);

        // Bias-Korrektur
        let bias_c1 = 1.0 - b1.powi(self.timestep as i32);
        let bias_c2 = 1.0 - b2.powi(self.timestep as i32);

        Zip::from(params).and(&self.m).and(&self.v).for_each(|w, &m, &v| {
            let m_hat = m / bias_c1;
            let v_hat = v / bias_c2;
            *w -= lr * m_hat / (v_hat.sqrt() + eps);
        });
    }
}

/// Adam state for one dense layer (weight and bias).
#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct DenseAdam {
    pub w: Adam,
    pub b: Adam,
}

impl DenseAdam {
    pub fn for_layer(layer: &Dense) -> Self {
        Self { w: Adam::new(layer.w.dim()), b: Adam::new(layer.b.dim()) }
    }

    pub fn step(&mut self, layer: &mut Dense, grads: &DenseGrads, lr: f32) {
        self.w.step(&mut layer.w, &grads.w, lr);
        self.b.step(&mut layer.b, &grads.b, lr);
    }
}
