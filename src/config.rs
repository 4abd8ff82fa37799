// config.rs
// ============================================================================
// Autor:   Marcus Schlieper (ExpChat.ai)
// Hinweis: Central hyperparameters for the VAE+GAN model. One record, one
//          place for all defaults, optionally overridden from a JSON file.
// Historie:
//  - 2026-02-02: Replaced the constant block with a serializable record.
//  - 2026-02-03: Added validation and JSON loading.
// ============================================================================

#![forbid(unsafe_code)]

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::VaeGanError;

// Documented defaults
pub const SEQ_LEN: usize = 50; // padded token sequence length
pub const LATENT_DIM: usize = 128; // dimension of the latent space
pub const HIDDEN_DIM: usize = 256; // width of every hidden layer
pub const LEARN_RATE: f32 = 2e-4;
pub const EPOCHS: usize = 10;
pub const BATCH_SIZE: usize = 1; // one example per step
pub const SAMPLE_COUNT: usize = 5; // default request of the sampler

/// Model and training configuration.
///
/// Every field is supplied by the caller; `Default` only fills in the
/// documented values above.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub seq_len: usize,
    pub latent_dim: usize,
    pub hidden_dim: usize,
    pub learning_rate: f32,
    pub epochs: usize,
    pub batch_size: usize,
    /// Seed for parameter initialisation and all noise draws.
    /// `None` seeds from the operating system.
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            seq_len: SEQ_LEN,
            latent_dim: LATENT_DIM,
            hidden_dim: HIDDEN_DIM,
            learning_rate: LEARN_RATE,
            epochs: EPOCHS,
            batch_size: BATCH_SIZE,
            seed: None,
        }
    }
}

impl ModelConfig {
    /// Rejects configurations the model cannot be built from.
    pub fn validate(&self) -> Result<(), VaeGanError> {
        if self.seq_len == 0 {
            return Err(VaeGanError::InvalidConfig("seq_len must be > 0".into()));
        }
        if self.latent_dim == 0 {
            return Err(VaeGanError::InvalidConfig("latent_dim must be > 0".into()));
        }
        if self.hidden_dim == 0 {
            return Err(VaeGanError::InvalidConfig("hidden_dim must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(VaeGanError::InvalidConfig("batch_size must be > 0".into()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(VaeGanError::InvalidConfig(format!(
                "learning_rate must be finite and > 0, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }

    pub fn load(s_path: impl AsRef<Path>) -> Result<Self> {
        let p = s_path.as_ref();
        let s_json = fs::read_to_string(p)
            .with_context(|| format!("cannot read config {}", p.display()))?;
        let cfg: ModelConfig = serde_json::from_str(&s_json)
            .with_context(|| format!("cannot parse config {}", p.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn save(&self, s_path: impl AsRef<Path>) -> Result<()> {
        let p = s_path.as_ref();
        let s_json = serde_json::to_string_pretty(self)?;
        fs::write(p, s_json).with_context(|| format!("cannot write config {}", p.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ModelConfig::default();
        assert_eq!(cfg.latent_dim, 128);
        assert_eq!(cfg.hidden_dim, 256);
        assert_eq!(cfg.seq_len, 50);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = ModelConfig::default();
        cfg.latent_dim = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = ModelConfig::default();
        cfg.learning_rate = f32::NAN;
        assert!(cfg.validate().is_err());

        let mut cfg = ModelConfig::default();
        cfg.batch_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: ModelConfig = serde_json::from_str(r#"{ "latent_dim": 8, "seed": 7 }"#).unwrap();
        assert_eq!(cfg.latent_dim, 8);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.hidden_dim, HIDDEN_DIM);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let cfg = ModelConfig { latent_dim: 4, hidden_dim: 8, seed: Some(1), ..Default::default() };
        cfg.save(&path).unwrap();
        assert_eq!(ModelConfig::load(&path).unwrap(), cfg);
    }
}
