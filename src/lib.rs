// lib.rs
// ============================================================================
// Autor:   Marcus Schlieper (ExpChat.ai)
// Hinweis: VAE+GAN über tokenisierte SMILES-Sequenzen.
// ============================================================================
pub mod adam;
pub mod checkpoint;
pub mod config;
pub mod dataset_loader;
pub mod decoder;
pub mod discriminator;
pub mod encoder;
pub mod error;
pub mod latent;
pub mod layers;
pub mod math;
pub mod sampler;
pub mod tokenize;
pub mod train;

// Re-export key structs for easier access
pub use config::ModelConfig;
pub use dataset_loader::{Dataset, DatasetType};
pub use error::VaeGanError;
pub use latent::{LatentParams, LatentVector};
pub use tokenize::{SmilesTokenizer, TokenCorpus};
pub use train::{EpochSummary, ModelParameters, SkipReason, StepLosses, StepOutcome, VaeGan};
