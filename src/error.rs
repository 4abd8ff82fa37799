// error.rs
// ============================================================================
// Autor:   Marcus Schlieper (ExpChat.ai)
// Hinweis: Typed errors of the library. I/O boundaries wrap these into
//          anyhow with context.
// ============================================================================

#![forbid(unsafe_code)]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaeGanError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("corpus is empty")]
    EmptyCorpus,

    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("token id {id} outside alphabet of size {alphabet_size}")]
    TokenOutOfRange { id: u32, alphabet_size: usize },
}
