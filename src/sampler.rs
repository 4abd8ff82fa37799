// sampler.rs
// ============================================================================
// Autor:   Marcus Schlieper (ExpChat.ai)
// Hinweis: Inference path: prior noise through the decoder. No gradient
//          tracking, no parameter change.
// Historie:
//  - 2026-02-03: Erste Version.
// ============================================================================

#![forbid(unsafe_code)]

use ndarray::Array2;
use rand::Rng;

use crate::decoder::DecoderParams;
use crate::latent::sample_prior;

/// Decodes `n` draws from N(0, I) into `[n, seq_len]` vectors in [0, 1].
pub fn generate<R: Rng>(decoder: &DecoderParams, n: usize, rng: &mut R) -> Array2<f32> {
    let z = sample_prior(rng, n, decoder.latent_dim());
    decoder.decode(&z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn returns_exactly_n_rows() {
        let mut rng = StdRng::seed_from_u64(11);
        let dec = DecoderParams::new(4, 8, 12, &mut rng);
        let out = generate(&dec, 5, &mut rng);
        assert_eq!(out.dim(), (5, 12));
        assert!(out.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn zero_samples_is_empty() {
        let mut rng = StdRng::seed_from_u64(11);
        let dec = DecoderParams::new(4, 8, 12, &mut rng);
        assert_eq!(generate(&dec, 0, &mut rng).nrows(), 0);
    }
}
