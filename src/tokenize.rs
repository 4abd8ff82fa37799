// tokenize.rs
// ============================================================================
// Autor:   Marcus Schlieper (ExpChat.ai)
// Hinweis: Character level SMILES tokenizer and the fixed-length training
//          corpus built from it.
//            - alphabet: sorted distinct characters of the fitted strings
//            - ids:      1..=alphabet_size, 0 is the padding sentinel
//            - values:   id / alphabet_size, so every component is in [0, 1]
// Historie:
//  - 2026-02-03: Replaces the byte level BPE tokenizer for SMILES input.
// ============================================================================

#![forbid(unsafe_code)]

use ndarray::{Array2, ArrayView1, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::VaeGanError;

pub const PAD_ID: u32 = 0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmilesTokenizer {
    // sorted, unique; id = position + 1
    alphabet: Vec<char>,
    max_len: usize,
}

impl SmilesTokenizer {
    /// Builds the alphabet from `v_strings`. Without `max_len` the longest
    /// string (in characters) fixes the sequence length.
    pub fn fit(v_strings: &[String], max_len: Option<usize>) -> Result<Self, VaeGanError> {
        let mut alphabet: Vec<char> = v_strings.iter().flat_map(|s| s.chars()).collect();
        alphabet.sort_unstable();
        alphabet.dedup();
        if alphabet.is_empty() {
            return Err(VaeGanError::EmptyCorpus);
        }

        let i_max_len = match max_len {
            Some(n) => n,
            None => v_strings.iter().map(|s| s.chars().count()).max().unwrap_or(0),
        };
        if i_max_len == 0 {
            return Err(VaeGanError::InvalidConfig("max_len must be > 0".into()));
        }

        Ok(Self { alphabet, max_len: i_max_len })
    }

    pub fn alphabet_size(&self) -> usize {
        self.alphabet.len()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    pub fn token_id(&self, ch: char) -> u32 {
        match self.alphabet.binary_search(&ch) {
            Ok(i_pos) => i_pos as u32 + 1,
            Err(_) => PAD_ID,
        }
    }

    /// Exactly `max_len` ids: truncated, then right-padded with [`PAD_ID`].
    /// Characters outside the alphabet become padding.
    pub fn encode(&self, s_text: &str) -> Vec<u32> {
        let mut v_ids: Vec<u32> = s_text.chars().take(self.max_len).map(|c| self.token_id(c)).collect();
        v_ids.resize(self.max_len, PAD_ID);
        v_ids
    }

    /// Inverse of [`encode`](Self::encode) up to padding and truncation.
    pub fn decode_ids(&self, v_ids: &[u32]) -> String {
        v_ids
            .iter()
            .filter(|&&id| id != PAD_ID)
            .filter_map(|&id| self.alphabet.get(id as usize - 1))
            .collect()
    }

    /// Tokenizes all strings in parallel; row order follows `v_strings`.
    pub fn build_corpus(&self, v_strings: &[String]) -> Result<TokenCorpus, VaeGanError> {
        let v_ids: Vec<Vec<u32>> = v_strings.par_iter().map(|s| self.encode(s)).collect();
        TokenCorpus::from_ids(v_ids, self.alphabet_size())
    }
}

/// Fixed-length, normalized training sequences, `[n_examples, seq_len]`.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenCorpus {
    data: Array2<f32>,
    ids: Vec<Vec<u32>>,
    alphabet_size: Option<usize>,
}

impl TokenCorpus {
    /// Normalizes equally long id rows by `alphabet_size`.
    pub fn from_ids(v_ids: Vec<Vec<u32>>, alphabet_size: usize) -> Result<Self, VaeGanError> {
        let Some(first) = v_ids.first() else {
            return Err(VaeGanError::EmptyCorpus);
        };
        if alphabet_size == 0 {
            return Err(VaeGanError::InvalidConfig("alphabet_size must be > 0".into()));
        }
        let i_seq_len = first.len();
        if i_seq_len == 0 {
            return Err(VaeGanError::InvalidConfig("sequences must not be empty".into()));
        }

        let mut v_flat: Vec<f32> = Vec::with_capacity(v_ids.len() * i_seq_len);
        for v_row in &v_ids {
            if v_row.len() != i_seq_len {
                return Err(VaeGanError::ShapeMismatch {
                    what: "corpus row length",
                    expected: i_seq_len,
                    actual: v_row.len(),
                });
            }
            for &id in v_row {
                if id as usize > alphabet_size {
                    return Err(VaeGanError::TokenOutOfRange { id, alphabet_size });
                }
                v_flat.push(id as f32 / alphabet_size as f32);
            }
        }

        let data = Array2::from_shape_vec((v_ids.len(), i_seq_len), v_flat).map_err(|_| {
            VaeGanError::ShapeMismatch { what: "corpus", expected: i_seq_len, actual: 0 }
        })?;
        Ok(Self { data, ids: v_ids, alphabet_size: Some(alphabet_size) })
    }

    /// Wraps rows that are already normalized by an external tokenizer.
    /// Values are taken as they are.
    pub fn from_normalized(data: Array2<f32>) -> Result<Self, VaeGanError> {
        if data.nrows() == 0 {
            return Err(VaeGanError::EmptyCorpus);
        }
        if data.ncols() == 0 {
            return Err(VaeGanError::InvalidConfig("sequences must not be empty".into()));
        }
        Ok(Self { data, ids: Vec::new(), alphabet_size: None })
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    /// Raw ids; empty for corpora built with [`from_normalized`](Self::from_normalized).
    pub fn ids(&self) -> &[Vec<u32>] {
        &self.ids
    }

    pub fn alphabet_size(&self) -> Option<usize> {
        self.alphabet_size
    }

    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    pub fn seq_len(&self) -> usize {
        self.data.ncols()
    }

    pub fn row(&self, i_index: usize) -> Option<ArrayView1<'_, f32>> {
        (i_index < self.len()).then(|| self.data.index_axis(Axis(0), i_index))
    }
}
