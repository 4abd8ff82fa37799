// checkpoint.rs
// ============================================================================
// Autor:   Marcus Schlieper (ExpChat.ai)
// Hinweis: Persistence of the three parameter sets. One directory holds
//          encoder.bin, decoder.bin, discriminator.bin (bincode, standard
//          config), config.json and, when the model was trained on a
//          tokenized corpus, tokenizer.json. Optimizer moments are not
//          stored; a restored model starts with fresh Adam state.
// Historie:
//  - 2026-02-04: Erste Version.
//  - 2026-02-06: tokenizer.json neben den Parametern.
// ============================================================================

#![forbid(unsafe_code)]

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use bincode::{config, decode_from_std_read, encode_into_std_write, Decode, Encode};
use tracing::info;

use crate::config::ModelConfig;
use crate::error::VaeGanError;
use crate::tokenize::SmilesTokenizer;
use crate::train::{ModelParameters, VaeGan};

pub const ENCODER_FILE: &str = "encoder.bin";
pub const DECODER_FILE: &str = "decoder.bin";
pub const DISCRIMINATOR_FILE: &str = "discriminator.bin";
pub const CONFIG_FILE: &str = "config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

fn write_bin<T: Encode>(value: &T, path: &Path) -> Result<()> {
    let f = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut w = BufWriter::with_capacity(8 * 1024 * 1024, f); // 8 MB
    encode_into_std_write(value, &mut w, config::standard())
        .with_context(|| format!("cannot encode {}", path.display()))?;
    w.flush()?;
    Ok(())
}

fn read_bin<T: Decode<()>>(path: &Path) -> Result<T> {
    let f = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut r = BufReader::with_capacity(8 * 1024 * 1024, f);
    decode_from_std_read(&mut r, config::standard())
        .with_context(|| format!("cannot decode {}", path.display()))
}

fn write_tokenizer(tokenizer: Option<&SmilesTokenizer>, path: &Path) -> Result<()> {
    match tokenizer {
        Some(tok) => {
            let s_json = serde_json::to_string_pretty(tok)?;
            fs::write(path, s_json).with_context(|| format!("cannot write {}", path.display()))?;
        }
        // a stale alphabet must not outlive the parameters it belonged to
        None if path.exists() => {
            fs::remove_file(path).with_context(|| format!("cannot remove {}", path.display()))?;
        }
        None => {}
    }
    Ok(())
}

fn read_tokenizer(path: &Path, cfg: &ModelConfig) -> Result<Option<SmilesTokenizer>> {
    if !path.exists() {
        return Ok(None);
    }
    let s_json = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let tok: SmilesTokenizer = serde_json::from_str(&s_json)
        .with_context(|| format!("cannot parse {}", path.display()))?;
    if tok.max_len() != cfg.seq_len {
        return Err(VaeGanError::ShapeMismatch {
            what: "tokenizer max_len",
            expected: cfg.seq_len,
            actual: tok.max_len(),
        })
        .with_context(|| format!("{} does not fit the model", path.display()));
    }
    Ok(Some(tok))
}

/// Writes all parameter sets, the configuration and the tokenizer the model
/// was trained with into `dir`, creating it if needed.
pub fn save_models(model: &VaeGan, tokenizer: Option<&SmilesTokenizer>, dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;

    let params = model.params();
    write_bin(&params.encoder, &dir.join(ENCODER_FILE))?;
    write_bin(&params.decoder, &dir.join(DECODER_FILE))?;
    write_bin(&params.discriminator, &dir.join(DISCRIMINATOR_FILE))?;
    model.config().save(dir.join(CONFIG_FILE))?;
    write_tokenizer(tokenizer, &dir.join(TOKENIZER_FILE))?;

    info!(dir = %dir.display(), parameters = params.total_parameters(), "models saved");
    Ok(())
}

fn read_parameters(dir: &Path) -> Result<ModelParameters> {
    if !dir.is_dir() {
        bail!("checkpoint directory {} does not exist", dir.display());
    }
    Ok(ModelParameters {
        encoder: read_bin(&dir.join(ENCODER_FILE))?,
        decoder: read_bin(&dir.join(DECODER_FILE))?,
        discriminator: read_bin(&dir.join(DISCRIMINATOR_FILE))?,
    })
}

/// Replaces the parameters of `model` with those stored in `dir` and returns
/// the stored tokenizer, if any. Shapes must match the model's
/// configuration; optimizer state is reset. On error the model is unchanged.
pub fn load_models(model: &mut VaeGan, dir: impl AsRef<Path>) -> Result<Option<SmilesTokenizer>> {
    let dir = dir.as_ref();
    let params = read_parameters(dir)?;
    let tokenizer = read_tokenizer(&dir.join(TOKENIZER_FILE), model.config())?;
    model
        .set_parameters(params)
        .with_context(|| format!("checkpoint {} does not fit the model", dir.display()))?;
    info!(dir = %dir.display(), tokenizer = tokenizer.is_some(), "models loaded");
    Ok(tokenizer)
}

/// Builds a model from the stored configuration and parameters, together
/// with the stored tokenizer.
pub fn restore(dir: impl AsRef<Path>) -> Result<(VaeGan, Option<SmilesTokenizer>)> {
    let dir = dir.as_ref();
    let cfg = ModelConfig::load(dir.join(CONFIG_FILE))?;
    let mut model = VaeGan::new(cfg)?;
    let tokenizer = load_models(&mut model, dir)?;
    Ok((model, tokenizer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn small(seed: u64, seq_len: usize) -> VaeGan {
        VaeGan::new(ModelConfig {
            seq_len,
            latent_dim: 3,
            hidden_dim: 6,
            seed: Some(seed),
            ..ModelConfig::default()
        })
        .unwrap()
    }

    fn tokenizer(max_len: usize) -> SmilesTokenizer {
        let v: Vec<String> = ["CCO", "c1ccccc1", "CN(C)C=O"].iter().map(|s| s.to_string()).collect();
        SmilesTokenizer::fit(&v, Some(max_len)).unwrap()
    }

    #[test]
    fn save_then_load_restores_identical_parameters() {
        let dir = tempdir().unwrap();
        let saved = small(1, 5);
        save_models(&saved, None, dir.path()).unwrap();
        for f in [ENCODER_FILE, DECODER_FILE, DISCRIMINATOR_FILE, CONFIG_FILE] {
            assert!(dir.path().join(f).is_file());
        }
        assert!(!dir.path().join(TOKENIZER_FILE).exists());

        let mut other = small(2, 5);
        assert_ne!(other.params(), saved.params());
        assert!(load_models(&mut other, dir.path()).unwrap().is_none());
        assert_eq!(other.params(), saved.params());

        let (restored, tok) = restore(dir.path()).unwrap();
        assert!(tok.is_none());
        assert_eq!(restored.params(), saved.params());
        assert_eq!(restored.config(), saved.config());
    }

    #[test]
    fn tokenizer_travels_with_the_parameters() {
        let dir = tempdir().unwrap();
        let tok = tokenizer(5);
        save_models(&small(1, 5), Some(&tok), dir.path()).unwrap();

        let mut other = small(2, 5);
        let loaded = load_models(&mut other, dir.path()).unwrap();
        assert_eq!(loaded.as_ref(), Some(&tok));
        assert_eq!(loaded.map(|t| t.alphabet_size()), Some(tok.alphabet_size()));

        let (_, restored) = restore(dir.path()).unwrap();
        assert_eq!(restored, Some(tok));

        // saving without a tokenizer drops the old alphabet
        save_models(&small(3, 5), None, dir.path()).unwrap();
        assert!(!dir.path().join(TOKENIZER_FILE).exists());
    }

    #[test]
    fn tokenizer_of_other_length_is_rejected() {
        let dir = tempdir().unwrap();
        save_models(&small(1, 5), Some(&tokenizer(9)), dir.path()).unwrap();
        let mut m = small(2, 5);
        let before = m.params().clone();
        assert!(load_models(&mut m, dir.path()).is_err());
        assert_eq!(m.params(), &before);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let mut m = small(1, 5);
        assert!(load_models(&mut m, dir.path().join("nope")).is_err());
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let dir = tempdir().unwrap();
        save_models(&small(1, 5), None, dir.path()).unwrap();
        let mut m = small(1, 7);
        let before = m.params().clone();
        assert!(load_models(&mut m, dir.path()).is_err());
        assert_eq!(m.params(), &before);
    }
}
