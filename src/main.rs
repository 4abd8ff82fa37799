// main.rs
// ============================================================================
// Autor:   Marcus Schlieper (ExpChat.ai)
// Hinweis: Einstiegspunkt der Anwendung mit interaktivem Menü.
// Historie:
//  - 2025-11-22: Erste Version mit interaktivem Menü.
//  - 2026-02-04: Umstellung auf VAE+GAN über SMILES-Sequenzen.
//  - 2026-02-06: Tokenizer im Checkpoint, Epochen-Vorgabe aus der Konfiguration.
// ============================================================================
//
// Aufruf: molvaegan [korpus-datei] [config.json]
// Log-Level über RUST_LOG (Standard: info).

#![forbid(unsafe_code)]

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering as AtomicOrdering},
        Arc,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use molvaegan::{
    checkpoint::{load_models, save_models},
    config::SAMPLE_COUNT,
    Dataset, DatasetType, ModelConfig, SmilesTokenizer, TokenCorpus, VaeGan,
};

const P_CORPUS: &str = "data/smiles.txt";
const P_CONFIG: &str = "config.json";
const P_CHECKPOINT: &str = "checkpoint";

/// ---------------------------------------------------------------------------
/// Session: Rohdaten, Tokenizer und daraus gebauter Korpus
/// ---------------------------------------------------------------------------
struct Session {
    v_smiles: Vec<String>,
    tokenizer: Option<SmilesTokenizer>,
    corpus: Option<TokenCorpus>,
}

impl Session {
    fn empty() -> Self {
        Self { v_smiles: Vec::new(), tokenizer: None, corpus: None }
    }

    fn prepare(p_corpus: &Path, cfg: &ModelConfig) -> Result<Self> {
        let dataset = Dataset::load(p_corpus, DatasetType::from_path(p_corpus))?;
        let tokenizer = SmilesTokenizer::fit(&dataset.smiles, Some(cfg.seq_len))
            .context("corpus has no characters")?;
        info!(alphabet = tokenizer.alphabet_size(), "tokenizer fitted");
        let corpus = tokenizer.build_corpus(&dataset.smiles)?;
        Ok(Self { v_smiles: dataset.smiles, tokenizer: Some(tokenizer), corpus: Some(corpus) })
    }

    /// Der gespeicherte Tokenizer gilt; der Korpus wird mit ihm neu kodiert.
    fn adopt(&mut self, stored: SmilesTokenizer) -> Result<()> {
        if let Some(current) = &self.tokenizer {
            if current.alphabet() != stored.alphabet() {
                warn!(
                    fitted = current.alphabet_size(),
                    stored = stored.alphabet_size(),
                    "alphabet differs from checkpoint, corpus re-encoded with stored tokenizer"
                );
            }
        }
        if !self.v_smiles.is_empty() {
            self.corpus = Some(stored.build_corpus(&self.v_smiles)?);
        }
        self.tokenizer = Some(stored);
        Ok(())
    }
}

/// ---------------------------------------------------------------------------
/// stop_requested: Ctrl+C-Flag oder Taste 'q' (nicht blockierend)
/// ---------------------------------------------------------------------------
fn stop_requested(stop_flag: &AtomicBool) -> bool {
    if stop_flag.load(AtomicOrdering::Relaxed) {
        return true;
    }
    if event::poll(Duration::from_millis(0)).unwrap_or(false) {
        if let Ok(Event::Key(key)) = event::read() {
            if key.kind == KeyEventKind::Press
                && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q'))
            {
                stop_flag.store(true, AtomicOrdering::SeqCst);
                return true;
            }
        }
    }
    false
}

fn read_line(s_prompt: &str) -> io::Result<String> {
    print!("{s_prompt}");
    io::stdout().flush()?;
    let mut s_input = String::new();
    io::stdin().read_line(&mut s_input)?;
    Ok(s_input.trim().to_string())
}

/// ---------------------------------------------------------------------------
/// run_menu
/// ---------------------------------------------------------------------------
fn run_menu(model: &mut VaeGan, session: &mut Session, stop_flag: &AtomicBool) -> io::Result<()> {
    loop {
        println!("\n===== HAUPTMENÜ =====");
        println!("  l – Modell laden");
        println!("  s – Modell speichern");
        println!("  t – Modell trainieren");
        println!("  g – Sequenzen generieren");
        println!("  e – Programm beenden");

        let s_choice = read_line("Ihre Wahl: ")?;
        match s_choice.to_lowercase().as_str() {
            "l" => match load_models(model, P_CHECKPOINT) {
                Ok(Some(tokenizer)) => match session.adopt(tokenizer) {
                    Ok(()) => println!("Checkpoint samt Tokenizer erfolgreich geladen."),
                    Err(e) => println!("Checkpoint geladen, Korpus nicht kodierbar: {e:#}"),
                },
                Ok(None) => println!("Checkpoint erfolgreich geladen."),
                Err(e) => println!("Fehler beim Laden: {e:#}"),
            },
            "s" => match save_models(model, session.tokenizer.as_ref(), P_CHECKPOINT) {
                Ok(()) => println!("Checkpoint erfolgreich gespeichert."),
                Err(e) => println!("Fehler beim Speichern: {e:#}"),
            },
            "t" => {
                let Some(corpus) = session.corpus.as_ref() else {
                    println!("Kein Korpus geladen, Training nicht möglich.");
                    continue;
                };
                let i_default = model.config().epochs;
                // leere Eingabe: Epochenzahl aus der Konfiguration
                let o_epochs: Option<usize> = loop {
                    let s_input =
                        read_line(&format!("Wie viele Epochen sollen verwendet werden? [{}]: ", i_default))?;
                    if s_input.is_empty() {
                        break None;
                    }
                    match s_input.parse::<usize>() {
                        Ok(val) if val > 0 => break Some(val),
                        _ => println!("Bitte eine positive Ganzzahl eingeben."),
                    }
                };

                stop_flag.store(false, AtomicOrdering::SeqCst);
                println!(
                    "Starte Training ({} Epochen, Abbruch mit 'q' oder Ctrl+C) …",
                    o_epochs.unwrap_or(i_default)
                );
                let r_train = match o_epochs {
                    Some(i_epochs) => model.train(corpus, i_epochs, || stop_requested(stop_flag)),
                    None => model.train_configured(corpus, || stop_requested(stop_flag)),
                };
                match r_train {
                    Ok(v_summaries) => {
                        if let Some(last) = v_summaries.last() {
                            println!(
                                "Training beendet: recon={:.5} kl={:.5} disc={:.5} gen={:.5}, {} übersprungen",
                                last.mean_recon, last.mean_kl, last.mean_disc, last.mean_gen, last.skipped
                            );
                        }
                        println!("Rekonstruktionsfehler: {:.6}", model.reconstruction_error(corpus));
                    }
                    Err(e) => println!("Training fehlgeschlagen: {e}"),
                }
            }
            "g" => {
                let s_input = read_line(&format!("Anzahl Sequenzen [{}]: ", SAMPLE_COUNT))?;
                let i_count = if s_input.is_empty() {
                    SAMPLE_COUNT
                } else {
                    match s_input.parse::<usize>() {
                        Ok(val) => val,
                        Err(_) => {
                            println!("Bitte eine Ganzzahl eingeben.");
                            continue;
                        }
                    }
                };
                let a_samples = model.generate(i_count);
                for (i_row, v_row) in a_samples.outer_iter().enumerate() {
                    let v_fmt: Vec<String> = v_row.iter().map(|v| format!("{v:.3}")).collect();
                    println!("#{:<3} [{}]", i_row + 1, v_fmt.join(", "));
                }
            }
            "e" => {
                println!("Programm wird beendet.");
                break;
            }
            _ => println!("Unbekannte Auswahl – bitte erneut versuchen."),
        }
    }
    Ok(())
}

/// ---------------------------------------------------------------------------
/// main
/// ---------------------------------------------------------------------------
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let v_args: Vec<String> = std::env::args().collect();
    let p_corpus = PathBuf::from(v_args.get(1).map(String::as_str).unwrap_or(P_CORPUS));
    let p_config = PathBuf::from(v_args.get(2).map(String::as_str).unwrap_or(P_CONFIG));

    let cfg = if p_config.exists() {
        ModelConfig::load(&p_config)?
    } else {
        ModelConfig::default()
    };

    let mut session = match Session::prepare(&p_corpus, &cfg) {
        Ok(s) => s,
        Err(e) => {
            warn!("kein Trainingskorpus: {e:#}");
            Session::empty()
        }
    };

    let mut model = VaeGan::new(cfg)?;

    let stop_flag = Arc::new(AtomicBool::new(false));
    {
        let stop_flag_ctrlc = Arc::clone(&stop_flag);
        if let Err(e) = ctrlc::set_handler(move || {
            stop_flag_ctrlc.store(true, AtomicOrdering::SeqCst);
        }) {
            warn!("Ctrl+C-Handler Warnung: {e}");
        }
    }

    println!("=== MODELL-INFO ===");
    println!("Netzwerkarchitektur  : {}", model.network_description());
    let c = model.config();
    println!(
        "Konfiguration         : seq_len={}, latent_dim={}, hidden_dim={}, lr={}, epochs={}",
        c.seq_len, c.latent_dim, c.hidden_dim, c.learning_rate, c.epochs
    );
    println!("Gesamtparameter       : {}", model.params().total_parameters());
    if let Some(corpus) = &session.corpus {
        println!("Korpus                : {} Sequenzen", corpus.len());
    }

    run_menu(&mut model, &mut session, &stop_flag).context("Fehler im Menü")?;
    Ok(())
}
