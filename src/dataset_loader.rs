// dataset_loader.rs
// ============================================================================
// Autor:   Marcus Schlieper (ExpChat.ai)
// Hinweis: SMILES-Korpus aus CSV, JSON oder Textdatei laden.
// ============================================================================

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::{fs, path::Path};
use tracing::info;

/// SMILES strings read from one corpus file.
pub struct Dataset {
    pub smiles: Vec<String>,
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatasetType {
    JSON,
    /// First column of each record; `has_headers` skips the first line.
    CSV { has_headers: bool },
    Text,
}

impl DatasetType {
    /// Guesses the type from the file extension, plain text otherwise.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
            Some(ext) if ext == "json" => DatasetType::JSON,
            Some(ext) if ext == "csv" => DatasetType::CSV { has_headers: true },
            _ => DatasetType::Text,
        }
    }
}

impl Dataset {
    pub fn load(path: impl AsRef<Path>, type_of_data: DatasetType) -> Result<Self> {
        let path = path.as_ref();
        let smiles = match type_of_data {
            DatasetType::JSON => get_data_from_json(path)?,
            DatasetType::CSV { has_headers } => get_data_from_csv(path, has_headers)?,
            DatasetType::Text => get_data_from_text(path)?,
        };
        info!(path = %path.display(), count = smiles.len(), "corpus loaded");
        Ok(Dataset { smiles })
    }

    pub fn len(&self) -> usize {
        self.smiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.smiles.is_empty()
    }
}

fn keep(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn get_data_from_json(path: &Path) -> Result<Vec<String>> {
    let data_json = fs::read_to_string(path)
        .with_context(|| format!("failed to read corpus file {}", path.display()))?;
    let data: Vec<String> = serde_json::from_str(&data_json)
        .with_context(|| format!("{} is not a JSON array of strings", path.display()))?;
    Ok(data.iter().filter_map(|s| keep(s)).collect())
}

//===================================================================
//  Funktionsname : get_data_from_csv
//  Kurzbeschreibung:
//      Liest die erste Spalte einer CSV-Datei als SMILES-Zeichenketten.
//      Leere Felder werden verworfen.
//
//  Autor      : Marcus Schlieper
//  Historie   :
//      1.0 | 23.11.2025 | MS | Erste Implementierung
//      2.0 | 03.02.2026 | MS | Erste Spalte statt Zeilen-Join, Fehler via anyhow
//===================================================================
fn get_data_from_csv(path: &Path, has_headers: bool) -> Result<Vec<String>> {
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open CSV corpus {}", path.display()))?;

    // rows may differ in column count
    let mut rdr = ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(file);

    let mut v_data: Vec<String> = Vec::new();
    for (i_index, result) in rdr.records().enumerate() {
        let record = result
            .with_context(|| format!("bad CSV record {} in {}", i_index + 1, path.display()))?;
        if let Some(s) = record.get(0).and_then(keep) {
            v_data.push(s);
        }
    }
    Ok(v_data)
}

fn get_data_from_text(path: &Path) -> Result<Vec<String>> {
    let s_data = fs::read_to_string(path)
        .with_context(|| format!("failed to read corpus file {}", path.display()))?;
    Ok(s_data.lines().filter_map(keep).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(content: &str, suffix: &str) -> NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn all_formats_yield_the_same_strings() {
        let expected = vec!["CCO".to_string(), "c1ccccc1".to_string()];

        let json = file_with(r#"["CCO", "  ", "c1ccccc1"]"#, ".json");
        let csv = file_with("smiles,name\nCCO,ethanol\n,\nc1ccccc1,benzene\n", ".csv");
        let txt = file_with("CCO\n\nc1ccccc1\n", ".txt");

        for (f, t) in [
            (&json, DatasetType::JSON),
            (&csv, DatasetType::CSV { has_headers: true }),
            (&txt, DatasetType::Text),
        ] {
            let ds = Dataset::load(f.path(), t).unwrap();
            assert_eq!(ds.smiles, expected);
            assert_eq!(DatasetType::from_path(f.path()), t);
        }
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Dataset::load("/nonexistent/corpus.txt", DatasetType::Text)
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("/nonexistent/corpus.txt"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let f = file_with("{not json", ".json");
        assert!(Dataset::load(f.path(), DatasetType::JSON).is_err());
    }
}
