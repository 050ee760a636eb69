use std::fs::File;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised while reading a bulk import file
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to read import file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unsupported import format: {0}")]
    UnsupportedFormat(String),
}

/// Reads URLs from a bulk import file
///
/// | Extension | Parsing |
/// |-----------|---------|
/// | `.csv` | First column of every record, header row skipped |
/// | `.txt` | One URL per line |
///
/// Blank values are dropped. Any other extension, or a file that cannot be
/// read or parsed, yields an empty list; nothing is imported partially.
pub fn import_urls(path: &Path) -> Vec<String> {
    match try_import_urls(path) {
        Ok(urls) => {
            info!("Imported {} URL(s) from {}", urls.len(), path.display());
            urls
        }
        Err(e) => {
            warn!("Ignoring import file {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Reads URLs from a bulk import file, reporting why it failed
pub fn try_import_urls(path: &Path) -> Result<Vec<String>, ImportError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => read_csv(path),
        "txt" => read_lines(path),
        other => Err(ImportError::UnsupportedFormat(if other.is_empty() {
            "no extension".to_string()
        } else {
            format!(".{}", other)
        })),
    }
}

fn read_csv(path: &Path) -> Result<Vec<String>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(File::open(path)?);

    let mut urls = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(0).map(str::trim).filter(|v| !v.is_empty()) {
            urls.push(value.to_string());
        }
    }
    Ok(urls)
}

fn read_lines(path: &Path) -> Result<Vec<String>, ImportError> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}
