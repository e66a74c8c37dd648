//! JSON exchange with the outside world.
//! Theme snapshots come in from the card catalog; a user's review records go out.

use crate::models::{ReviewRecord, ThemeSnapshot, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Document written by `export_records_to_path`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewExport {
    pub user_id: UserId,
    pub exported_on: NaiveDate,
    pub records: Vec<ReviewRecord>,
}

/// Writes a user's review records to a JSON file at the specified path.
pub fn export_records_to_path(
    user_id: UserId,
    records: &[ReviewRecord],
    exported_on: NaiveDate,
    path: &Path,
) -> Result<(), ExchangeError> {
    let export = ReviewExport {
        user_id,
        exported_on,
        records: records.to_vec(),
    };
    let json_string = serde_json::to_string_pretty(&export)?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;
    Ok(())
}

/// Reads a theme snapshot from a JSON file.
pub fn import_theme(path: &Path) -> Result<ThemeSnapshot, ExchangeError> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let theme: ThemeSnapshot = serde_json::from_str(&contents)?;

    info!(theme = %theme.name, cards = theme.cards.len(), path = %path.display(), "theme imported");
    Ok(theme)
}
