//! Portable JSON export of a session.
//!
//! ```json
//! {
//!   "env_objs": ["Table", "Chair", "Mic"],
//!   "participant_logs": {
//!     "Participant A": [["2024-01-01T10:00:00.000Z", "2024-01-01T10:05:00.000Z"]]
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::CoreError;
use crate::participant::{ParticipantDirectory, UNKNOWN_PARTICIPANT};
use crate::timer::LogLedger;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub env_objs: Vec<String>,
    /// Display name -> `[start, end]` pairs, newest first.
    pub participant_logs: IndexMap<String, Vec<[String; 2]>>,
}

/// Split environment notes into trimmed, non-empty lines.
pub fn parse_environment(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Build the export document.
///
/// Every directory participant gets a key, in directory order, even with no
/// entries. Entries whose participant is gone are filed under `"Unknown"`.
/// Participants sharing a display name share one list.
pub fn build_export(
    directory: &ParticipantDirectory,
    ledger: &LogLedger,
    environment_text: &str,
) -> ExportDocument {
    let mut participant_logs: IndexMap<String, Vec<[String; 2]>> = directory
        .iter()
        .map(|p| (p.name.clone(), Vec::new()))
        .collect();

    for entry in ledger.entries() {
        let name = match directory.get(entry.participant_id) {
            Some(p) => p.name.as_str(),
            None => UNKNOWN_PARTICIPANT,
        };
        participant_logs
            .entry(name.to_string())
            .or_default()
            .push([format_timestamp(entry.start_time), format_timestamp(entry.end_time)]);
    }

    ExportDocument {
        env_objs: parse_environment(environment_text),
        participant_logs,
    }
}

/// `2024-01-01T10:00:00.000Z`
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `session_data_<epoch-ms>.json`
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("session_data_{}.json", at.timestamp_millis())
}

/// Write `doc` as pretty JSON into `dir`, returning the file path.
///
/// # Errors
/// Returns an error if the directory cannot be created or the file written.
pub fn write_export(dir: &Path, doc: &ExportDocument, at: DateTime<Utc>) -> Result<PathBuf, CoreError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(at));
    let json = serde_json::to_string_pretty(doc)?;
    std::fs::write(&path, json)?;
    info!(path = %path.display(), "session exported");
    Ok(path)
}
