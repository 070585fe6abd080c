//! CSV export of finished sessions.
//!
//! A file starts with the JSON metadata of every exported session, one `# `-prefixed
//! line at a time, followed by a header and one row per sample:
//!
//! ```text
//! # [
//! #   { "label": "grip left", "device": "dynamometer", ... }
//! # ]
//! test,sample,value,timestamp_ms,label
//! 1,1,12.5,1000,grip left
//! ```
//!
//! The value columns depend on the device: `value` for the dynamometer, `distance_m`
//! for the encoder and `channel1,channel2` for the force platform. Sessions with
//! different value columns cannot share one file.
//!
//! Requires the `storage_csv` feature (enabled by default).

use crate::core::{Decoded, DeviceType};
use crate::error::{AppResult, DaqError};
use crate::session::{FinishedSession, SessionBook};
use std::io::Write;
use std::path::Path;

/// Value columns written for a device.
pub fn value_columns(device: DeviceType) -> &'static [&'static str] {
    match device {
        DeviceType::Dynamometer => &["value"],
        DeviceType::Encoder => &["distance_m"],
        DeviceType::Platform80Hz | DeviceType::Platform1kHz => &["channel1", "channel2"],
    }
}

/// Full header row for a device.
pub fn header(device: DeviceType) -> Vec<&'static str> {
    let mut columns = vec!["test", "sample"];
    columns.extend_from_slice(value_columns(device));
    columns.extend_from_slice(&["timestamp_ms", "label"]);
    columns
}

/// Write `sessions` as CSV to `out`, numbering tests from 1 in the given order.
///
/// Returns the number of data rows written.
#[cfg(feature = "storage_csv")]
pub fn write_sessions_csv<W: Write>(mut out: W, sessions: &[&FinishedSession]) -> AppResult<usize> {
    let Some(first) = sessions.first() else {
        return Err(DaqError::Storage("no sessions to export".to_string()));
    };
    let columns = value_columns(first.device());
    if let Some(other) = sessions.iter().find(|s| value_columns(s.device()) != columns) {
        return Err(DaqError::Storage(format!(
            "cannot export {} and {} sessions to the same file",
            first.device(),
            other.device()
        )));
    }

    let metadata: Vec<_> = sessions.iter().map(|s| s.metadata()).collect();
    let json = serde_json::to_string_pretty(&metadata)?;
    for line in json.lines() {
        writeln!(out, "# {line}")?;
    }

    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(header(first.device()))?;

    let mut rows = 0;
    for (test_index, session) in sessions.iter().enumerate() {
        let test = (test_index + 1).to_string();
        let label = session.label();
        match session.samples() {
            Decoded::Scalars(samples) => {
                for (i, sample) in samples.iter().enumerate() {
                    writer.write_record([
                        test.clone(),
                        (i + 1).to_string(),
                        sample.value.to_string(),
                        sample.timestamp_ms.to_string(),
                        label.to_string(),
                    ])?;
                    rows += 1;
                }
            }
            Decoded::Forces(pairs) => {
                for (i, pair) in pairs.iter().enumerate() {
                    writer.write_record([
                        test.clone(),
                        (i + 1).to_string(),
                        pair.channel1.to_string(),
                        pair.channel2.to_string(),
                        pair.timestamp_ms.to_string(),
                        label.to_string(),
                    ])?;
                    rows += 1;
                }
            }
        }
    }
    writer.flush()?;
    Ok(rows)
}

/// Export every session of a book to a CSV file, creating parent directories.
pub fn export_book_csv(book: &SessionBook, path: &Path) -> AppResult<usize> {
    #[cfg(not(feature = "storage_csv"))]
    {
        let _ = (book, path);
        Err(DaqError::FeatureNotEnabled("storage_csv".to_string()))
    }

    #[cfg(feature = "storage_csv")]
    {
        let sessions: Vec<&FinishedSession> = book.sessions().iter().collect();
        export_to_file(&sessions, path)
    }
}

/// Export a single session to a CSV file, creating parent directories.
pub fn export_session_csv(session: &FinishedSession, path: &Path) -> AppResult<usize> {
    #[cfg(not(feature = "storage_csv"))]
    {
        let _ = (session, path);
        Err(DaqError::FeatureNotEnabled("storage_csv".to_string()))
    }

    #[cfg(feature = "storage_csv")]
    {
        export_to_file(&[session], path)
    }
}

#[cfg(feature = "storage_csv")]
fn export_to_file(sessions: &[&FinishedSession], path: &Path) -> AppResult<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    let rows = write_sessions_csv(file, sessions)?;
    tracing::info!(path = %path.display(), rows, "exported CSV");
    Ok(rows)
}
