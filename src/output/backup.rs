//! Raw API response backup.
//!
//! One CSV per address per run, one row per API call, storing the full
//! request parameters and raw response body so a run can be audited
//! without re-querying the service.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;

use crate::output::csv_field;

const HEADER: &[&str] = &[
    "timestamp",
    "request_type",
    "poi_name",
    "request_params",
    "response_status",
    "response_infocode",
    "response_count",
    "raw_json_response",
];

pub struct BackupWriter {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl BackupWriter {
    /// Create the backup file (and its directory) and write the header.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create backup dir {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create backup file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", HEADER.join(","))?;
        writer.flush()?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one raw API call record, flushing so a crash keeps prior rows.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &mut self,
        request_type: &str,
        poi_name: Option<&str>,
        params: &serde_json::Value,
        status: &str,
        infocode: &str,
        count: &str,
        raw_body: &str,
    ) -> Result<()> {
        let row = [
            Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            csv_field(request_type),
            csv_field(poi_name.unwrap_or("")),
            csv_field(&params.to_string()),
            csv_field(status),
            csv_field(infocode),
            csv_field(count),
            csv_field(raw_body),
        ];
        writeln!(self.writer, "{}", row.join(","))?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Backup file name: sanitized address, run timestamp, 1-based index.
pub fn backup_file_name(address: &str, run_stamp: &str, index: usize) -> String {
    let safe: String = address.chars().filter(|c| c.is_alphanumeric()).collect();
    format!("backup_{safe}_{run_stamp}_{index}.csv")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_file_name_strips_punctuation() {
        assert_eq!(
            backup_file_name("成都保利·叶语", "20260807_120000", 3),
            "backup_成都保利叶语_20260807_120000_3.csv"
        );
    }

    #[test]
    fn test_backup_records_one_row_per_call() {
        let path = std::env::temp_dir().join(format!(
            "site-scout-backup-test-{}.csv",
            std::process::id()
        ));
        let mut writer = BackupWriter::create(&path).unwrap();
        writer
            .record(
                "geocode",
                None,
                &serde_json::json!({"address": "somewhere"}),
                "1",
                "10000",
                "1",
                r#"{"status":"1"}"#,
            )
            .unwrap();
        writer
            .record(
                "around_search",
                Some("住宅小区"),
                &serde_json::json!({"radius": "800"}),
                "1",
                "10000",
                "25",
                r#"{"status":"1","pois":[]}"#,
            )
            .unwrap();
        drop(writer);

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,request_type"));
        assert!(lines[1].contains("geocode"));
        assert!(lines[2].contains("住宅小区"));
    }
}
