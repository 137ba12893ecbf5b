//! Result Writers
//!
//! CSV and JSON files produced at the end of (and, for spatial rows, during) a run.

use sedpnr_records::{CountsRow, RunSummary, SpatialRecord, RESULTS_CSV_HEADER, SPATIAL_CSV_HEADER};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Per-tick counts table
pub const RESULTS_FILE: &str = "simulation_results.csv";
/// Per-agent spatial stream
pub const SPATIAL_FILE: &str = "spatial_data.csv";
/// End-of-run summary
pub const SUMMARY_FILE: &str = "summary.json";

/// Errors that can occur while writing results.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Create `dir` (and parents) if it does not exist yet.
pub fn ensure_dir(dir: &Path) -> Result<(), OutputError> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Write the counts table: header, then one line per recorded row.
pub fn write_results_csv<'a>(
    path: &Path,
    rows: impl IntoIterator<Item = &'a CountsRow>,
) -> Result<usize, OutputError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{}", RESULTS_CSV_HEADER)?;
    let mut written = 0;
    for row in rows {
        writeln!(writer, "{}", row.to_csv_row())?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Write the run summary as pretty-printed JSON.
pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<(), OutputError> {
    let json = summary.to_json()?;
    fs::write(path, json)?;
    Ok(())
}

/// Buffered, append-only writer for spatial rows.
pub struct SpatialWriter {
    writer: Option<BufWriter<File>>,
    rows_written: u64,
}

impl SpatialWriter {
    /// Create (truncating) the file at `path` and write the header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, OutputError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", SPATIAL_CSV_HEADER)?;

        Ok(Self {
            writer: Some(writer),
            rows_written: 0,
        })
    }

    /// A writer that discards rows (spatial output disabled, or tests).
    pub fn null() -> Self {
        Self {
            writer: None,
            rows_written: 0,
        }
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn write_rows(&mut self, rows: &[SpatialRecord]) -> Result<(), OutputError> {
        if let Some(ref mut writer) = self.writer {
            for row in rows {
                writeln!(writer, "{}", row.to_csv_row())?;
            }
            self.rows_written += rows.len() as u64;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), OutputError> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for SpatialWriter {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!("failed to flush spatial writer: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sedpnr_records::fixtures;
    use sedpnr_records::{ClaimSummary, NetworkSummary};
    use std::io::BufRead;

    #[test]
    fn test_results_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RESULTS_FILE);
        let rows = vec![CountsRow {
            tick: 0,
            claim_id: 0,
            claim_name: "Factual_Claim".to_string(),
            is_misinformation: false,
            counts: fixtures::seeded_counts(),
        }];

        assert_eq!(write_results_csv(&path, &rows).unwrap(), 1);
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], RESULTS_CSV_HEADER);
        assert_eq!(lines[1], "0,0,Factual_Claim,false,95,0,0,5,0,0");
    }

    #[test]
    fn test_spatial_writer_streams_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SPATIAL_FILE);
        let rows = fixtures::sample_spatial_rows();

        {
            let mut writer = SpatialWriter::create(&path).unwrap();
            writer.write_rows(&rows[..3]).unwrap();
            writer.write_rows(&rows[3..]).unwrap();
            assert_eq!(writer.rows_written(), rows.len() as u64);
        }

        let file = File::open(&path).unwrap();
        let lines: Vec<String> = std::io::BufReader::new(file)
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines.len(), rows.len() + 1);
        assert_eq!(lines[0], SPATIAL_CSV_HEADER);
        let parsed = SpatialRecord::from_csv_row(&lines[1]).unwrap();
        assert_eq!(parsed, rows[0]);
    }

    #[test]
    fn test_null_spatial_writer() {
        let mut writer = SpatialWriter::null();
        writer.write_rows(&fixtures::sample_spatial_rows()).unwrap();
        assert_eq!(writer.rows_written(), 0);
    }

    #[test]
    fn test_summary_json() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        let path = nested.join(SUMMARY_FILE);

        let mut claim = ClaimSummary::new(0, "Misinfo_Claim_1", true, 0);
        claim.observe(4, &fixtures::seeded_counts());
        let summary = RunSummary {
            population: 100,
            ticks: 4,
            seed: 42,
            claims: vec![claim],
            network: NetworkSummary::default(),
        };
        write_summary_json(&path, &summary).unwrap();

        let parsed: RunSummary = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, summary);
        assert_eq!(parsed.claims[0].peak_tick, 4);
    }
}
