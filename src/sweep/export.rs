//! Result matrix and delimited export
//!
//! Rows hold the configuration columns first, then the priority summary, the
//! deadline verdict and finally every service name followed by its flow
//! delays in milliseconds (`-1` for failed flows).

use crate::analysis::DelayReport;
use crate::config::ExperimentConfig;
use crate::error::{NcError, Result, ResultExt};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Column delimiter of exported files
pub const DELIMITER: char = ';';

/// Accumulated experiment rows
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMatrix {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Default for ResultMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultMatrix {
    /// Empty matrix with the standard header
    pub fn new() -> Self {
        let mut header: Vec<String> = ExperimentConfig::column_labels()
            .into_iter()
            .map(String::from)
            .collect();
        header.push("priorities".to_string());
        header.push("deadline_torn".to_string());
        header.push("delays_ms".to_string());
        Self {
            header,
            rows: Vec::new(),
        }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Append the row describing one analysis run
    pub fn push_report(&mut self, config: &ExperimentConfig, report: &DelayReport) {
        let mut row = config.column_values();
        row.push(report.priority_summary());
        row.push(report.deadline_torn().to_string());
        row.extend(report.delay_columns());
        self.rows.push(row);
    }

    /// Write header and rows, one line each
    pub fn write_to<W: Write>(&self, writer: &mut W, delimiter: char) -> Result<()> {
        let separator = delimiter.to_string();
        writeln!(writer, "{}", self.header.join(&separator))?;
        for row in &self.rows {
            writeln!(writer, "{}", row.join(&separator))?;
        }
        Ok(())
    }

    pub fn to_delimited(&self, delimiter: char) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut buffer, delimiter);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Write the matrix to `<dir>/<prefix>Log_<yyyyMMddHHmmss>.csv`, creating
    /// `dir` if needed. Returns the path written.
    pub fn export(&self, dir: impl AsRef<Path>, prefix: &str) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(NcError::from)
            .with_context(|| format!("Failed to create directory {:?}", dir))?;

        let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S");
        let path = dir.join(format!("{}Log_{}.csv", prefix, timestamp));

        let file = File::create(&path)
            .map_err(NcError::from)
            .with_context(|| format!("Failed to create {:?}", path))?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer, DELIMITER)?;
        writer.flush()?;

        tracing::info!("Exported {} rows to {:?}", self.rows.len(), path);
        Ok(path)
    }
}
