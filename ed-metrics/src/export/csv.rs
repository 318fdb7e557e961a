//! Results file export
//!
//! One row per run, fields separated by `;`, decimals written with two
//! places and a `,` as decimal separator:
//!
//! ```text
//! Overall Average Time;Standard Deviation;Count Type 1;Avg. Time Type 1;...
//! 41,87;9,12;87;40,55;52;38,70;13;49,01;98;37,33
//! ```
//!
//! The header is written only when the file is created; later runs append.

use crate::error::MetricsError;
use crate::export::SummaryExporter;
use crate::stats::RunSummary;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Leading columns of every results file.
pub const OVERALL_COLUMNS: [&str; 2] = ["Overall Average Time", "Standard Deviation"];

/// Field separator of the results file.
pub const DELIMITER: char = ';';

/// Appends run summaries to a results file.
#[derive(Debug)]
pub struct CsvExporter {
    path: PathBuf,
}

impl CsvExporter {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SummaryExporter for CsvExporter {
    fn export(&self, summary: &RunSummary) -> Result<(), MetricsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file_exists = self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if !file_exists {
            writeln!(file, "{}", header(summary))?;
        }
        writeln!(file, "{}", row(summary))?;

        debug!(path = %self.path.display(), new_file = !file_exists, "Appended results row");
        Ok(())
    }
}

/// Header line for a summary's groups.
pub fn header(summary: &RunSummary) -> String {
    let mut columns: Vec<String> = OVERALL_COLUMNS.iter().map(|c| c.to_string()).collect();
    for group in &summary.groups {
        columns.push(format!("Count {}", group.label));
        columns.push(format!("Avg. Time {}", group.label));
    }
    columns.join(&DELIMITER.to_string())
}

/// Data line for one summary.
pub fn row(summary: &RunSummary) -> String {
    let mut fields = vec![
        format_decimal(summary.overall_mean),
        format_decimal(summary.std_dev),
    ];
    for group in &summary.groups {
        fields.push(group.count.to_string());
        fields.push(format_decimal(group.mean));
    }
    fields.join(&DELIMITER.to_string())
}

/// Two decimals, `,` as decimal separator.
pub fn format_decimal(value: f64) -> String {
    format!("{value:.2}").replace('.', ",")
}

fn parse_decimal(field: &str) -> Option<f64> {
    field.trim().replace(',', ".").parse().ok()
}

/// One parsed line of a results file.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub overall_mean: f64,
    pub std_dev: f64,
    /// `(count, mean)` per group, in column order.
    pub groups: Vec<(usize, f64)>,
}

/// Parse a results file written by [`CsvExporter`].
///
/// Blank lines are skipped. Anything else that does not match the column
/// contract is reported as [`MetricsError::MalformedRow`].
pub fn read_results(path: impl AsRef<Path>) -> Result<Vec<ResultRow>, MetricsError> {
    let content = fs::read_to_string(path)?;
    let mut lines = content.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

    let Some((_, header_line)) = lines.next() else {
        return Ok(Vec::new());
    };
    let header_fields: Vec<&str> = header_line.split(DELIMITER).collect();
    if !header_fields.starts_with(&OVERALL_COLUMNS) || header_fields.len() % 2 != 0 {
        return Err(MetricsError::MalformedRow {
            line: 1,
            reason: format!("unexpected header '{header_line}'"),
        });
    }

    lines
        .map(|(index, line)| parse_row(index + 1, line, header_fields.len()))
        .collect()
}

fn parse_row(line: usize, text: &str, columns: usize) -> Result<ResultRow, MetricsError> {
    let malformed = |reason: String| MetricsError::MalformedRow { line, reason };

    let fields: Vec<&str> = text.split(DELIMITER).collect();
    if fields.len() != columns {
        return Err(malformed(format!(
            "expected {columns} fields, found {}",
            fields.len()
        )));
    }

    let decimal = |i: usize| {
        parse_decimal(fields[i]).ok_or_else(|| malformed(format!("'{}' is not a decimal", fields[i])))
    };
    let count = |i: usize| {
        fields[i]
            .trim()
            .parse::<usize>()
            .map_err(|_| malformed(format!("'{}' is not a count", fields[i])))
    };

    let mut groups = Vec::with_capacity((columns - 2) / 2);
    for i in (2..columns).step_by(2) {
        groups.push((count(i)?, decimal(i + 1)?));
    }

    Ok(ResultRow {
        overall_mean: decimal(0)?,
        std_dev: decimal(1)?,
        groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::GroupSummary;

    fn summary() -> RunSummary {
        RunSummary {
            total: 4,
            overall_mean: 41.876,
            std_dev: 9.1,
            groups: (1..=4)
                .map(|k| GroupSummary {
                    label: format!("Type {k}"),
                    count: k,
                    mean: 30.0 + k as f64 + 0.005,
                })
                .collect(),
        }
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(41.876), "41,88");
        assert_eq!(format_decimal(0.0), "0,00");
        assert_eq!(format_decimal(9.1), "9,10");
    }

    #[test]
    fn test_header_matches_column_contract() {
        assert_eq!(
            header(&summary()),
            "Overall Average Time;Standard Deviation;Count Type 1;Avg. Time Type 1;\
             Count Type 2;Avg. Time Type 2;Count Type 3;Avg. Time Type 3;\
             Count Type 4;Avg. Time Type 4"
        );
    }

    #[test]
    fn test_row_formatting() {
        let line = row(&summary());
        let fields: Vec<&str> = line.split(';').collect();
        assert_eq!(fields.len(), 10);
        assert_eq!(&fields[..3], &["41,88", "9,10", "1"]);
        assert_eq!(fields[8], "4");
    }

    #[test]
    fn test_header_written_once() {
        let dir = std::env::temp_dir().join(format!("edsim_csv_once_{}", std::process::id()));
        let path = dir.join("nested").join("Task1.csv");
        let _ = fs::remove_dir_all(&dir);

        let exporter = CsvExporter::new(&path);
        exporter.export(&summary()).unwrap();
        exporter.export(&summary()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Overall Average Time;"));
        assert_eq!(lines[1], lines[2]);

        let rows = read_results(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].overall_mean, 41.88);
        assert_eq!(rows[0].groups[3].0, 4);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_malformed_rows() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("edsim_csv_malformed_{}.csv", std::process::id()));

        fs::write(&path, format!("{}\n1,0;2,0;x;3,0\n", "Overall Average Time;Standard Deviation;Count Type 1;Avg. Time Type 1")).unwrap();
        match read_results(&path) {
            Err(MetricsError::MalformedRow { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed row, got {other:?}"),
        }

        fs::write(&path, "a;b\n").unwrap();
        assert!(matches!(
            read_results(&path),
            Err(MetricsError::MalformedRow { line: 1, .. })
        ));

        fs::remove_file(&path).ok();
    }
}
