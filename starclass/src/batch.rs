//! One-pass batch prediction over CSV tables.
//!
//! The input table is copied to the output unchanged, with a
//! `Predicted_Type` column appended (or overwritten, when the input is itself
//! a previous result). Rows that cannot be predicted keep an empty
//! `Predicted_Type` cell and are listed in the [`BatchReport`]; they never
//! abort the batch. A table missing a required column is rejected before any
//! output is written.

use crate::error::{BatchError, MalformedRecord, PredictionError, SchemaMismatch};
use crate::pipeline::{Prediction, PredictionPipeline};
use crate::record::{Field, RawStarRecord};
use csv::{ByteRecord, ReaderBuilder, StringRecord, WriterBuilder};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::{info, warn};

/// Column holding the predicted star type name.
pub const PREDICTION_COLUMN: &str = "Predicted_Type";

/// Suggested file name for downloaded results.
pub const RESULTS_FILE_NAME: &str = "star_predictions.csv";

/// Position of each required field in a table's header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    indices: [usize; 6],
}

impl ColumnMap {
    /// Resolve required fields by header name; column order is irrelevant.
    ///
    /// When several headers match one field the first wins.
    pub fn resolve(headers: &StringRecord) -> Result<Self, SchemaMismatch> {
        let mut indices = [0usize; 6];
        let mut missing = Vec::new();

        for (slot, field) in indices.iter_mut().zip(Field::ALL) {
            let mut matching = headers
                .iter()
                .enumerate()
                .filter(|(_, header)| field.matches_header(header))
                .map(|(i, _)| i);
            match matching.next() {
                Some(index) => {
                    *slot = index;
                    if let Some(extra) = matching.next() {
                        warn!(
                            "Columns {} and {} both match {}; using the first",
                            index, extra, field
                        );
                    }
                }
                None => missing.push(field),
            }
        }

        if missing.is_empty() {
            Ok(Self { indices })
        } else {
            Err(SchemaMismatch { missing })
        }
    }

    /// Column index of a field.
    pub fn index(&self, field: Field) -> usize {
        self.indices[field as usize]
    }

    /// Collect the required fields of one row. Cells beyond the row's end
    /// read as missing; only required cells have to be valid UTF-8.
    pub fn extract(&self, row: &ByteRecord) -> Result<RawStarRecord, MalformedRecord> {
        let mut raw = RawStarRecord::default();
        for field in Field::ALL {
            let index = self.index(field);
            if let Some(cell) = row.get(index) {
                let text = std::str::from_utf8(cell).map_err(|e| {
                    MalformedRecord::Unreadable(format!(
                        "{field} (column {}) is not valid UTF-8: {e}",
                        index + 1
                    ))
                })?;
                raw.set_text(field, text);
            }
        }
        Ok(raw)
    }
}

/// A row that produced no prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    /// 1-based data row number (the header is row 0)
    pub row: usize,
    pub error: PredictionError,
}

/// Summary of a completed batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub total_rows: usize,
    pub predicted: usize,
    /// Rows predicted using a substituted category
    pub fallback_rows: usize,
    pub failures: Vec<RowFailure>,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Serializable view of a report for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total_rows: usize,
    pub predicted: usize,
    pub failed: usize,
    pub fallback_rows: usize,
    pub failures: Vec<RowFailureSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowFailureSummary {
    pub row: usize,
    pub error: String,
}

impl From<&BatchReport> for BatchSummary {
    fn from(report: &BatchReport) -> Self {
        Self {
            total_rows: report.total_rows,
            predicted: report.predicted,
            failed: report.failed(),
            fallback_rows: report.fallback_rows,
            failures: report
                .failures
                .iter()
                .map(|f| RowFailureSummary {
                    row: f.row,
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

/// Predict every row of a CSV table from `input`, writing the annotated
/// table to `output`.
///
/// Returns [`BatchError::SchemaMismatch`] without writing anything when a
/// required column is absent. I/O failures abort the batch; every other
/// problem is confined to its row.
pub fn run_batch<R: Read, W: Write>(
    pipeline: &PredictionPipeline,
    input: R,
    output: W,
) -> Result<BatchReport, BatchError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    // Cells are copied through as bytes; headers are decoded leniently for matching only
    let raw_headers = reader.byte_headers()?.clone();
    let headers: StringRecord = raw_headers
        .iter()
        .map(String::from_utf8_lossy)
        .collect();
    let columns = ColumnMap::resolve(&headers)?;
    let width = raw_headers.len();

    // Re-uploaded results already carry a prediction column
    let prediction_slot = headers.iter().position(|h| h.trim() == PREDICTION_COLUMN);

    let mut writer = WriterBuilder::new().from_writer(output);
    let mut out_headers = raw_headers.clone();
    if prediction_slot.is_none() {
        out_headers.push_field(PREDICTION_COLUMN.as_bytes());
    }
    writer.write_byte_record(&out_headers)?;

    let mut report = BatchReport::default();
    let mut row = ByteRecord::new();

    loop {
        let read = reader.read_byte_record(&mut row);
        let outcome = match read {
            Ok(false) => break,
            Ok(true) => predict_row(pipeline, &columns, &row, width),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                row.clear();
                Err(MalformedRecord::Unreadable(e.to_string()).into())
            }
        };

        report.total_rows += 1;
        let cell = match outcome {
            Ok(prediction) => {
                report.predicted += 1;
                if prediction.used_fallback() {
                    report.fallback_rows += 1;
                }
                prediction.star_type.name()
            }
            Err(error) => {
                warn!("Row {}: {}", report.total_rows, error);
                report.failures.push(RowFailure {
                    row: report.total_rows,
                    error,
                });
                ""
            }
        };

        let mut out_row: Vec<&[u8]> = row.iter().take(width).collect();
        out_row.resize(width, b"");
        match prediction_slot {
            Some(slot) => out_row[slot] = cell.as_bytes(),
            None => out_row.push(cell.as_bytes()),
        }
        writer.write_record(&out_row)?;
    }

    writer.flush()?;

    info!(
        "Batch complete: {} rows, {} predicted, {} failed, {} with fallback categories",
        report.total_rows,
        report.predicted,
        report.failed(),
        report.fallback_rows
    );
    Ok(report)
}

/// [`run_batch`] into a newly created file at `path`.
///
/// A table rejected for its schema leaves no file behind.
pub fn run_batch_to_file<R: Read>(
    pipeline: &PredictionPipeline,
    input: R,
    path: &Path,
) -> Result<BatchReport, BatchError> {
    let file = File::create(path)?;
    let result = run_batch(pipeline, input, BufWriter::new(file));
    if matches!(result, Err(BatchError::SchemaMismatch(_))) {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
    result
}

fn predict_row(
    pipeline: &PredictionPipeline,
    columns: &ColumnMap,
    row: &ByteRecord,
    width: usize,
) -> Result<Prediction, PredictionError> {
    if row.len() > width {
        return Err(MalformedRecord::FieldCount {
            expected: width,
            found: row.len(),
        }
        .into());
    }
    let record = columns.extract(row)?.into_record()?;
    pipeline.predict_one(&record)
}
