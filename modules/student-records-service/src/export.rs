//! Tabular (CSV) export derived from the full record set.
//!
//! The table is always re-derived from scratch: one row per record in store
//! order, one column per subject seen in any record, subjects sorted by name.

use crate::error::ExportError;
use crate::store::write_atomic;
use std::collections::BTreeSet;
use std::path::Path;
use student_records_types::Record;

const FIXED_HEADERS: [&str; 9] = [
    "ID",
    "Timestamp",
    "Examination Board",
    "Year Completed HS",
    "RP Admission Year",
    "Combination",
    "Department",
    "Course",
    "Year of Study",
];

/// Union of every subject key across all records, in lexicographic order.
pub fn subject_columns(records: &[Record]) -> Vec<String> {
    let subjects: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.marks.keys().map(String::as_str))
        .collect();
    subjects.into_iter().map(str::to_string).collect()
}

/// Header label for a subject column. Commas and spaces become underscores.
pub fn column_label(subject: &str) -> String {
    format!("Mark_{}", subject.replace([',', ' '], "_"))
}

/// Renders the table. Returns `None` for an empty record set so callers never
/// produce a header-only file.
pub fn render(records: &[Record]) -> Result<Option<Vec<u8>>, ExportError> {
    if records.is_empty() {
        return Ok(None);
    }

    let subjects = subject_columns(records);
    let mut writer = csv::Writer::from_writer(Vec::new());

    let header = FIXED_HEADERS
        .iter()
        .map(|h| h.to_string())
        .chain(subjects.iter().map(|s| column_label(s)));
    writer.write_record(header)?;

    for record in records {
        let mut row = vec![
            record.id.to_string(),
            record.timestamp.clone(),
            record
                .examination_board
                .map(|b| b.to_string())
                .unwrap_or_default(),
            record.year_completed.clone(),
            record.rp_admission_year.clone(),
            record.combination.clone(),
            record.department.clone(),
            record.course.clone(),
            record.year_study.clone(),
        ];
        // Absent subjects stay empty rather than zero.
        row.extend(subjects.iter().map(|s| {
            record
                .marks
                .get(s)
                .map(|m| m.to_string())
                .unwrap_or_default()
        }));
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;
    Ok(Some(bytes))
}

/// Re-derives the table and writes it to `path`. An empty record set removes
/// any stale artifact instead. Returns the rendered bytes, if any.
pub fn write(records: &[Record], path: &Path) -> Result<Option<Vec<u8>>, ExportError> {
    match render(records)? {
        Some(bytes) => {
            write_atomic(path, &bytes)?;
            Ok(Some(bytes))
        }
        None => {
            remove_if_exists(path)?;
            Ok(None)
        }
    }
}

pub(crate) fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
