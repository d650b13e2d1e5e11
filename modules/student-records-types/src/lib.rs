//! Shared types for the student records service and its RPC clients.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Highest score a single subject can carry.
pub const MAX_MARK: u8 = 100;

// =====================================================
// Domain Types
// =====================================================

/// Body that awarded the secondary-school results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExaminationBoard {
    #[serde(rename = "REB")]
    Reb,
    #[serde(rename = "RTB")]
    Rtb,
}

impl ExaminationBoard {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REB" => Some(ExaminationBoard::Reb),
            "RTB" => Some(ExaminationBoard::Rtb),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExaminationBoard::Reb => "REB",
            ExaminationBoard::Rtb => "RTB",
        }
    }
}

impl fmt::Display for ExaminationBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored student submission. Immutable once written.
///
/// Reading is tolerant: documents written by older form versions or edited
/// by hand may lack fields, which come back empty, and an unrecognised board
/// reads as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Record {
    pub id: i64,
    pub timestamp: String,
    #[serde(
        deserialize_with = "lenient_board",
        skip_serializing_if = "Option::is_none"
    )]
    pub examination_board: Option<ExaminationBoard>,
    pub year_completed: String,
    pub rp_admission_year: String,
    pub combination: String,
    pub department: String,
    pub course: String,
    pub year_study: String,
    pub marks: BTreeMap<String, u8>,
}

fn lenient_board<'de, D>(deserializer: D) -> Result<Option<ExaminationBoard>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(ExaminationBoard::parse))
}

impl Record {
    /// Date part of the ISO-8601 timestamp, or the whole string if it has no `T`.
    pub fn submitted_on(&self) -> &str {
        self.timestamp.split('T').next().unwrap_or_default()
    }
}

// =====================================================
// RPC Request Types
// =====================================================

/// Payload posted by the data-entry form. The id is always assigned by the
/// service, so any `id` field the client sends is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSubmission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub examination_board: ExaminationBoard,
    pub year_completed: String,
    pub rp_admission_year: String,
    pub combination: String,
    pub department: String,
    pub course: String,
    pub year_study: String,
    #[serde(default)]
    pub marks: BTreeMap<String, u8>,
}

impl RecordSubmission {
    /// Rejects scores outside `0..=MAX_MARK`. Subject names are not checked
    /// against the combination.
    pub fn validate(&self) -> Result<(), String> {
        for (subject, mark) in &self.marks {
            if *mark > MAX_MARK {
                return Err(format!(
                    "Mark for '{}' must be between 0 and {}, got {}",
                    subject, MAX_MARK, mark
                ));
            }
            if subject.trim().is_empty() {
                return Err("Subject name must not be empty".to_string());
            }
        }
        Ok(())
    }

    /// Builds the stored record once the service has picked an id and timestamp.
    pub fn into_record(self, id: i64, timestamp: String) -> Record {
        Record {
            id,
            timestamp,
            examination_board: Some(self.examination_board),
            year_completed: self.year_completed,
            rp_admission_year: self.rp_admission_year,
            combination: self.combination,
            department: self.department,
            course: self.course,
            year_study: self.year_study,
            marks: self.marks,
        }
    }
}

/// Download formats offered by `/download/{format}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}

// =====================================================
// RPC Response Types
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> RpcResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn ok_with_message(data: T, msg: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(msg.into()),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(msg.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordCount {
    pub count: usize,
}

// =====================================================
// Service Status
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub uptime_secs: u64,
    pub total_records: usize,
    pub subject_columns: usize,
}
