use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Identifier of a report row, assigned at ingestion and never reused
pub type RowId = u64;

/// Lifecycle state of a report row
///
/// Rows move forward only: `Pending -> Processing -> Completed | Error`.
/// A row that ends in `Error` stays there; there is no retry path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl RowStatus {
    pub const ALL: [RowStatus; 4] = [
        RowStatus::Pending,
        RowStatus::Processing,
        RowStatus::Completed,
        RowStatus::Error,
    ];

    /// Wire spelling, also used as the `{status}` path segment of the backend
    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::Pending => "Pending",
            RowStatus::Processing => "Processing",
            RowStatus::Completed => "Completed",
            RowStatus::Error => "Error",
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, RowStatus::Completed | RowStatus::Error)
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RowStatus {
    type Err = String;

    /// Case-insensitive; surrounding whitespace is ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        RowStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown row status: {}", s))
    }
}

/// One unit of work shown in a workflow's status table
///
/// The descriptive fields come from the uploaded sheet and are not touched
/// by processing. `time` stays empty until the row resolves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub id: RowId,
    pub status: RowStatus,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub time: String,
}

impl ReportRow {
    pub fn pending(id: RowId, name: &str, email: &str, company: &str) -> Self {
        ReportRow {
            id,
            status: RowStatus::Pending,
            name: name.to_string(),
            email: email.to_string(),
            company: company.to_string(),
            time: String::new(),
        }
    }
}

/// Render a processing duration the way the status table shows it
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.2}s", elapsed.as_secs_f64())
}

/// Per-status counts over a row sequence
///
/// `pending + processing + completed + errors == total` for every value
/// produced by [`Summary::of`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub errors: usize,
}

impl Summary {
    pub fn of(rows: &[ReportRow]) -> Self {
        let mut summary = Summary {
            total: rows.len(),
            ..Summary::default()
        };
        for row in rows {
            match row.status {
                RowStatus::Pending => summary.pending += 1,
                RowStatus::Processing => summary.processing += 1,
                RowStatus::Completed => summary.completed += 1,
                RowStatus::Error => summary.errors += 1,
            }
        }
        summary
    }

    /// True while a run still has rows to drive or is driving one
    pub fn is_active(&self) -> bool {
        self.pending + self.processing > 0
    }
}

/// Where the rows currently in a store came from
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UploadInfo {
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadInfo {
    pub fn now(file_name: &str) -> Self {
        UploadInfo {
            file_name: file_name.to_string(),
            uploaded_at: Utc::now(),
        }
    }
}
