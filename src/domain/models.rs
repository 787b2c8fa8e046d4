use serde::{Deserialize, Serialize};
use std::fmt;

/// Lookup status of a dm+d code as reported by the terminology server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeStatus {
    Active,
    Inactive,
    Unknown,
}

impl CodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeStatus::Active => "active",
            CodeStatus::Inactive => "inactive",
            CodeStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate dm+d code found in a measure folder's SQL file.
///
/// Created by extraction with `status: None` (unset); the reconciler sets the
/// status exactly once after the batch lookup. The same numeric code appearing
/// in two folders yields two records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeRecord {
    pub code: String,
    pub folder: String,
    pub url: String,
    pub status: Option<CodeStatus>,
}

impl CodeRecord {
    pub fn new(code: String, folder: String, url: String) -> Self {
        Self {
            code,
            folder,
            url,
            status: None,
        }
    }

    /// Status for grouping and problem checks: unset records count as unknown.
    pub fn effective_status(&self) -> CodeStatus {
        self.status.unwrap_or(CodeStatus::Unknown)
    }

    pub fn is_problem(&self) -> bool {
        matches!(
            self.effective_status(),
            CodeStatus::Inactive | CodeStatus::Unknown
        )
    }
}

/// Result of a single run of the controller.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RunOutcome {
    /// A report for this version already exists and mode was not forced.
    Skipped { version: String },
    /// Reports were written; records carry their reconciled statuses.
    Completed {
        version: String,
        records: Vec<CodeRecord>,
    },
}

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}
