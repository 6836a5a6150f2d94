//! Scan job wire model shared by the primary and legacy status endpoints.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

// -- Known services --

pub const SERVICE_ACCESSIBILITY: &str = "accessibility";
pub const SERVICE_SCHEMA: &str = "schema";
pub const SERVICE_MULTI_LANGUAGE: &str = "multiLanguage";
pub const SERVICE_DUPLICATE_CONTENT: &str = "duplicateContent";
pub const SERVICE_BACKLINKS: &str = "backlinks";
pub const SERVICE_RANK_TRACKER: &str = "rankTracker";

/// Backend execution order; drives the progress grid.
pub const SERVICE_NAMES: [&str; 6] = [
    SERVICE_ACCESSIBILITY,
    SERVICE_SCHEMA,
    SERVICE_MULTI_LANGUAGE,
    SERVICE_DUPLICATE_CONTENT,
    SERVICE_BACKLINKS,
    SERVICE_RANK_TRACKER,
];

// -- Status --

/// Lifecycle states reported by the backend for a scan job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Partial,
    Failed,
}

impl ScanStatus {
    /// Terminal states never change again for a given job id.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Partial | Self::Failed)
    }

    /// Check whether a status change observed between two polls moves forward.
    ///
    /// The backend guarantees forward-only transitions; a regression means
    /// the two responses came from inconsistent sources.
    pub fn is_valid_transition(from: ScanStatus, to: ScanStatus) -> bool {
        from == to
            || matches!(
                (from, to),
                (Self::Pending, Self::Running)
                    | (Self::Pending, Self::Completed)
                    | (Self::Pending, Self::Partial)
                    | (Self::Pending, Self::Failed)
                    | (Self::Running, Self::Completed)
                    | (Self::Running, Self::Partial)
                    | (Self::Running, Self::Failed)
            )
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

// -- Progress --

/// Raw progress counters as reported by the backend.
///
/// Values arrive unvalidated; clamping happens at projection time so a
/// misbehaving response can never panic the client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    pub completed_services: i64,
    pub total_services: i64,
    pub percentage: i64,
}

// -- Job --

/// One in-flight or completed analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanJob {
    pub id: String,
    pub target_url: String,
    pub status: ScanStatus,
    pub progress: ScanProgress,
    /// Service name to raw result payload, or an error marker
    /// `{"status":"error","error":"..."}` for a failed service.
    #[serde(default)]
    pub services: BTreeMap<String, Value>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Extract the error string when a service payload is an error marker.
pub fn error_marker(payload: &Value) -> Option<&str> {
    if payload.get("status").and_then(Value::as_str) != Some("error") {
        return None;
    }
    Some(
        payload
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error"),
    )
}

impl ScanJob {
    /// Services whose payload is an error marker, with their error strings.
    ///
    /// Iteration order is the map's key order, so downstream issue lists
    /// stay deterministic.
    pub fn failed_services(&self) -> impl Iterator<Item = (&str, &str)> {
        self.services
            .iter()
            .filter_map(|(name, payload)| error_marker(payload).map(|e| (name.as_str(), e)))
    }
}

// -- Scan submission --

/// Request body for submitting a new scan.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct StartScanRequest {
    #[validate(url(message = "target must be an absolute http(s) URL"))]
    pub url: String,
}
