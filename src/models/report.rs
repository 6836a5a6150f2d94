//! Client-derived normalized report structures.
//!
//! A `NormalizedReport` is a pure projection of a terminal scan's raw
//! per-service payloads. Synthesized values are labelled as such
//! (`derived`, `placeholder`) so callers can tell them apart from
//! real measurements.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
    Info,
}

/// One extracted finding, bounded to 10 per report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Stable fingerprint of (service, ordinal, title).
    pub id: String,
    pub severity: IssueSeverity,
    pub title: String,
    pub description: String,
    pub impact_score: u32,
    pub recommendation: String,
}

/// Synthesized performance numbers.
///
/// `derived` is always true: these are approximations computed from
/// unrelated counters, not independent measurements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMetrics {
    /// Seconds, one decimal.
    pub load_time: f64,
    /// Kilobytes.
    pub page_size: u64,
    pub requests: u64,
    pub mobile_score: u32,
    pub desktop_score: u32,
    pub derived: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityCheck {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

/// One keyword entry, extracted from rank-tracker data or filler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyword {
    pub term: String,
    pub frequency: u64,
    pub competition: String,
    pub relevance: u32,
    /// True when this entry is fallback filler, not extracted data.
    pub placeholder: bool,
}

/// Display-ready projection of a terminal scan's services map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedReport {
    pub score: u32,
    pub issues: Vec<Issue>,
    pub metrics: SiteMetrics,
    pub security_checks: Vec<SecurityCheck>,
    pub keywords: Vec<Keyword>,
}
