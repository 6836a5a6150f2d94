//! Result transformation: a terminal scan's services map → NormalizedReport.
//!
//! Every extraction step is total. Malformed or missing payloads degrade
//! to their documented defaults and log at debug level, so a report is
//! always produced for a terminal job. Synthesized values carry the
//! `derived`/`placeholder` flags from the report model.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::models::report::{
    CheckStatus, Issue, IssueSeverity, Keyword, NormalizedReport, SecurityCheck, SiteMetrics,
};
use crate::models::scan::{
    self, SERVICE_ACCESSIBILITY, SERVICE_BACKLINKS, SERVICE_DUPLICATE_CONTENT,
    SERVICE_MULTI_LANGUAGE, SERVICE_RANK_TRACKER, SERVICE_SCHEMA,
};
use crate::services::fingerprint;

/// Fallback aggregate score when no service reported one.
pub const DEFAULT_SCORE: u32 = 75;

const MAX_ISSUES: usize = 10;
const MAX_KEYWORDS: usize = 5;

const CSP_SCORE_THRESHOLD: f64 = 80.0;
const MIXED_CONTENT_SCORE_THRESHOLD: f64 = 85.0;

/// Build a normalized report from a terminal job's services map.
pub fn transform(services: &BTreeMap<String, Value>) -> NormalizedReport {
    NormalizedReport {
        score: extract_score(services),
        issues: extract_issues(services),
        metrics: extract_metrics(services),
        security_checks: extract_security_checks(services),
        keywords: extract_keywords(services),
    }
}

/// Aggregate score: rounded mean of the per-service scores that are
/// actually present. 75 when none are.
pub fn extract_score(services: &BTreeMap<String, Value>) -> u32 {
    let sources = [
        (SERVICE_DUPLICATE_CONTENT, "score"),
        (SERVICE_ACCESSIBILITY, "score"),
        (SERVICE_SCHEMA, "score"),
        (SERVICE_MULTI_LANGUAGE, "score"),
        (SERVICE_RANK_TRACKER, "visibility"),
    ];

    let scores: Vec<f64> = sources
        .iter()
        .filter_map(|(service, field)| numeric_field(services, service, field))
        .collect();

    if scores.is_empty() {
        return DEFAULT_SCORE;
    }
    (scores.iter().sum::<f64>() / scores.len() as f64).round() as u32
}

/// Walk services in fixed priority order, emitting at most 10 issues.
///
/// Order: accessibility, schema, multi-language, duplicate-content, then
/// one error issue per failed service (alphabetical by service name).
pub fn extract_issues(services: &BTreeMap<String, Value>) -> Vec<Issue> {
    let mut issues = Vec::new();
    collect_accessibility_issues(services, &mut issues);
    collect_schema_errors(services, &mut issues);
    collect_multi_language_issues(services, &mut issues);
    collect_duplicate_content_issues(services, &mut issues);
    collect_service_failures(services, &mut issues);
    issues.truncate(MAX_ISSUES);
    issues
}

fn collect_accessibility_issues(services: &BTreeMap<String, Value>, issues: &mut Vec<Issue>) {
    let Some(entries) = array_field(services, SERVICE_ACCESSIBILITY, "issues") else {
        return;
    };
    for (i, entry) in entries.iter().enumerate() {
        let severity = match entry.get("severity").and_then(Value::as_str) {
            Some("error") => IssueSeverity::Error,
            Some("info") => IssueSeverity::Info,
            _ => IssueSeverity::Warning,
        };
        let default_impact = match severity {
            IssueSeverity::Error => 80,
            IssueSeverity::Warning => 60,
            IssueSeverity::Info => 40,
        };
        let title = str_or(entry, "title", "Accessibility issue");
        issues.push(Issue {
            id: fingerprint::issue_id(SERVICE_ACCESSIBILITY, i, &title),
            severity,
            description: str_or(entry, "description", &title),
            impact_score: u32_or(entry, "impact", default_impact),
            recommendation: str_or(
                entry,
                "recommendation",
                "Review the flagged element against WCAG guidance",
            ),
            title,
        });
    }
}

fn collect_schema_errors(services: &BTreeMap<String, Value>, issues: &mut Vec<Issue>) {
    let Some(entries) = array_field(services, SERVICE_SCHEMA, "errors") else {
        return;
    };
    for (i, entry) in entries.iter().enumerate() {
        let title = match entry.get("type").and_then(Value::as_str) {
            Some(kind) => format!("Schema error in {kind} markup"),
            None => "Schema markup error".to_string(),
        };
        issues.push(Issue {
            id: fingerprint::issue_id(SERVICE_SCHEMA, i, &title),
            severity: IssueSeverity::Error,
            description: str_or(entry, "message", "Structured data failed validation"),
            impact_score: 70,
            recommendation: "Fix the structured data block so rich results stay eligible"
                .to_string(),
            title,
        });
    }
}

fn collect_multi_language_issues(services: &BTreeMap<String, Value>, issues: &mut Vec<Issue>) {
    let Some(entries) = array_field(services, SERVICE_MULTI_LANGUAGE, "issues") else {
        return;
    };
    for (i, entry) in entries.iter().enumerate() {
        let title = match entry.get("hreflang").and_then(Value::as_str) {
            Some(lang) => format!("Hreflang issue for {lang}"),
            None => str_or(entry, "title", "Hreflang issue"),
        };
        issues.push(Issue {
            id: fingerprint::issue_id(SERVICE_MULTI_LANGUAGE, i, &title),
            severity: IssueSeverity::Warning,
            description: str_or(entry, "description", "Alternate language annotation problem"),
            impact_score: 55,
            recommendation: "Review hreflang annotations for every language variant".to_string(),
            title,
        });
    }
}

fn collect_duplicate_content_issues(services: &BTreeMap<String, Value>, issues: &mut Vec<Issue>) {
    let Some(entries) = array_field(services, SERVICE_DUPLICATE_CONTENT, "duplicates") else {
        return;
    };
    for (i, entry) in entries.iter().enumerate() {
        let url = str_or(entry, "url", "another page");
        let description = match entry.get("similarity").and_then(Value::as_f64) {
            Some(similarity) => format!("Content overlaps {url} ({similarity}% similar)"),
            None => format!("Content overlaps {url}"),
        };
        let title = "Duplicate content detected".to_string();
        issues.push(Issue {
            id: fingerprint::issue_id(SERVICE_DUPLICATE_CONTENT, i, &url),
            severity: IssueSeverity::Warning,
            description,
            impact_score: 65,
            recommendation: "Canonicalize or differentiate the overlapping pages".to_string(),
            title,
        });
    }
}

fn collect_service_failures(services: &BTreeMap<String, Value>, issues: &mut Vec<Issue>) {
    let failures = services
        .iter()
        .filter_map(|(name, payload)| scan::error_marker(payload).map(|e| (name, e)));
    for (i, (name, error)) in failures.enumerate() {
        let title = format!("{name} analysis failed");
        issues.push(Issue {
            id: fingerprint::issue_id(name, i, &title),
            severity: IssueSeverity::Error,
            description: error.to_string(),
            impact_score: 50,
            recommendation: "Re-run the scan; contact support if the failure persists".to_string(),
            title,
        });
    }
}

/// Synthesized performance metrics.
///
/// Approximations derived from unrelated counters, never measurements:
/// load time and request count come from the backlink total, page size
/// from the schema block count. The `derived` flag stays true.
pub fn extract_metrics(services: &BTreeMap<String, Value>) -> SiteMetrics {
    let backlinks = numeric_field(services, SERVICE_BACKLINKS, "total");
    let schema_count = numeric_field(services, SERVICE_SCHEMA, "schemaCount");
    let accessibility = numeric_field(services, SERVICE_ACCESSIBILITY, "score");

    let load_time = backlinks
        .map(|total| (total / 100.0 * 10.0).round() / 10.0)
        .unwrap_or(2.5);
    let page_size = schema_count
        .map(|count| (count * 150.0 + 1200.0) as u64)
        .unwrap_or(1500);
    let requests = backlinks
        .map(|total| ((total / 10.0) as u64).min(50))
        .unwrap_or(25);
    let mobile_score = accessibility
        .map(|score| score.round().clamp(0.0, 100.0) as u32)
        .unwrap_or(DEFAULT_SCORE);
    let desktop_score = (mobile_score + 5).min(100);

    SiteMetrics {
        load_time,
        page_size,
        requests,
        mobile_score,
        desktop_score,
        derived: true,
    }
}

/// Fixed checklist plus one warning per failed service.
///
/// HTTPS is always a pass (the scanner only accepts https targets); the
/// CSP and mixed-content entries are gated on score thresholds, with the
/// 75 default standing in for missing scores.
pub fn extract_security_checks(services: &BTreeMap<String, Value>) -> Vec<SecurityCheck> {
    let accessibility = numeric_field(services, SERVICE_ACCESSIBILITY, "score")
        .unwrap_or(DEFAULT_SCORE as f64);
    let duplicate = numeric_field(services, SERVICE_DUPLICATE_CONTENT, "score")
        .unwrap_or(DEFAULT_SCORE as f64);

    let mut checks = vec![
        SecurityCheck {
            name: "HTTPS".to_string(),
            status: CheckStatus::Pass,
            detail: "Site served over HTTPS".to_string(),
        },
        gated_check(
            "Content Security Policy",
            accessibility >= CSP_SCORE_THRESHOLD,
            "CSP header present and well-formed",
            "CSP header missing or too permissive",
        ),
        gated_check(
            "Mixed content",
            duplicate >= MIXED_CONTENT_SCORE_THRESHOLD,
            "No insecure subresources detected",
            "Some resources may load over plain HTTP",
        ),
    ];

    for (name, error) in services
        .iter()
        .filter_map(|(name, payload)| scan::error_marker(payload).map(|e| (name, e)))
    {
        checks.push(SecurityCheck {
            name: format!("{name} checks"),
            status: CheckStatus::Warning,
            detail: format!("Skipped: {error}"),
        });
    }

    checks
}

fn gated_check(name: &str, pass: bool, pass_detail: &str, warn_detail: &str) -> SecurityCheck {
    SecurityCheck {
        name: name.to_string(),
        status: if pass {
            CheckStatus::Pass
        } else {
            CheckStatus::Warning
        },
        detail: if pass { pass_detail } else { warn_detail }.to_string(),
    }
}

/// Up to five keywords from rank-tracker data, or the fixed filler
/// triple when extraction yields nothing.
pub fn extract_keywords(services: &BTreeMap<String, Value>) -> Vec<Keyword> {
    if let Some(entries) = array_field(services, SERVICE_RANK_TRACKER, "keywords") {
        let extracted: Vec<Keyword> = entries
            .iter()
            .take(MAX_KEYWORDS)
            .filter_map(keyword_from)
            .collect();
        if !extracted.is_empty() {
            return extracted;
        }
        tracing::debug!("rank tracker keywords present but unusable, using placeholders");
    }
    placeholder_keywords()
}

fn keyword_from(entry: &Value) -> Option<Keyword> {
    let term = entry.get("term").and_then(Value::as_str)?;
    Some(Keyword {
        term: term.to_string(),
        frequency: entry
            .get("searchVolume")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        competition: str_or(entry, "competition", "unknown"),
        relevance: u32_or(entry, "relevance", 50),
        placeholder: false,
    })
}

fn placeholder_keywords() -> Vec<Keyword> {
    [
        ("SEO", 45, "high", 95),
        ("Website", 32, "medium", 88),
        ("Analysis", 28, "low", 82),
    ]
    .iter()
    .map(|(term, frequency, competition, relevance)| Keyword {
        term: term.to_string(),
        frequency: *frequency,
        competition: competition.to_string(),
        relevance: *relevance,
        placeholder: true,
    })
    .collect()
}

// -- Field extraction helpers --

fn numeric_field(services: &BTreeMap<String, Value>, service: &str, field: &str) -> Option<f64> {
    let value = services.get(service)?.get(field)?;
    let number = value.as_f64();
    if number.is_none() {
        tracing::debug!(service, field, %value, "expected numeric field");
    }
    number
}

fn array_field<'a>(
    services: &'a BTreeMap<String, Value>,
    service: &str,
    field: &str,
) -> Option<&'a Vec<Value>> {
    let value = services.get(service)?.get(field)?;
    let array = value.as_array();
    if array.is_none() {
        tracing::debug!(service, field, "expected array field");
    }
    array
}

fn str_or(entry: &Value, field: &str, default: &str) -> String {
    entry
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn u32_or(entry: &Value, field: &str, default: u32) -> u32 {
    entry
        .get(field)
        .and_then(Value::as_u64)
        .map(|v| v.min(u32::MAX as u64) as u32)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn services(value: Value) -> BTreeMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    fn fixture_services() -> BTreeMap<String, Value> {
        let job: Value =
            serde_json::from_str(include_str!("../../tests/fixtures/scan_completed.json"))
                .unwrap();
        serde_json::from_value(job["services"].clone()).unwrap()
    }

    #[test]
    fn empty_services_yield_defaults() {
        let report = transform(&BTreeMap::new());
        assert_eq!(report.score, 75);
        assert!(report.issues.is_empty());
        assert_eq!(report.keywords.len(), 3);
        assert!(report.keywords.iter().all(|k| k.placeholder));
        assert_eq!(report.keywords[0].term, "SEO");
        assert_eq!(report.keywords[1].term, "Website");
        assert_eq!(report.keywords[2].term, "Analysis");
    }

    #[test]
    fn score_is_rounded_mean_of_present_scores() {
        let services = services(json!({
            "accessibility": {"score": 80},
            "schema": {"score": 60}
        }));
        assert_eq!(extract_score(&services), 70);
    }

    #[test]
    fn score_includes_rank_tracker_visibility() {
        let services = services(json!({
            "accessibility": {"score": 90},
            "rankTracker": {"visibility": 60}
        }));
        assert_eq!(extract_score(&services), 75);
    }

    #[test]
    fn score_ignores_non_numeric_values() {
        let services = services(json!({
            "accessibility": {"score": "very good"},
            "schema": {"score": 60}
        }));
        assert_eq!(extract_score(&services), 60);
    }

    #[test]
    fn issues_capped_at_ten_in_priority_order() {
        let services = services(json!({
            "accessibility": {"issues": [
                {"title": "A1"}, {"title": "A2"}, {"title": "A3"},
                {"title": "A4"}, {"title": "A5"}
            ]},
            "schema": {"errors": [
                {"message": "S1"}, {"message": "S2"},
                {"message": "S3"}, {"message": "S4"}
            ]},
            "multiLanguage": {"issues": [
                {"title": "M1"}, {"title": "M2"}, {"title": "M3"}
            ]},
            "duplicateContent": {"duplicates": [
                {"url": "https://example.com/a"}, {"url": "https://example.com/b"}
            ]},
            "backlinks": {"status": "error", "error": "crawl blocked"}
        }));

        let issues = extract_issues(&services);
        assert_eq!(issues.len(), 10);

        // 5 accessibility, then 4 schema, then the first multi-language.
        assert_eq!(issues[0].title, "A1");
        assert_eq!(issues[4].title, "A5");
        assert_eq!(issues[5].title, "Schema markup error");
        assert_eq!(issues[5].description, "S1");
        assert_eq!(issues[8].description, "S4");
        assert_eq!(issues[9].title, "M1");
    }

    #[test]
    fn failed_service_synthesizes_one_error_issue() {
        let services = services(json!({
            "backlinks": {"status": "error", "error": "crawl blocked"}
        }));
        let issues = extract_issues(&services);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, IssueSeverity::Error);
        assert_eq!(issues[0].title, "backlinks analysis failed");
        assert_eq!(issues[0].description, "crawl blocked");
    }

    #[test]
    fn malformed_issue_arrays_degrade_to_nothing() {
        let services = services(json!({
            "accessibility": {"issues": "corrupted"},
            "schema": {"errors": 42}
        }));
        assert!(extract_issues(&services).is_empty());
    }

    #[test]
    fn issue_ids_are_stable_across_transforms() {
        let services = services(json!({
            "accessibility": {"issues": [{"title": "Low contrast text"}]}
        }));
        let first = extract_issues(&services);
        let second = extract_issues(&services);
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(first[0].id.len(), 64);
    }

    #[test]
    fn metric_derivation_from_backlinks() {
        let services = services(json!({
            "backlinks": {"total": 500}
        }));
        let metrics = extract_metrics(&services);
        assert_eq!(metrics.load_time, 5.0);
        assert_eq!(metrics.requests, 50);
        assert_eq!(metrics.page_size, 1500);
        assert!(metrics.derived);
    }

    #[test]
    fn request_count_saturates_at_fifty() {
        let services = services(json!({
            "backlinks": {"total": 9000}
        }));
        assert_eq!(extract_metrics(&services).requests, 50);
    }

    #[test]
    fn metric_defaults_without_data() {
        let metrics = extract_metrics(&BTreeMap::new());
        assert_eq!(metrics.load_time, 2.5);
        assert_eq!(metrics.page_size, 1500);
        assert_eq!(metrics.requests, 25);
        assert_eq!(metrics.mobile_score, 75);
        assert_eq!(metrics.desktop_score, 80);
    }

    #[test]
    fn page_size_follows_schema_count() {
        let services = services(json!({
            "schema": {"schemaCount": 4}
        }));
        assert_eq!(extract_metrics(&services).page_size, 1800);
    }

    #[test]
    fn desktop_score_caps_at_hundred() {
        let services = services(json!({
            "accessibility": {"score": 98}
        }));
        let metrics = extract_metrics(&services);
        assert_eq!(metrics.mobile_score, 98);
        assert_eq!(metrics.desktop_score, 100);
    }

    #[test]
    fn security_checks_gate_on_thresholds() {
        let services = services(json!({
            "accessibility": {"score": 85},
            "duplicateContent": {"score": 70}
        }));
        let checks = extract_security_checks(&services);
        assert_eq!(checks.len(), 3);
        assert_eq!(checks[0].name, "HTTPS");
        assert_eq!(checks[0].status, CheckStatus::Pass);
        assert_eq!(checks[1].status, CheckStatus::Pass); // 85 >= 80
        assert_eq!(checks[2].status, CheckStatus::Warning); // 70 < 85
    }

    #[test]
    fn missing_scores_gate_to_warning() {
        let checks = extract_security_checks(&BTreeMap::new());
        assert_eq!(checks[1].status, CheckStatus::Warning);
        assert_eq!(checks[2].status, CheckStatus::Warning);
    }

    #[test]
    fn failed_service_adds_warning_check() {
        let services = services(json!({
            "schema": {"status": "error", "error": "validator crashed"}
        }));
        let checks = extract_security_checks(&services);
        assert_eq!(checks.len(), 4);
        assert_eq!(checks[3].name, "schema checks");
        assert_eq!(checks[3].status, CheckStatus::Warning);
        assert!(checks[3].detail.contains("validator crashed"));
    }

    #[test]
    fn keywords_extracted_from_rank_tracker() {
        let services = services(json!({
            "rankTracker": {"keywords": [
                {"term": "seo audit", "searchVolume": 2400, "competition": "medium", "relevance": 92},
                {"term": "site check", "searchVolume": 900}
            ]}
        }));
        let keywords = extract_keywords(&services);
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[0].term, "seo audit");
        assert_eq!(keywords[0].frequency, 2400);
        assert_eq!(keywords[1].competition, "unknown");
        assert!(keywords.iter().all(|k| !k.placeholder));
    }

    #[test]
    fn keywords_capped_at_five() {
        let entries: Vec<Value> = (0..8)
            .map(|i| json!({"term": format!("kw{i}"), "searchVolume": 100}))
            .collect();
        let services = services(json!({"rankTracker": {"keywords": entries}}));
        assert_eq!(extract_keywords(&services).len(), 5);
    }

    #[test]
    fn unusable_keyword_entries_fall_back_to_placeholders() {
        let services = services(json!({
            "rankTracker": {"keywords": [{"searchVolume": 100}]}
        }));
        let keywords = extract_keywords(&services);
        assert_eq!(keywords.len(), 3);
        assert!(keywords.iter().all(|k| k.placeholder));
    }

    #[test]
    fn fixture_transforms_end_to_end() {
        let report = transform(&fixture_services());

        // (88 + 82 + 76 + 91 + 63) / 5 = 80
        assert_eq!(report.score, 80);

        // One accessibility warning, one schema error.
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[0].title, "Low contrast text");
        assert_eq!(report.issues[1].title, "Schema error in Product markup");

        assert_eq!(report.metrics.load_time, 5.0);
        assert_eq!(report.metrics.requests, 50);
        assert_eq!(report.metrics.page_size, 1800);
        assert_eq!(report.metrics.mobile_score, 82);
        assert_eq!(report.metrics.desktop_score, 87);

        assert_eq!(report.security_checks.len(), 3);
        assert_eq!(report.security_checks[1].status, CheckStatus::Pass); // 82 >= 80
        assert_eq!(report.security_checks[2].status, CheckStatus::Pass); // 88 >= 85

        assert_eq!(report.keywords.len(), 1);
        assert_eq!(report.keywords[0].term, "seo audit");
        assert!(!report.keywords[0].placeholder);
    }
}
