//! Report rendering for the terminal and machine formats.

use std::io::Write;

use colored::Colorize;
use regex::Regex;

use crate::models::report::{CheckStatus, IssueSeverity, NormalizedReport};
use crate::models::scan::ScanJob;
use crate::services::progress::{ProgressView, ServiceState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Render a normalized report in the requested format.
pub fn render_report(
    job: &ScanJob,
    report: &NormalizedReport,
    format: OutputFormat,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report),
        OutputFormat::Text => Ok(render_text(job, report)),
    }
}

fn render_text(job: &ScanJob, report: &NormalizedReport) -> String {
    let mut out = String::new();

    let host = display_host(&job.target_url);
    out.push_str(&format!(
        "{} {host}\n",
        "SEO report for".bold()
    ));
    out.push_str(&format!(
        "Overall score: {}\n\n",
        score_label(report.score)
    ));

    if report.issues.is_empty() {
        out.push_str(&format!("{}\n", "No issues found.".green()));
    } else {
        out.push_str(&format!("Issues ({}):\n", report.issues.len()));
        for issue in &report.issues {
            out.push_str(&format!(
                "  [{}] {} — {} (impact {})\n",
                severity_label(issue.severity),
                issue.title,
                issue.description,
                issue.impact_score
            ));
            out.push_str(&format!("        fix: {}\n", issue.recommendation.dimmed()));
        }
    }

    out.push_str(&format!(
        "\nMetrics {}:\n",
        "(derived, not measured)".dimmed()
    ));
    out.push_str(&format!(
        "  load time {:.1}s | page size {} KB | {} requests | mobile {} | desktop {}\n",
        report.metrics.load_time,
        report.metrics.page_size,
        report.metrics.requests,
        report.metrics.mobile_score,
        report.metrics.desktop_score
    ));

    out.push_str("\nSecurity checks:\n");
    for check in &report.security_checks {
        out.push_str(&format!(
            "  {} {} — {}\n",
            check_label(check.status),
            check.name,
            check.detail
        ));
    }

    out.push_str("\nKeywords:\n");
    for keyword in &report.keywords {
        let marker = if keyword.placeholder {
            " (placeholder)".dimmed().to_string()
        } else {
            String::new()
        };
        out.push_str(&format!(
            "  {} — volume {}, competition {}, relevance {}{marker}\n",
            keyword.term, keyword.frequency, keyword.competition, keyword.relevance
        ));
    }

    out
}

/// One-line progress grid for live poll updates.
pub fn render_progress(view: &ProgressView) -> String {
    let services: Vec<String> = view
        .services
        .iter()
        .map(|service| {
            let glyph = match service.state {
                ServiceState::Done => "✔".green().to_string(),
                ServiceState::InProgress => "▸".yellow().to_string(),
                ServiceState::Pending => "·".dimmed().to_string(),
            };
            format!("{glyph} {}", service.name)
        })
        .collect();
    format!("{:>3}% | {}", view.percentage, services.join(" | "))
}

/// Write the issue list as CSV.
pub fn write_issues_csv<W: Write>(report: &NormalizedReport, writer: W) -> csv::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for issue in &report.issues {
        csv_writer.serialize(issue)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Bare host of the target URL for headings; falls back to the raw URL.
pub fn display_host(url: &str) -> String {
    match Regex::new(r"^https?://(?:www\.)?([^/]+)") {
        Ok(re) => re
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|host| host.as_str().to_string())
            .unwrap_or_else(|| url.to_string()),
        Err(_) => url.to_string(),
    }
}

fn score_label(score: u32) -> String {
    let text = format!("{score}/100");
    if score >= 80 {
        text.green().bold().to_string()
    } else if score >= 60 {
        text.yellow().bold().to_string()
    } else {
        text.red().bold().to_string()
    }
}

fn severity_label(severity: IssueSeverity) -> String {
    match severity {
        IssueSeverity::Error => "error".red().to_string(),
        IssueSeverity::Warning => "warning".yellow().to_string(),
        IssueSeverity::Info => "info".blue().to_string(),
    }
}

fn check_label(status: CheckStatus) -> String {
    match status {
        CheckStatus::Pass => "✔".green().to_string(),
        CheckStatus::Warning => "!".yellow().to_string(),
        CheckStatus::Fail => "✘".red().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use chrono::Utc;

    use crate::models::scan::{ScanJob, ScanProgress, ScanStatus};
    use crate::services::report::transform;

    fn sample_job() -> ScanJob {
        ScanJob {
            id: "job-1".to_string(),
            target_url: "https://www.example.com/pricing".to_string(),
            status: ScanStatus::Completed,
            progress: ScanProgress {
                completed_services: 6,
                total_services: 6,
                percentage: 100,
            },
            services: BTreeMap::new(),
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
        }
    }

    #[test]
    fn display_host_strips_scheme_and_www() {
        assert_eq!(display_host("https://www.example.com/pricing"), "example.com");
        assert_eq!(display_host("http://sub.example.org"), "sub.example.org");
        assert_eq!(display_host("not a url"), "not a url");
    }

    #[test]
    fn text_report_mentions_host_and_placeholders() {
        colored::control::set_override(false);
        let job = sample_job();
        let report = transform(&job.services);
        let text = render_report(&job, &report, OutputFormat::Text).unwrap();
        assert!(text.contains("example.com"));
        assert!(text.contains("75/100"));
        assert!(text.contains("(placeholder)"));
        assert!(text.contains("derived, not measured"));
    }

    #[test]
    fn json_report_is_machine_readable() {
        let job = sample_job();
        let report = transform(&job.services);
        let json = render_report(&job, &report, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["score"], 75);
        assert_eq!(value["keywords"][0]["placeholder"], true);
    }

    #[test]
    fn progress_line_includes_percentage_and_states() {
        colored::control::set_override(false);
        let view = crate::services::progress::project(
            &ScanProgress {
                completed_services: 1,
                total_services: 6,
                percentage: 17,
            },
            &crate::models::scan::SERVICE_NAMES,
        );
        let line = render_progress(&view);
        assert!(line.contains("17%"));
        assert!(line.contains("accessibility"));
    }

    #[test]
    fn issues_csv_has_one_row_per_issue() {
        let services: BTreeMap<String, serde_json::Value> = serde_json::from_value(
            serde_json::json!({
                "accessibility": {"issues": [{"title": "A1"}, {"title": "A2"}]}
            }),
        )
        .unwrap();
        let report = transform(&services);

        let mut buffer = Vec::new();
        write_issues_csv(&report, &mut buffer).unwrap();
        let csv = String::from_utf8(buffer).unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3); // header + 2 rows
        assert!(lines[0].contains("impactScore"));
        assert!(lines[1].contains("A1"));
    }
}
