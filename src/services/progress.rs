//! Progress projection for the scan status grid.

use serde::Serialize;

use crate::models::scan::ScanProgress;

/// Tri-state display label for one service slot.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceState {
    Done,
    InProgress,
    Pending,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServiceProgress {
    pub name: String,
    pub state: ServiceState,
}

/// Display-ready projection of raw progress counters.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressView {
    /// Clamped to 0..=100.
    pub percentage: u8,
    pub services: Vec<ServiceProgress>,
}

/// Project raw progress counters onto the fixed service list.
///
/// Total function: out-of-range counters are clamped, never rejected.
/// The service at ordinal `completed_services` is the one in flight;
/// everything before it is done, everything after still pending.
pub fn project(progress: &ScanProgress, service_names: &[&str]) -> ProgressView {
    let percentage = progress.percentage.clamp(0, 100) as u8;
    let completed = progress
        .completed_services
        .clamp(0, service_names.len() as i64);

    let services = service_names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let state = if (i as i64) < completed {
                ServiceState::Done
            } else if (i as i64) == completed {
                ServiceState::InProgress
            } else {
                ServiceState::Pending
            };
            ServiceProgress {
                name: (*name).to_string(),
                state,
            }
        })
        .collect();

    ProgressView {
        percentage,
        services,
    }
}
