use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
    pub legacy_results_fallback: bool,
    pub legacy_grace_ms: u64,
    pub cache_dir: PathBuf,
    pub cache_ttl_hours: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            api_base_url: env::var("SEOSCOPE_API_URL")
                .unwrap_or_else(|_| "https://api.seoscope.io/api/v1".to_string()),
            api_key: env::var("SEOSCOPE_API_KEY").ok(),
            request_timeout_secs: env::var("SEOSCOPE_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            poll_interval_ms: env::var("SEOSCOPE_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            poll_max_attempts: env::var("SEOSCOPE_POLL_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap_or(120),
            legacy_results_fallback: env::var("SEOSCOPE_LEGACY_RESULTS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            legacy_grace_ms: env::var("SEOSCOPE_LEGACY_GRACE_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap_or(1000),
            cache_dir: env::var("SEOSCOPE_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_cache_dir()),
            cache_ttl_hours: env::var("SEOSCOPE_CACHE_TTL_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap_or(24),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn legacy_grace(&self) -> Duration {
        Duration::from_millis(self.legacy_grace_ms)
    }
}

fn default_cache_dir() -> PathBuf {
    match env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".cache").join("seoscope"),
        Err(_) => env::temp_dir().join("seoscope"),
    }
}
