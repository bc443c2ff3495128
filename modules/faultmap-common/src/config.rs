use std::env;
use std::time::Duration;

use tracing::info;

use crate::types::BoundingBox;

/// Leiria district envelope.
pub const DEFAULT_DISTRICT_BOUNDS: BoundingBox = BoundingBox {
    min_lat: 39.15,
    max_lat: 40.15,
    min_lng: -9.45,
    max_lng: -8.05,
};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: Option<String>,

    // Reference data
    pub boundaries_path: String,
    pub district_bounds: BoundingBox,

    // Augmented priority classification
    pub priority_ai_enabled: bool,
    pub anthropic_api_key: Option<String>,
    pub priority_ai_model: String,
    pub priority_ai_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            boundaries_path: "data/boundaries.geojson".to_string(),
            district_bounds: DEFAULT_DISTRICT_BOUNDS,
            priority_ai_enabled: false,
            anthropic_api_key: None,
            priority_ai_model: "claude-3-5-haiku-latest".to_string(),
            priority_ai_timeout: Duration::from_millis(3000),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if a variable is present but malformed.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: optional_env("DATABASE_URL"),
            boundaries_path: env::var("BOUNDARIES_PATH").unwrap_or(defaults.boundaries_path),
            district_bounds: BoundingBox {
                min_lat: parsed_env("DISTRICT_MIN_LAT", defaults.district_bounds.min_lat),
                max_lat: parsed_env("DISTRICT_MAX_LAT", defaults.district_bounds.max_lat),
                min_lng: parsed_env("DISTRICT_MIN_LNG", defaults.district_bounds.min_lng),
                max_lng: parsed_env("DISTRICT_MAX_LNG", defaults.district_bounds.max_lng),
            },
            priority_ai_enabled: flag_env("PRIORITY_AI_ENABLED", false),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            priority_ai_model: env::var("PRIORITY_AI_MODEL").unwrap_or(defaults.priority_ai_model),
            priority_ai_timeout: Duration::from_millis(parsed_env("PRIORITY_AI_TIMEOUT_MS", 3000)),
        }
    }

    /// The Postgres URL, for binaries that cannot run without one.
    pub fn require_database_url(&self) -> &str {
        self.database_url
            .as_deref()
            .unwrap_or_else(|| panic!("DATABASE_URL environment variable is required"))
    }

    /// Log the loaded configuration with secrets masked.
    pub fn log_redacted(&self) {
        info!(
            database_url = redact(self.database_url.as_deref()),
            boundaries_path = self.boundaries_path.as_str(),
            min_lat = self.district_bounds.min_lat,
            max_lat = self.district_bounds.max_lat,
            min_lng = self.district_bounds.min_lng,
            max_lng = self.district_bounds.max_lng,
            priority_ai_enabled = self.priority_ai_enabled,
            anthropic_api_key = redact(self.anthropic_api_key.as_deref()),
            priority_ai_model = self.priority_ai_model.as_str(),
            priority_ai_timeout_ms = self.priority_ai_timeout.as_millis() as u64,
            "Loaded config"
        );
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} has an invalid value: {raw}")),
        Err(_) => default,
    }
}

/// Accepts `1/0`, `true/false`, `yes/no`, `on/off` in any case.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn flag_env(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => parse_flag(&raw)
            .unwrap_or_else(|| panic!("{key} has an invalid value: {raw} (expected true/false, 1/0, yes/no, on/off)")),
        Err(_) => default,
    }
}

fn redact(value: Option<&str>) -> &'static str {
    match value {
        Some(_) => "[set]",
        None => "[unset]",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_flag_spellings_are_accepted() {
        for raw in ["1", "true", "TRUE", "True", "yes", "on", " On "] {
            assert_eq!(parse_flag(raw), Some(true), "{raw}");
        }
        for raw in ["0", "false", "FALSE", "no", "off", ""] {
            assert_eq!(parse_flag(raw), Some(false), "{raw}");
        }
    }

    #[test]
    fn unknown_flag_spelling_is_rejected() {
        assert_eq!(parse_flag("enabled"), None);
        assert_eq!(parse_flag("2"), None);
    }
}
