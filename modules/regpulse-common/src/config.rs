use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the JSON file the bundled binary reads updates from.
    pub updates_path: String,

    /// Dashboard cache time-to-live.
    pub cache_ttl_minutes: i64,

    /// Optional firm profile id to build a narrowed dashboard for.
    pub firm_profile: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            updates_path: required_env("REGPULSE_UPDATES"),
            cache_ttl_minutes: env::var("REGPULSE_CACHE_TTL_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("REGPULSE_CACHE_TTL_MINUTES must be a number"),
            firm_profile: env::var("REGPULSE_FIRM_PROFILE").ok(),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
