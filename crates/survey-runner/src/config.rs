//! Runner configuration from environment.

use std::env;
use std::time::Duration;

use survey_core::SimulationConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub simulation: SimulationConfig,
    /// Time between scheduled frames, in milliseconds
    pub frame_interval_ms: u64,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            frame_interval_ms: 16,
            log_json: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            simulation: SimulationConfig {
                segment_duration_ms: parse_env("SURVEY_SEGMENT_MS")
                    .unwrap_or(defaults.simulation.segment_duration_ms),
                progress_hysteresis_pct: parse_env("SURVEY_HYSTERESIS_PCT")
                    .filter(|pct: &f64| pct.is_finite() && *pct >= 0.0)
                    .unwrap_or(defaults.simulation.progress_hysteresis_pct),
            },
            frame_interval_ms: parse_env("SURVEY_FRAME_INTERVAL_MS")
                .filter(|ms: &u64| *ms > 0)
                .unwrap_or(defaults.frame_interval_ms),
            log_json: env::var("SURVEY_LOG_JSON")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.log_json),
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
