use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::error;

const DEFAULT_TICK_MS: u64 = 2000;
const DEFAULT_FEED_URL: &str = "ws://127.0.0.1:8787/feed";
const DEFAULT_PLAN_URL: &str = "http://127.0.0.1:8788/plan";

/// `boardd.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// Default feed address for `--connect` without an argument.
    feed_url: Option<String>,
    /// Engine tick interval in milliseconds (default: 2000).
    tick_ms: Option<u64>,
    /// Plan generator endpoint (default: http://127.0.0.1:8788/plan).
    plan_url: Option<String>,
    /// Bearer token for the plan generator. Omit to disable planning.
    plan_token: Option<String>,
    /// Log level filter string, e.g. "debug", "info,boardd=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default) | "json".
    log_format: Option<String>,
}

fn load_toml(path: &Path) -> Option<TomlConfig> {
    let contents = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse boardd.toml — using defaults");
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub feed_url: String,
    pub tick_ms: u64,
    pub plan_url: String,
    /// None means planning is unconfigured; `start_plan` fails with a
    /// configuration error.
    pub plan_token: Option<String>,
    pub log: String,
    pub log_format: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            tick_ms: DEFAULT_TICK_MS,
            plan_url: DEFAULT_PLAN_URL.to_string(),
            plan_token: None,
            log: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl BoardConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file (default path: ./boardd.toml)
    ///   3. Built-in defaults
    pub fn new(
        config_path: Option<PathBuf>,
        tick_ms: Option<u64>,
        log: Option<String>,
        log_format: Option<String>,
    ) -> Self {
        let path = config_path.unwrap_or_else(|| PathBuf::from("boardd.toml"));
        let toml = load_toml(&path).unwrap_or_default();

        let feed_url = std::env::var("BOARDD_FEED_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.feed_url)
            .unwrap_or_else(|| DEFAULT_FEED_URL.to_string());
        let tick_ms = tick_ms.or(toml.tick_ms).unwrap_or(DEFAULT_TICK_MS);

        let plan_url = std::env::var("BOARDD_PLAN_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.plan_url)
            .unwrap_or_else(|| DEFAULT_PLAN_URL.to_string());

        let plan_token = std::env::var("BOARDD_PLAN_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .or(toml.plan_token);

        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());
        let log_format = log_format
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        Self {
            feed_url,
            tick_ms,
            plan_url,
            plan_token,
            log,
            log_format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("boardd.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let cfg = BoardConfig::new(
            Some(PathBuf::from("/nonexistent/boardd.toml")),
            None,
            None,
            None,
        );
        assert_eq!(cfg.tick_ms, DEFAULT_TICK_MS);
        assert_eq!(cfg.log, "info");
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "tick_ms = 500\n");
        let cfg = BoardConfig::new(Some(path), None, None, None);
        assert_eq!(cfg.tick_ms, 500);
    }

    #[test]
    fn test_cli_overrides_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "tick_ms = 500\n");
        let cfg = BoardConfig::new(Some(path), Some(250), None, None);
        assert_eq!(cfg.tick_ms, 250);
    }

    #[test]
    fn test_invalid_toml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "tick_ms = \"not a number");
        let cfg = BoardConfig::new(Some(path), None, None, None);
        assert_eq!(cfg.tick_ms, DEFAULT_TICK_MS);
    }
}
