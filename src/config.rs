use crate::error::{BoardError, Result};
use std::{collections::HashMap, fmt, path::Path, str::FromStr, time::Duration};

/// Where ticker data comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetricsSource {
    /// Deterministic seed data, no updates
    Static,
    /// Locally synthesized random walk
    #[default]
    Synth,
    /// REST snapshot plus WebSocket deltas from the backend
    Ws,
}

impl FromStr for MetricsSource {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "synth" => Ok(Self::Synth),
            "ws" => Ok(Self::Ws),
            other => Err(BoardError::Config(format!(
                "Invalid metrics source '{}'. Valid sources: static, synth, ws",
                other
            ))),
        }
    }
}

impl fmt::Display for MetricsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Synth => write!(f, "synth"),
            Self::Ws => write!(f, "ws"),
        }
    }
}

/// Client configuration.
///
/// | Env Var                           | Default                 |
/// |-----------------------------------|-------------------------|
/// | `PULSEBOARD_API_BASE_URL`         | `http://localhost:8000` |
/// | `PULSEBOARD_WS_BASE_URL`          | `ws://localhost:8000`   |
/// | `PULSEBOARD_API_SCOPE`            | none                    |
/// | `PULSEBOARD_API_TOKEN`            | none                    |
/// | `PULSEBOARD_METRICS_SOURCE`       | `synth`                 |
/// | `PULSEBOARD_TICKER_INTERVAL_MS`   | `3000`                  |
/// | `PULSEBOARD_TICKER_HISTORY`       | `30`                    |
/// | `PULSEBOARD_REQUEST_TIMEOUT_SECS` | `30`                    |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub ws_base_url: String,
    pub api_scope: Option<String>,
    pub api_token: Option<String>,
    pub metrics_source: MetricsSource,
    pub ticker_interval: Duration,
    pub ticker_history: usize,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            ws_base_url: "ws://localhost:8000".to_string(),
            api_scope: None,
            api_token: None,
            metrics_source: MetricsSource::Synth,
            ticker_interval: Duration::from_millis(3000),
            ticker_history: 30,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Loads `.env` if present, then reads the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads an env file without touching the process environment
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        let iter = dotenvy::from_path_iter(path.as_ref())
            .map_err(|e| BoardError::Config(e.to_string()))?;
        let mut vars = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| BoardError::Config(e.to_string()))?;
            vars.insert(key, value);
        }
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Builds a config from any key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_base_url = get("PULSEBOARD_API_BASE_URL")
            .map(|url| trim_base_url(&url))
            .unwrap_or(defaults.api_base_url);
        let ws_base_url = get("PULSEBOARD_WS_BASE_URL")
            .map(|url| trim_base_url(&url))
            .unwrap_or(defaults.ws_base_url);

        let metrics_source = match get("PULSEBOARD_METRICS_SOURCE") {
            Some(raw) => raw.parse()?,
            None => defaults.metrics_source,
        };

        let ticker_interval = match get("PULSEBOARD_TICKER_INTERVAL_MS") {
            Some(raw) => Duration::from_millis(parse_number(
                "PULSEBOARD_TICKER_INTERVAL_MS",
                &raw,
            )?),
            None => defaults.ticker_interval,
        };
        if ticker_interval.is_zero() {
            return Err(BoardError::Config(
                "PULSEBOARD_TICKER_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }

        let ticker_history = match get("PULSEBOARD_TICKER_HISTORY") {
            Some(raw) => parse_number("PULSEBOARD_TICKER_HISTORY", &raw)? as usize,
            None => defaults.ticker_history,
        };

        let request_timeout = match get("PULSEBOARD_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number(
                "PULSEBOARD_REQUEST_TIMEOUT_SECS",
                &raw,
            )?),
            None => defaults.request_timeout,
        };

        Ok(Self {
            api_base_url,
            ws_base_url,
            api_scope: get("PULSEBOARD_API_SCOPE"),
            api_token: get("PULSEBOARD_API_TOKEN"),
            metrics_source,
            ticker_interval,
            ticker_history,
            request_timeout,
        })
    }
}

fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_number(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| BoardError::Config(format!("{} must be a non-negative integer, got '{}'", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.metrics_source, MetricsSource::Synth);
        assert_eq!(config.ticker_history, 30);
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("PULSEBOARD_API_BASE_URL", "https://api.example.com/"),
            ("PULSEBOARD_METRICS_SOURCE", "WS"),
            ("PULSEBOARD_TICKER_INTERVAL_MS", "500"),
            ("PULSEBOARD_API_TOKEN", "abc"),
            ("PULSEBOARD_API_SCOPE", ""),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.metrics_source, MetricsSource::Ws);
        assert_eq!(config.ticker_interval, Duration::from_millis(500));
        assert_eq!(config.api_token.as_deref(), Some("abc"));
        assert_eq!(config.api_scope, None);
    }

    #[test]
    fn test_invalid_values() {
        let err = ClientConfig::from_lookup(lookup(&[("PULSEBOARD_METRICS_SOURCE", "kafka")]))
            .unwrap_err();
        assert!(matches!(err, BoardError::Config(_)));

        let err = ClientConfig::from_lookup(lookup(&[("PULSEBOARD_TICKER_HISTORY", "-1")]))
            .unwrap_err();
        assert!(matches!(err, BoardError::Config(_)));

        let err = ClientConfig::from_lookup(lookup(&[("PULSEBOARD_TICKER_INTERVAL_MS", "0")]))
            .unwrap_err();
        assert!(matches!(err, BoardError::Config(_)));
    }

    #[test]
    fn test_from_env_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "PULSEBOARD_WS_BASE_URL=wss://feed.example.com/").unwrap();
        writeln!(file, "PULSEBOARD_METRICS_SOURCE=static").unwrap();

        let config = ClientConfig::from_env_file(file.path()).unwrap();
        assert_eq!(config.ws_base_url, "wss://feed.example.com");
        assert_eq!(config.metrics_source, MetricsSource::Static);
        assert_eq!(config.api_base_url, "http://localhost:8000");
    }
}
