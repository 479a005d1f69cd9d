use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;

/// Process configuration, read once at start-up from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "weather_server", about = "Weather lookup proxy for the globe viewer")]
pub struct ServerConfig {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Upstream credential. Requests fail with 500 while it is unset.
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "WEATHER_UPSTREAM_URL", default_value = "https://api.openweathermap.org")]
    pub upstream_url: String,

    #[arg(long, env = "WEATHER_UPSTREAM_TIMEOUT_MS", default_value_t = 5000)]
    pub upstream_timeout_ms: u64,

    /// Requests allowed per client address per window on `/api/*`.
    #[arg(long, env = "RATE_LIMIT_MAX", default_value_t = 100)]
    pub rate_limit_max: u32,

    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 900)]
    pub rate_limit_window_secs: u64,
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    /// Treats an empty key the same as a missing one.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 3000,
            api_key: None,
            upstream_url: "https://api.openweathermap.org".to_string(),
            upstream_timeout_ms: 5000,
            rate_limit_max: 100,
            rate_limit_window_secs: 15 * 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ServerConfig;
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn flags_override_defaults() {
        let cfg = ServerConfig::try_parse_from([
            "weather_server",
            "--port",
            "8080",
            "--api-key",
            "secret",
            "--upstream-timeout-ms",
            "250",
        ])
        .expect("parse");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.api_key(), Some("secret"));
        assert_eq!(cfg.upstream_timeout(), Duration::from_millis(250));
        assert_eq!(cfg.rate_limit_max, 100);
        assert_eq!(cfg.rate_limit_window(), Duration::from_secs(900));
    }

    #[test]
    fn empty_api_key_counts_as_missing() {
        let cfg = ServerConfig {
            api_key: Some(String::new()),
            ..ServerConfig::default()
        };
        assert_eq!(cfg.api_key(), None);
    }

    #[test]
    fn default_binds_all_interfaces_on_3000() {
        assert_eq!(ServerConfig::default().addr().to_string(), "0.0.0.0:3000");
    }
}
