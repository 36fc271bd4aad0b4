// ── Runtime connection configuration ──
//
// Describes *which* commerce API to talk to and how: base URL, bearer
// token, transport tuning. Loadable from a TOML file with MERCHKIT_*
// environment overrides; embedders may also construct it directly and
// never touch disk.

use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use merchkit_api::TransportConfig;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config ──────────────────────────────────────────────────────────

/// Connection settings for one commerce API.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    /// Base URL of the API (e.g. `https://api.example.com/`).
    pub api_base: Url,

    /// Bearer token (plaintext — prefer `token_env`).
    #[serde(default)]
    pub token: Option<String>,

    /// Environment variable containing the bearer token. Wins over
    /// `token` when set and present.
    #[serde(default)]
    pub token_env: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("merchkit/", env!("CARGO_PKG_VERSION")).to_owned()
}

impl ControlConfig {
    /// Load from an optional TOML file, then apply `MERCHKIT_*`
    /// environment overrides (`MERCHKIT_API_BASE`, `MERCHKIT_TOKEN`, …).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        let config: Self = figment.merge(Env::prefixed("MERCHKIT_")).extract()?;
        Ok(config)
    }

    /// Translate into the transport configuration the gateway consumes.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: Duration::from_secs(self.timeout),
            user_agent: self.user_agent.clone(),
            bearer_token: self.bearer(),
        }
    }

    /// Join a resource path onto the API base — the usual way to build
    /// controller identities and parent endpoints.
    pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        self.api_base
            .join(path)
            .map_err(|e| ConfigError::Validation {
                field: "api_base".into(),
                reason: e.to_string(),
            })
    }

    fn bearer(&self) -> Option<SecretString> {
        if let Some(ref var) = self.token_env {
            if let Ok(value) = std::env::var(var) {
                return Some(SecretString::from(value));
            }
        }
        self.token.clone().map(SecretString::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn file_and_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "merchkit.toml",
                r#"
                    api_base = "https://api.example.com/"
                    token = "plain"
                "#,
            )?;

            let config = ControlConfig::load(Some(Path::new("merchkit.toml")))
                .expect("file config loads");
            assert_eq!(config.api_base.as_str(), "https://api.example.com/");
            assert_eq!(config.timeout, 30);
            assert!(config.user_agent.starts_with("merchkit/"));
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "merchkit.toml",
                r#"
                    api_base = "https://file.example.com/"
                    timeout = 10
                "#,
            )?;
            jail.set_env("MERCHKIT_API_BASE", "https://env.example.com/");
            jail.set_env("MERCHKIT_TIMEOUT", "5");

            let config = ControlConfig::load(Some(Path::new("merchkit.toml")))
                .expect("env overrides load");
            assert_eq!(config.api_base.as_str(), "https://env.example.com/");
            assert_eq!(config.timeout, 5);
            Ok(())
        });
    }

    #[test]
    fn token_env_wins_over_plaintext() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MERCHKIT_API_BASE", "https://api.example.com/");
            jail.set_env("MERCHKIT_TOKEN", "plain");
            jail.set_env("MERCHKIT_TOKEN_ENV", "ADMIN_TOKEN");
            jail.set_env("ADMIN_TOKEN", "from-env");

            let config = ControlConfig::load(None).expect("env config loads");
            let transport = config.transport();
            let token = transport.bearer_token.expect("token resolved");
            assert_eq!(token.expose_secret(), "from-env");
            Ok(())
        });
    }

    #[test]
    fn endpoint_joins_onto_base() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MERCHKIT_API_BASE", "https://api.example.com/");

            let config = ControlConfig::load(None).expect("env config loads");
            let url = config.endpoint("customers/42").expect("joinable path");
            assert_eq!(url.as_str(), "https://api.example.com/customers/42");
            Ok(())
        });
    }
}
