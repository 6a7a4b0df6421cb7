//! Environment-driven server configuration.
//!
//! Values come from the process environment; `main` loads `.env` first.
//! Blank values count as unset so an empty `ANTHROPIC_API_KEY=` line in a
//! `.env` file does not enable the gateway.

use std::env;
use std::fmt;
use std::net::SocketAddr;

use tracing::warn;

use crate::error::AppError;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8001;

pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Credential wrapper that never prints its value.
#[derive(Clone, PartialEq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<ApiKey>,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
}

impl LlmSettings {
    pub fn key_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
    pub llm: LlmSettings,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let llm = LlmSettings {
            api_key: get(API_KEY_VAR).map(ApiKey::new),
            model: get("NEXUS_LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get("NEXUS_LLM_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_tokens: parse_or("NEXUS_LLM_MAX_TOKENS", get("NEXUS_LLM_MAX_TOKENS"), DEFAULT_MAX_TOKENS),
        };

        Self {
            host: get("NEXUS_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or("NEXUS_PORT", get("NEXUS_PORT"), DEFAULT_PORT),
            cors_origins: parse_list(&get("NEXUS_CORS_ORIGINS").unwrap_or_default()),
            llm,
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::InvalidConfig(format!("bad bind address {}:{}: {}", self.host, self.port, e)))
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default_val: T) -> T {
    match raw {
        Some(v) => v.parse().unwrap_or_else(|_| {
            warn!("{} has unparsable value {:?}; using default", key, v);
            default_val
        }),
        None => default_val,
    }
}

/// Comma-separated list; `*` alone means "no restriction".
fn parse_list(raw: &str) -> Vec<String> {
    let items: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if items.iter().any(|s| s == "*") {
        return Vec::new();
    }
    items
}
