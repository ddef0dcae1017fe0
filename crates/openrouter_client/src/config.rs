use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Connection settings for the OpenRouter API.
///
/// Environment variables:
/// - `OPENROUTER_API_KEY`: bearer token (required for real requests)
/// - `OPENROUTER_BASE_URL`: API root (default: official endpoint)
/// - `OPENROUTER_TIMEOUT_SECS`: per-request timeout (default: 120)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("OPENROUTER_API_KEY").unwrap_or_default(),
            base_url: std::env::var("OPENROUTER_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            request_timeout: Duration::from_secs(
                std::env::var("OPENROUTER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_timeout() {
        let config = ClientConfig::new("key", "http://localhost:9000");
        assert_eq!(config.request_timeout.as_secs(), DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.base_url, "http://localhost:9000");
    }
}
