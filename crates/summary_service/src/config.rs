//! Service configuration from environment variables.

use std::path::PathBuf;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DB_PATH: &str = "data/model_aggregates.db";

/// Runtime settings for the summary service.
///
/// Environment variables:
/// - `APP_PORT`: listen port (default: 8080)
/// - `SUMMARY_DB_PATH`: SQLite file for the aggregate store (default:
///   `data/model_aggregates.db`); set to `memory` to run without durable
///   storage
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub db_path: Option<PathBuf>,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let db_path = match std::env::var("SUMMARY_DB_PATH") {
            Ok(value) if value.is_empty() || value == "memory" || value == ":memory:" => None,
            Ok(value) => Some(PathBuf::from(value)),
            Err(_) => Some(PathBuf::from(DEFAULT_DB_PATH)),
        };

        Self { port, db_path }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            db_path: Some(PathBuf::from(DEFAULT_DB_PATH)),
        }
    }
}
