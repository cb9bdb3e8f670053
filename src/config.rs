use anyhow::{Context, Result};
use std::env;

pub const DEFAULT_LOG_FILTER: &str = "course_progress=info,axum=info,tower_http=info";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Read settings from the environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;
        let port = env::var("PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(8081);
        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        let cors_origins = env::var("CORS_ORIGINS")
            .map(|s| parse_origins(&s))
            .unwrap_or_default();
        Ok(Self {
            database_url,
            port,
            db_max_connections,
            cors_origins,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
