// src/config.rs

use std::env;
use dotenvy::dotenv;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub app_port: u16,
    /// Base of the join links handed out in share info.
    pub public_base_url: Url,
    /// Token bucket for the join-by-access-key endpoint: one request is
    /// replenished every `join_replenish_seconds`, up to `join_burst_size`.
    pub join_replenish_seconds: u64,
    pub join_burst_size: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let app_port = env::var("APP_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let public_base_url = Url::parse(&public_base_url)
            .expect("PUBLIC_BASE_URL must be a valid absolute URL");

        let join_replenish_seconds = env::var("JOIN_REPLENISH_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        let join_burst_size = env::var("JOIN_BURST_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        Self {
            database_url,
            jwt_secret,
            rust_log,
            app_port,
            public_base_url,
            join_replenish_seconds,
            join_burst_size,
        }
    }
}
