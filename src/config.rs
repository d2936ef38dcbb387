use serde::Deserialize;
use std::env;

use crate::constants::PRICE_API_DEFAULT_BASE_URL;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // External APIs
    pub price_api_base_url: String,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            price_api_base_url: env::var("PRICE_API_BASE_URL")
                .unwrap_or_else(|_| PRICE_API_DEFAULT_BASE_URL.to_string()),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.price_api_base_url.trim().is_empty() {
            anyhow::bail!("PRICE_API_BASE_URL is empty");
        }
        if !self.price_api_base_url.starts_with("http") {
            anyhow::bail!("PRICE_API_BASE_URL must be an http(s) URL");
        }

        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }
}
