//! Configuration management for the signal backtesting bot.

use crate::types::FallbackPolicy;
use crate::{Error, Result};
use serde::Deserialize;
use std::env;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub price_api: PriceApiConfig,
    pub alerts: AlertsConfig,
    pub llm: LlmConfig,
    pub backtest: BacktestConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AlertsConfig {
    pub telegram_bot_token: Option<String>,
    /// Telegram chat ids to notify, comma-separated in the environment.
    pub telegram_chat_ids: Vec<String>,
    pub webhook_urls: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BacktestConfig {
    /// Behavior when no strategy exits before the series ends.
    pub fallback_policy: FallbackPolicy,
    /// Bounded-retry tuning for collaborator HTTP calls.
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    /// Maximum signals pulled per batch run.
    pub batch_limit: i64,
}

fn split_csv(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let fallback_policy = match env::var("FALLBACK_POLICY") {
            Ok(raw) => raw.parse().map_err(|_| Error::Config {
                message: format!("invalid FALLBACK_POLICY value: {raw}"),
            })?,
            Err(_) => FallbackPolicy::default(),
        };

        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| Error::Config {
                    message: "DATABASE_URL environment variable not set".to_string(),
                })?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            },
            price_api: PriceApiConfig {
                base_url: env::var("PRICE_API_URL")
                    .unwrap_or_else(|_| "https://api.coingecko.com/api/v3".to_string()),
                timeout_secs: env::var("PRICE_API_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            },
            alerts: AlertsConfig {
                telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
                telegram_chat_ids: split_csv(env::var("TELEGRAM_CHAT_IDS").ok()),
                webhook_urls: split_csv(env::var("WEBHOOK_URLS").ok()),
            },
            llm: LlmConfig {
                api_url: env::var("LLM_API_URL").ok(),
                api_key: env::var("LLM_API_KEY").ok(),
                model: env::var("LLM_MODEL").ok(),
            },
            backtest: BacktestConfig {
                fallback_policy,
                retry_max_attempts: env::var("RETRY_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3),
                retry_base_delay_ms: env::var("RETRY_BASE_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
                batch_limit: env::var("BATCH_LIMIT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(200),
            },
        })
    }

    /// Load configuration for testing (with defaults).
    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgres://localhost/sigbot_test".to_string(),
                max_connections: 2,
            },
            price_api: PriceApiConfig {
                base_url: "http://localhost:9999".to_string(),
                timeout_secs: 1,
            },
            alerts: AlertsConfig::default(),
            llm: LlmConfig::default(),
            backtest: BacktestConfig {
                fallback_policy: FallbackPolicy::LeaveUnresolved,
                retry_max_attempts: 2,
                retry_base_delay_ms: 10,
                batch_limit: 10,
            },
        }
    }
}
