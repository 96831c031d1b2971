//! Best-effort LLM annotation of winning strategies.

use serde::Deserialize;
use serde_json::json;
use signal_core::config::LlmConfig;
use signal_core::types::{BacktestResult, Direction};
use signal_core::{Error, Result};
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Produces a one-sentence explanation of why the winning strategy
/// performed best. Purely an enrichment step: callers fall back to a
/// placeholder on any error and never let a failure reach the backtest.
pub struct LlmAnnotator {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl LlmAnnotator {
    /// Build from config; returns None when the LLM is not configured,
    /// in which case callers use the placeholder unconditionally.
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        let api_url = config.api_url.clone()?;
        let api_key = config.api_key.clone()?;

        Some(Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .ok()?,
            api_url,
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    /// Ask for a single-sentence summary of the winning strategy.
    pub async fn annotate(&self, result: &BacktestResult, direction: Direction) -> Result<String> {
        let prompt = Self::build_prompt(result, direction);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "system",
                        "content": "You summarize trading backtest outcomes in exactly one sentence."
                    },
                    { "role": "user", "content": prompt }
                ],
                "max_tokens": 80,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<ChatResponse>()
            .await?;

        let sentence = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Delivery("empty annotation response".to_string()))?;

        Ok(sentence)
    }

    fn build_prompt(result: &BacktestResult, direction: Direction) -> String {
        let mut lines = vec![format!(
            "A {} signal was backtested with multiple exit strategies. Per-strategy P&L:",
            direction.as_str()
        )];
        for outcome in &result.outcomes {
            lines.push(format!("- {}: {:.2}%", outcome.strategy, outcome.pnl_pct));
        }
        lines.push(format!(
            "The best strategy was {} at {:.2}%. Explain in one sentence why it likely won.",
            result.best_strategy, result.best_pnl_pct
        ));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use signal_core::types::StrategyOutcome;
    use uuid::Uuid;

    #[test]
    fn not_constructed_without_credentials() {
        assert!(LlmAnnotator::from_config(&LlmConfig::default()).is_none());
    }

    #[test]
    fn prompt_names_best_strategy() {
        let result = BacktestResult::from_outcomes(
            Uuid::new_v4(),
            vec![StrategyOutcome {
                strategy: "trailing_stop_1pct".to_string(),
                exit_price: Decimal::new(108, 0),
                pnl_pct: Decimal::new(8, 0),
            }],
        )
        .unwrap();

        let prompt = LlmAnnotator::build_prompt(&result, Direction::Long);
        assert!(prompt.contains("trailing_stop_1pct"));
        assert!(prompt.contains("long"));
    }
}
