// Bot-score lookup for the public tracking endpoint.
// The external scorer rates a request 0.0 (human) to 1.0 (bot); events at
// or above the block threshold are dropped. Every failure mode scores 0.0
// so an outage never loses legitimate analytics.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::app_config::{config, BotScoreConfig};

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    ip: Option<&'a str>,
    user_agent: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: f64,
}

pub struct BotScoreClient {
    client: reqwest::Client,
    config: BotScoreConfig,
}

impl BotScoreClient {
    pub fn new(config: BotScoreConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap_or_default();

        Self { client, config }
    }

    pub fn from_config() -> Self {
        Self::new(config().bot_score.clone())
    }

    /// Whether an event from this request should be dropped as bot traffic.
    /// Fail-open: disabled service, timeouts and bad responses all allow
    /// the event through.
    pub async fn should_block(&self, ip: Option<&str>, user_agent: Option<&str>) -> bool {
        if !self.config.enabled {
            return false;
        }

        let score = self.score(ip, user_agent).await;
        let blocked = score >= self.config.block_threshold;

        if blocked {
            debug!(score, "event dropped as bot traffic");
        }

        blocked
    }

    async fn score(&self, ip: Option<&str>, user_agent: Option<&str>) -> f64 {
        let request = ScoreRequest { ip, user_agent };

        let response = self
            .client
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await;

        match response {
            Ok(res) if res.status().is_success() => match res.json::<ScoreResponse>().await {
                Ok(body) => body.score.clamp(0.0, 1.0),
                Err(e) => {
                    warn!("bot score response unreadable, allowing event: {}", e);
                    0.0
                },
            },
            Ok(res) => {
                warn!(status = %res.status(), "bot score service error, allowing event");
                0.0
            },
            Err(e) => {
                warn!("bot score request failed, allowing event: {}", e);
                0.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_client_never_blocks() {
        let client = BotScoreClient::new(BotScoreConfig {
            api_url: String::new(),
            api_key: String::new(),
            block_threshold: 0.8,
            enabled: false,
        });

        assert!(!client.should_block(Some("1.2.3.4"), Some("curl/8.0")).await);
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_open() {
        let client = BotScoreClient::new(BotScoreConfig {
            api_url: "http://127.0.0.1:1/score".to_string(),
            api_key: "k".to_string(),
            block_threshold: 0.8,
            enabled: true,
        });

        assert!(!client.should_block(Some("1.2.3.4"), None).await);
    }
}
