use std::collections::BTreeMap;
use std::time::Duration;

use roster::{FetchError, PlayerFeed, RawPlayer};
use tracing::debug;

use crate::model::SleeperPlayer;

const DEFAULT_BASE_URL: &str = "https://api.sleeper.app/v1";

/// Configuration for the Sleeper player feed.
#[derive(Debug, Clone)]
pub struct SleeperFeedConfig {
    pub label: String,
    pub sport: String,
    pub request_timeout: Duration,
    pub base_url: Option<String>,
}

impl Default for SleeperFeedConfig {
    fn default() -> Self {
        Self {
            label: "sleeper".into(),
            sport: "nfl".into(),
            request_timeout: Duration::from_secs(10),
            base_url: None,
        }
    }
}

/// Pulls the full player list from the Sleeper public API.
pub struct SleeperFeed {
    config: SleeperFeedConfig,
    client: reqwest::Client,
}

impl SleeperFeed {
    pub fn new(config: SleeperFeedConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("roster-ingestor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    fn players_url(&self) -> String {
        format!("{}/players/{}", self.base_url(), self.config.sport)
    }

    /// Decode the `{ id: player }` body into feed records, ordered by id.
    ///
    /// Only a body that is not a JSON object fails the fetch. An entry that
    /// does not match the player shape becomes an undecodable record, which
    /// the reconciler skips.
    fn decode(body: &[u8]) -> Result<Vec<RawPlayer>, FetchError> {
        let entries: BTreeMap<String, serde_json::Value> = serde_json::from_slice(body)
            .map_err(|e| FetchError::Malformed(format!("invalid players body: {e}")))?;

        Ok(entries
            .into_iter()
            .map(|(key, value)| match serde_json::from_value::<SleeperPlayer>(value) {
                Ok(player) => player.into_raw(&key),
                Err(e) => RawPlayer::undecodable(Some(key), e.to_string()),
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl PlayerFeed for SleeperFeed {
    fn label(&self) -> &str {
        &self.config.label
    }

    async fn fetch_all(&self) -> Result<Vec<RawPlayer>, FetchError> {
        let url = self.players_url();
        debug!(%url, "requesting player list");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.config.request_timeout)
            } else {
                FetchError::Network(format!("players request failed: {e}"))
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(FetchError::RateLimited { retry_after });
        }
        if !status.is_success() {
            return Err(FetchError::Network(format!(
                "players request returned HTTP {status}"
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.config.request_timeout)
            } else {
                FetchError::Network(format!("failed to read players body: {e}"))
            }
        })?;

        Self::decode(&body)
    }
}
