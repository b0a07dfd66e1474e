use reqwest::Client;
use thiserror::Error;

use super::types::{LeaderboardEntry, LeaderboardResponse};

#[derive(Debug, Error)]
pub enum DataClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

/// Read-only client for the wallet reputation source.
#[derive(Debug, Clone)]
pub struct DataClient {
    http: Client,
    leaderboard_url: String,
}

impl DataClient {
    pub fn new(http: Client, leaderboard_url: impl Into<String>) -> Self {
        Self {
            http,
            leaderboard_url: leaderboard_url.into(),
        }
    }

    /// Fetch the top `limit` traders by PnL.
    pub async fn get_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, DataClientError> {
        let sep = if self.leaderboard_url.contains('?') { '&' } else { '?' };
        let url = format!("{}{}limit={}", self.leaderboard_url, sep, limit);

        let resp = self.http.get(&url).send().await?.error_for_status()?;
        let body = resp.text().await?;

        let parsed: LeaderboardResponse = serde_json::from_str(&body)
            .map_err(|e| DataClientError::Unexpected(format!("leaderboard payload: {e}")))?;
        Ok(parsed.into_entries())
    }
}
