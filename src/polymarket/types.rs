use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Leaderboard (Data API)
// ---------------------------------------------------------------------------

/// One ranked trader. Field names differ between API versions, hence the aliases.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeaderboardEntry {
    #[serde(default, alias = "proxyWallet", alias = "proxy_wallet", alias = "user")]
    pub address: Option<String>,
    #[serde(default, alias = "userName", alias = "name")]
    pub username: Option<String>,
    #[serde(default)]
    pub rank: Option<serde_json::Value>,
    #[serde(default, alias = "profit")]
    pub pnl: Option<Decimal>,
    #[serde(default, alias = "vol", alias = "amount")]
    pub volume: Option<Decimal>,
}

/// Some deployments wrap the list in an object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LeaderboardResponse {
    List(Vec<LeaderboardEntry>),
    Wrapped { data: Vec<LeaderboardEntry> },
}

impl LeaderboardResponse {
    pub fn into_entries(self) -> Vec<LeaderboardEntry> {
        match self {
            LeaderboardResponse::List(entries) => entries,
            LeaderboardResponse::Wrapped { data } => data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaderboard_aliases() {
        let json = r#"[
            {"rank": "1", "proxyWallet": "0xabc", "userName": "whale", "vol": 120000.5, "pnl": 3400},
            {"user": "0xdef", "amount": "10", "profit": "-5"}
        ]"#;
        let entries = serde_json::from_str::<LeaderboardResponse>(json)
            .unwrap()
            .into_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].address.as_deref(), Some("0xabc"));
        assert_eq!(entries[0].volume, Some(Decimal::new(1200005, 1)));
        assert_eq!(entries[1].pnl, Some(Decimal::from(-5)));
    }

    #[test]
    fn test_leaderboard_wrapped() {
        let json = r#"{"data": [{"proxyWallet": "0xabc"}]}"#;
        let entries = serde_json::from_str::<LeaderboardResponse>(json)
            .unwrap()
            .into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pnl, None);
    }
}
