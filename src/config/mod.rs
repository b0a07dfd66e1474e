use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::ConfigError;
use crate::execution::SizingStrategy;
use crate::models::Address;

/// CTF Exchange contract on Polygon.
pub const CTF_EXCHANGE: &str = "0x4bfb41d5b3570defd03c39a9a4d8de6bd8b8982e";

/// NegRisk CTF Exchange contract on Polygon.
pub const NEG_RISK_CTF_EXCHANGE: &str = "0xc5d563a36ae78145c45a50134d48a1215220f80a";

const DEFAULT_LEADERBOARD_URL: &str = "https://data-api.polymarket.com/v1/leaderboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterGranularity {
    Market,
    MarketSide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierPolicy {
    AllowList,
    Scored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideResolverKind {
    Price,
    Parity,
    Map,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Chain source
    pub polygon_rpc: String,
    pub rpc_timeout_secs: u64,
    pub exchange_addresses: Vec<String>,

    // Notifications (optional — alerts go to the log when unset)
    pub telegram_token: Option<String>,
    pub chat_id: Option<String>,
    pub notify_smart_trades: bool,

    // Poll loop
    pub poll_interval_secs: u64,
    pub backoff_secs: u64,
    pub max_backoff_secs: u64,
    pub max_block_range: u64,
    pub dedup_horizon_blocks: u64,
    pub use_block_timestamps: bool,

    // Clustering
    pub min_wallets: usize,
    pub min_volume: Decimal,
    pub window_secs: i64,
    pub window_max_entries: usize,
    pub cluster_granularity: ClusterGranularity,
    pub min_cluster_score: Decimal,
    pub whale_threshold: Decimal,

    // Classifier
    pub classifier_policy: ClassifierPolicy,
    pub smart_wallets: Vec<Address>,
    pub score_threshold: Decimal,
    pub min_scored_trades: u64,
    pub volume_cap: Decimal,

    // Trade direction
    pub side_resolver: SideResolverKind,
    pub side_map_file: Option<PathBuf>,

    // Reputation source
    pub leaderboard_enabled: bool,
    pub leaderboard_url: String,
    pub leaderboard_limit: u32,
    pub leaderboard_min_pnl: Decimal,
    pub leaderboard_min_volume: Decimal,
    pub leaderboard_refresh_secs: u64,

    // Persistence / keep-alive
    pub state_dir: Option<PathBuf>,
    pub health_enabled: bool,
    pub host: String,
    pub port: u16,
    pub health_stale_secs: u64,

    // Paper trading
    pub paper_trading_enabled: bool,
    pub paper_bankroll: Decimal,
    pub paper_stake: Decimal,
    pub paper_sizing: SizingStrategy,
    pub paper_take_profit_pct: Decimal,
    pub paper_stop_loss_pct: Decimal,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let polygon_rpc = env::var("POLYGON_RPC")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("POLYGON_RPC"))?;
        if !polygon_rpc.starts_with("http://") && !polygon_rpc.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: "POLYGON_RPC",
                value: polygon_rpc,
            });
        }

        let telegram_token = optional("TELEGRAM_TOKEN");
        let chat_id = optional("CHAT_ID");
        if telegram_token.is_some() != chat_id.is_some() {
            return Err(ConfigError::Incomplete("TELEGRAM_TOKEN", "CHAT_ID"));
        }

        let exchange_addresses = match optional("EXCHANGE_ADDRESSES") {
            Some(raw) => parse_address_list("EXCHANGE_ADDRESSES", &raw)?
                .into_iter()
                .map(|a| a.to_string())
                .collect(),
            None => vec![CTF_EXCHANGE.to_string(), NEG_RISK_CTF_EXCHANGE.to_string()],
        };

        let mut smart_wallets = match optional("SMART_WALLETS") {
            Some(raw) => parse_address_list("SMART_WALLETS", &raw)?,
            None => Vec::new(),
        };
        if let Some(path) = optional("SMART_WALLETS_FILE") {
            let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::File {
                path: path.clone(),
                source,
            })?;
            smart_wallets.extend(parse_wallet_file(&contents)?);
        }

        let cluster_granularity = match optional("CLUSTER_GRANULARITY").as_deref() {
            None | Some("market_side") => ClusterGranularity::MarketSide,
            Some("market") => ClusterGranularity::Market,
            Some(other) => return Err(invalid("CLUSTER_GRANULARITY", other)),
        };

        let classifier_policy = match optional("CLASSIFIER_POLICY").as_deref() {
            None | Some("allowlist") => ClassifierPolicy::AllowList,
            Some("scored") => ClassifierPolicy::Scored,
            Some(other) => return Err(invalid("CLASSIFIER_POLICY", other)),
        };

        let side_resolver = match optional("SIDE_RESOLVER").as_deref() {
            None | Some("price") => SideResolverKind::Price,
            Some("parity") => SideResolverKind::Parity,
            Some("map") => SideResolverKind::Map,
            Some(other) => return Err(invalid("SIDE_RESOLVER", other)),
        };
        let side_map_file = optional("SIDE_MAP_FILE").map(PathBuf::from);
        if side_resolver == SideResolverKind::Map && side_map_file.is_none() {
            return Err(ConfigError::Missing("SIDE_MAP_FILE"));
        }

        let paper_sizing = match optional("PAPER_SIZING").as_deref() {
            None | Some("fixed") => SizingStrategy::Fixed,
            Some("scaled") => SizingStrategy::Scaled,
            Some(other) => return Err(invalid("PAPER_SIZING", other)),
        };

        let config = Self {
            polygon_rpc,
            rpc_timeout_secs: parse_or("RPC_TIMEOUT_SECS", 15)?,
            exchange_addresses,

            telegram_token,
            chat_id,
            notify_smart_trades: parse_or("NOTIFY_SMART_TRADES", true)?,

            poll_interval_secs: parse_or("POLL_INTERVAL_SECONDS", 5)?,
            backoff_secs: parse_or("BACKOFF_SECONDS", 15)?,
            max_backoff_secs: parse_or("MAX_BACKOFF_SECONDS", 120)?,
            max_block_range: parse_or("MAX_BLOCK_RANGE", 500)?,
            dedup_horizon_blocks: parse_or("DEDUP_HORIZON_BLOCKS", 5_000)?,
            use_block_timestamps: parse_or("USE_BLOCK_TIMESTAMPS", false)?,

            min_wallets: parse_or("MIN_WALLETS", 3)?,
            min_volume: parse_or("MIN_VOLUME", Decimal::from(1_000))?,
            window_secs: parse_or("WINDOW_SECONDS", 300)?,
            window_max_entries: parse_or("WINDOW_MAX_ENTRIES", 1_000)?,
            cluster_granularity,
            min_cluster_score: parse_or("MIN_CLUSTER_SCORE", Decimal::ZERO)?,
            whale_threshold: parse_or("WHALE_THRESHOLD", Decimal::from(10_000))?,

            classifier_policy,
            smart_wallets,
            score_threshold: parse_or("SCORE_THRESHOLD", Decimal::new(65, 2))?,
            min_scored_trades: parse_or("MIN_SCORED_TRADES", 30)?,
            volume_cap: parse_or("VOLUME_CAP", Decimal::from(100_000))?,

            side_resolver,
            side_map_file,

            leaderboard_enabled: parse_or("LEADERBOARD_ENABLED", false)?,
            leaderboard_url: optional("LEADERBOARD_URL")
                .unwrap_or_else(|| DEFAULT_LEADERBOARD_URL.into()),
            leaderboard_limit: parse_or("LEADERBOARD_LIMIT", 50)?,
            leaderboard_min_pnl: parse_or("LEADERBOARD_MIN_PNL", Decimal::ZERO)?,
            leaderboard_min_volume: parse_or("LEADERBOARD_MIN_VOLUME", Decimal::from(1_000))?,
            leaderboard_refresh_secs: parse_or("LEADERBOARD_REFRESH_SECS", 3_600)?,

            state_dir: optional("STATE_DIR").map(PathBuf::from),
            health_enabled: parse_or("HEALTH_ENABLED", true)?,
            host: optional("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or("PORT", 8080)?,
            health_stale_secs: parse_or("HEALTH_STALE_SECS", 120)?,

            paper_trading_enabled: parse_or("PAPER_TRADING_ENABLED", false)?,
            paper_bankroll: parse_or("PAPER_BANKROLL", Decimal::from(1_000))?,
            paper_stake: parse_or("PAPER_STAKE", Decimal::from(50))?,
            paper_sizing,
            paper_take_profit_pct: parse_or("PAPER_TAKE_PROFIT_PCT", Decimal::from(50))?,
            paper_stop_loss_pct: parse_or("PAPER_STOP_LOSS_PCT", Decimal::from(15))?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_wallets == 0 {
            return Err(invalid("MIN_WALLETS", "0"));
        }
        if self.window_secs <= 0 {
            return Err(invalid("WINDOW_SECONDS", &self.window_secs.to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(invalid("POLL_INTERVAL_SECONDS", "0"));
        }
        if self.max_block_range == 0 {
            return Err(invalid("MAX_BLOCK_RANGE", "0"));
        }
        if self.min_volume < Decimal::ZERO {
            return Err(invalid("MIN_VOLUME", &self.min_volume.to_string()));
        }
        Ok(())
    }

    /// Returns true if Telegram delivery is configured.
    pub fn has_telegram(&self) -> bool {
        self.telegram_token.is_some() && self.chat_id.is_some()
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn invalid(name: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
    }
}

/// Parse an optional variable, falling back to `default` when unset. A set
/// but unparseable value is an error rather than a silent default.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(raw) => raw.parse().map_err(|_| invalid(name, &raw)),
        None => Ok(default),
    }
}

fn parse_address_list(name: &'static str, raw: &str) -> Result<Vec<Address>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Address>().map_err(|_| invalid(name, s)))
        .collect()
}

/// One address per line; blank lines and `#` comments are ignored.
pub fn parse_wallet_file(contents: &str) -> Result<Vec<Address>, ConfigError> {
    contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.parse::<Address>()
                .map_err(|_| invalid("SMART_WALLETS_FILE", line))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wallet_file_skips_comments() {
        let contents = "\
# top traders
0x4bfb41d5b3570defd03c39a9a4d8de6bd8b8982e
   0xC5D563A36AE78145C45A50134D48A1215220F80A  # negrisk

";
        let wallets = parse_wallet_file(contents).unwrap();
        assert_eq!(wallets.len(), 2);
        assert_eq!(wallets[1].to_string(), NEG_RISK_CTF_EXCHANGE);
    }

    #[test]
    fn test_parse_wallet_file_rejects_garbage() {
        assert!(parse_wallet_file("not-an-address").is_err());
    }

    #[test]
    fn test_parse_address_list() {
        let list = parse_address_list(
            "SMART_WALLETS",
            "0x4bfb41d5b3570defd03c39a9a4d8de6bd8b8982e, ,0xc5d563a36ae78145c45a50134d48a1215220f80a",
        )
        .unwrap();
        assert_eq!(list.len(), 2);
    }
}
