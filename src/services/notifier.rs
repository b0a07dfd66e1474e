use std::future::Future;
use std::time::Duration;

use metrics::counter;
use rust_decimal::Decimal;
use serde_json::json;

use crate::execution::PaperEvent;
use crate::models::{ClusterSignal, Trade};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Destination for formatted alert text. Delivery is best-effort: failures
/// are logged by the sink and never reach the caller.
pub trait SignalSink {
    fn notify(&self, text: &str) -> impl Future<Output = ()> + Send;
}

/// Telegram notification service. Failures are logged but never block the main flow.
#[derive(Debug, Clone)]
pub struct Notifier {
    http: reqwest::Client,
    base_url: String,
    bot_token: String,
    chat_id: String,
}

impl Notifier {
    pub fn new(bot_token: String, chat_id: String) -> Result<Self, reqwest::Error> {
        Self::with_timeout(bot_token, chat_id, SEND_TIMEOUT)
    }

    /// Every send is bounded by `timeout`.
    pub fn with_timeout(
        bot_token: String,
        chat_id: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: TELEGRAM_API_BASE.into(),
            bot_token,
            chat_id,
        })
    }

    /// Point at a different Bot API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Send a Telegram message. Failures are logged as warnings.
    pub async fn send(&self, message: &str) {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);

        let body = json!({
            "chat_id": self.chat_id,
            "text": message,
            "parse_mode": "Markdown",
        });

        match self.http.post(&url).json(&body).send().await {
            Ok(resp) => {
                if !resp.status().is_success() {
                    counter!("notifications_failed_total").increment(1);
                    tracing::warn!(
                        status = %resp.status(),
                        "Telegram sendMessage returned non-2xx"
                    );
                }
            }
            Err(e) => {
                counter!("notifications_failed_total").increment(1);
                tracing::warn!(error = %e, "Failed to send Telegram notification");
            }
        }
    }
}

impl SignalSink for Notifier {
    async fn notify(&self, text: &str) {
        self.send(text).await
    }
}

/// Writes alerts to the log. Used when no chat credentials are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl SignalSink for LogSink {
    async fn notify(&self, text: &str) {
        tracing::info!(alert = %text, "Alert");
    }
}

/// The sink chosen at startup.
#[derive(Debug, Clone)]
pub enum AlertSink {
    Telegram(Notifier),
    Log(LogSink),
}

impl AlertSink {
    pub fn from_credentials(token: Option<String>, chat_id: Option<String>) -> Self {
        match (token, chat_id) {
            (Some(token), Some(chat_id)) => match Notifier::new(token, chat_id) {
                Ok(notifier) => AlertSink::Telegram(notifier),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build Telegram client, alerts go to the log");
                    AlertSink::Log(LogSink)
                }
            },
            _ => AlertSink::Log(LogSink),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AlertSink::Telegram(_) => "telegram",
            AlertSink::Log(_) => "log",
        }
    }
}

impl SignalSink for AlertSink {
    async fn notify(&self, text: &str) {
        match self {
            AlertSink::Telegram(n) => n.notify(text).await,
            AlertSink::Log(l) => l.notify(text).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Message formats
// ---------------------------------------------------------------------------

fn price_str(price: Option<Decimal>) -> String {
    price
        .map(|p| p.round_dp(4).to_string())
        .unwrap_or_else(|| "n/a".into())
}

pub fn format_startup(chain_id: u64, height: u64, sink_note: &str) -> String {
    format!(
        "*Polywatch online*\nChain: {}\nStarting block: {}\nAlerts: {}",
        chain_id, height, sink_note,
    )
}

/// Single trade at or above the whale threshold.
pub fn format_whale_alert(trade: &Trade) -> String {
    format!(
        "*Whale Trade*\nWallet: `{}`\nSide: {} (`{}`)\nSize: ${} USDC\nPrice: {}\nMarket: `{}`\nTx: `{}`",
        trade.wallet,
        trade.side,
        trade.side_source,
        trade.size.round_dp(2),
        price_str(trade.price),
        trade.market_id,
        trade.tx_ref.tx_hash,
    )
}

/// Trade by a significant wallet.
pub fn format_smart_trade(trade: &Trade, wallet_score: Decimal) -> String {
    format!(
        "*Smart Wallet Trade*\nWallet: `{}`\nScore: {}\nSide: {} (`{}`)\nSize: ${} USDC\nPrice: {}\nMarket: `{}`\nTx: `{}`",
        trade.wallet,
        wallet_score.round_dp(2),
        trade.side,
        trade.side_source,
        trade.size.round_dp(2),
        price_str(trade.price),
        trade.market_id,
        trade.tx_ref.tx_hash,
    )
}

pub fn format_cluster_alert(signal: &ClusterSignal) -> String {
    let wallets = signal
        .wallets
        .iter()
        .map(|w| format!("`{}`", w.short()))
        .collect::<Vec<_>>()
        .join(", ");
    let side = signal
        .key
        .side
        .map(|s| s.to_string())
        .unwrap_or_else(|| "ANY".into());

    format!(
        "*Cluster Signal*\nMarket: `{}`\nSide: {}\nWallets: {} ({})\nTotal: ${} USDC over {} trades\nAvg price: {}\nWindow: {} → {}\nScore: {} ({})",
        signal.key.market_id,
        side,
        signal.distinct_wallets(),
        wallets,
        signal.total_size.round_dp(2),
        signal.trade_count,
        price_str(signal.avg_price),
        signal.first_seen.format("%H:%M:%S"),
        signal.last_seen.format("%H:%M:%S"),
        signal.score.round_dp(1),
        signal.confidence,
    )
}

pub fn format_paper_event(event: &PaperEvent, capital: Decimal) -> String {
    match event {
        PaperEvent::Opened(pos) => format!(
            "*Paper Open*\nMarket: `{}`\nSide: {}\nStake: ${} @ {}\nCapital: ${}",
            pos.market_id,
            pos.side,
            pos.stake.round_dp(2),
            pos.entry_price.round_dp(4),
            capital.round_dp(2),
        ),
        PaperEvent::Closed {
            position,
            exit_price,
            pnl,
            reason,
        } => format!(
            "*Paper Close* (`{}`)\nMarket: `{}`\nSide: {}\nEntry: {} Exit: {}\nPnL: ${}\nCapital: ${}",
            reason,
            position.market_id,
            position.side,
            position.entry_price.round_dp(4),
            exit_price.round_dp(4),
            pnl.round_dp(2),
            capital.round_dp(2),
        ),
    }
}
