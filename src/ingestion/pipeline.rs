use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use rust_decimal::Decimal;

use super::decoder::{DecodeError, EventDecoder};
use super::dedup::SeenTxSet;
use crate::config::{AppConfig, ClassifierPolicy, ClusterGranularity};
use crate::execution::PaperTrader;
use crate::intelligence::{ClusterDetector, ClusterRules, ClusterStore, WalletRegistry, WindowEntry};
use crate::models::{ClusterKey, ClusterSignal, LogEntry, Trade};
use crate::services::notifier::{
    format_cluster_alert, format_paper_event, format_smart_trade, format_whale_alert, SignalSink,
};

/// Knobs for trade qualification and clustering.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub granularity: ClusterGranularity,
    pub rules: ClusterRules,
    pub window_secs: i64,
    pub window_max_entries: usize,
    pub dedup_horizon_blocks: u64,
    pub whale_threshold: Decimal,
    pub notify_smart_trades: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            granularity: ClusterGranularity::MarketSide,
            rules: ClusterRules::default(),
            window_secs: 300,
            window_max_entries: 1_000,
            dedup_horizon_blocks: 5_000,
            whale_threshold: Decimal::from(10_000),
            notify_smart_trades: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            granularity: config.cluster_granularity,
            rules: ClusterRules {
                min_wallets: config.min_wallets,
                min_volume: config.min_volume,
                min_score: config.min_cluster_score,
            },
            window_secs: config.window_secs,
            window_max_entries: config.window_max_entries,
            dedup_horizon_blocks: config.dedup_horizon_blocks,
            whale_threshold: config.whale_threshold,
            notify_smart_trades: config.notify_smart_trades,
        }
    }
}

/// What happened to one log.
#[derive(Debug, Clone, PartialEq)]
pub enum LogOutcome {
    /// Another event signature.
    Skipped,
    Rejected(&'static str),
    Duplicate,
    Processed {
        qualified: bool,
        signal: Option<ClusterSignal>,
    },
}

/// All mutable surveillance state, driven one log at a time by the poller.
pub struct Pipeline {
    decoder: EventDecoder,
    registry: WalletRegistry,
    windows: ClusterStore,
    detector: ClusterDetector,
    seen: SeenTxSet,
    paper: Option<PaperTrader>,
    config: PipelineConfig,
    /// Latest event time seen; windows are evaluated against it.
    clock: Option<DateTime<Utc>>,
}

impl Pipeline {
    pub fn new(decoder: EventDecoder, registry: WalletRegistry, config: PipelineConfig) -> Self {
        Self {
            decoder,
            registry,
            windows: ClusterStore::new(config.window_secs, config.window_max_entries),
            detector: ClusterDetector::new(config.rules.clone()),
            seen: SeenTxSet::new(config.dedup_horizon_blocks),
            paper: None,
            config,
            clock: None,
        }
    }

    pub fn with_paper_trader(mut self, trader: PaperTrader) -> Self {
        self.paper = Some(trader);
        self
    }

    pub fn registry(&self) -> &WalletRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut WalletRegistry {
        &mut self.registry
    }

    pub fn paper_trader(&self) -> Option<&PaperTrader> {
        self.paper.as_ref()
    }

    pub fn open_windows(&self) -> usize {
        self.windows.open_windows()
    }

    pub fn decoder(&self) -> &EventDecoder {
        &self.decoder
    }

    /// Decode one log and run the resulting trade through the pipeline.
    /// Decode failures drop the record and never abort the batch.
    pub async fn process_log<S>(
        &mut self,
        log: &LogEntry,
        observed_at: DateTime<Utc>,
        sink: &S,
    ) -> LogOutcome
    where
        S: SignalSink + Sync,
    {
        match self.decoder.decode(log, observed_at) {
            Ok(Some(trade)) => {
                counter!("trades_decoded_total").increment(1);
                self.process_trade(trade, sink).await
            }
            Ok(None) => LogOutcome::Skipped,
            Err(e) => {
                record_decode_error(&e, log);
                LogOutcome::Rejected(e.kind())
            }
        }
    }

    /// Dedup, classify, alert, aggregate, detect.
    pub async fn process_trade<S>(&mut self, trade: Trade, sink: &S) -> LogOutcome
    where
        S: SignalSink + Sync,
    {
        if !self.seen.insert(&trade.tx_ref) {
            counter!("duplicate_trades_total").increment(1);
            tracing::debug!(tx = %trade.tx_ref, "Duplicate fill ignored");
            return LogOutcome::Duplicate;
        }

        let now = self.advance_clock(trade.observed_at);
        self.registry.update(&trade);

        // Mark any open paper position before reacting to new signals.
        if let Some(paper) = self.paper.as_mut() {
            if let Some(event) = paper.on_trade(&trade) {
                let text = format_paper_event(&event, paper.capital());
                sink.notify(&text).await;
            }
        }

        let is_whale = trade.size >= self.config.whale_threshold;
        let significant = self.registry.is_significant(&trade.wallet);

        if is_whale {
            counter!("whale_alerts_total").increment(1);
            tracing::info!(
                wallet = %trade.wallet,
                market = %trade.market_id,
                size = %trade.size,
                "Whale-size trade"
            );
            sink.notify(&format_whale_alert(&trade)).await;
        }

        if significant {
            counter!("smart_trades_total").increment(1);
            let score = self.registry.score(&trade.wallet);
            tracing::info!(
                wallet = %trade.wallet,
                market = %trade.market_id,
                side = %trade.side,
                size = %trade.size,
                score = %score,
                "Significant wallet trade"
            );
            if self.config.notify_smart_trades {
                sink.notify(&format_smart_trade(&trade, score)).await;
            }
        }

        if !(significant || is_whale) {
            return LogOutcome::Processed {
                qualified: false,
                signal: None,
            };
        }

        let key = match self.config.granularity {
            ClusterGranularity::Market => ClusterKey::market(trade.market_id.clone()),
            ClusterGranularity::MarketSide => {
                ClusterKey::market_side(trade.market_id.clone(), trade.side)
            }
        };
        self.windows.add(key.clone(), WindowEntry::from(&trade));

        let registry = &self.registry;
        let allow_list = registry.policy() == ClassifierPolicy::AllowList;
        let signal = self.detector.evaluate(&mut self.windows, &key, now, |wallet| {
            if allow_list {
                Decimal::ONE
            } else {
                registry.score(wallet)
            }
        });

        if let Some(signal) = &signal {
            self.emit_signal(signal, now, sink).await;
        }

        LogOutcome::Processed {
            qualified: true,
            signal,
        }
    }

    async fn emit_signal<S>(&mut self, signal: &ClusterSignal, now: DateTime<Utc>, sink: &S)
    where
        S: SignalSink + Sync,
    {
        counter!("cluster_signals_total").increment(1);
        tracing::info!(
            key = %signal.key,
            wallets = signal.distinct_wallets(),
            total = %signal.total_size,
            score = %signal.score,
            confidence = %signal.confidence,
            "Cluster signal"
        );
        sink.notify(&format_cluster_alert(signal)).await;

        if let Some(paper) = self.paper.as_mut() {
            for event in paper.on_signal(signal, now) {
                let text = format_paper_event(&event, paper.capital());
                sink.notify(&text).await;
            }
        }
    }

    /// Drop fully expired windows and refresh gauges.
    pub fn sweep(&mut self) {
        if let Some(now) = self.clock {
            self.windows.sweep(now);
        }
        gauge!("open_windows").set(self.windows.open_windows() as f64);
        gauge!("tracked_wallets").set(self.registry.tracked_wallets() as f64);
        if let Some(paper) = &self.paper {
            gauge!("paper_open_positions").set(paper.open_positions() as f64);
        }
    }

    fn advance_clock(&mut self, observed_at: DateTime<Utc>) -> DateTime<Utc> {
        let now = match self.clock {
            Some(clock) if clock > observed_at => clock,
            _ => observed_at,
        };
        self.clock = Some(now);
        now
    }
}

fn record_decode_error(e: &DecodeError, log: &LogEntry) {
    counter!("decode_errors_total", "kind" => e.kind()).increment(1);
    if e.is_invariant_violation() {
        tracing::warn!(
            error = %e,
            tx = %log.tx_hash,
            block = log.block_number,
            log_index = log.log_index,
            "Dropping fill that violates amount invariants"
        );
    } else {
        tracing::debug!(
            error = %e,
            tx = %log.tx_hash,
            log_index = log.log_index,
            "Dropping undecodable fill"
        );
    }
}
