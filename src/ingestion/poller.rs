use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};

use super::cursor::ChainCursor;
use super::decoder::ORDER_FILLED_TOPIC;
use super::pipeline::Pipeline;
use crate::chain::{ChainSource, LogFilter};
use crate::config::AppConfig;
use crate::errors::{FatalError, RpcError};
use crate::health::HealthState;
use crate::services::notifier::{format_startup, SignalSink};
use crate::services::WalletSeeder;
use crate::store::StateStore;

#[derive(Debug, Clone, PartialEq)]
pub struct PollSettings {
    pub poll_interval: Duration,
    pub backoff: Duration,
    pub max_backoff: Duration,
    pub max_block_range: u64,
    pub use_block_timestamps: bool,
    /// Shown in the startup notification.
    pub startup_note: String,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            backoff: Duration::from_secs(15),
            max_backoff: Duration::from_secs(120),
            max_block_range: 500,
            use_block_timestamps: false,
            startup_note: "log".into(),
        }
    }
}

impl PollSettings {
    pub fn from_app(config: &AppConfig, startup_note: impl Into<String>) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            backoff: Duration::from_secs(config.backoff_secs),
            max_backoff: Duration::from_secs(config.max_backoff_secs.max(config.backoff_secs)),
            max_block_range: config.max_block_range,
            use_block_timestamps: config.use_block_timestamps,
            startup_note: startup_note.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Init,
    Connected,
    Polling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Chain has not moved past the cursor.
    Idle,
    Advanced { from: u64, to: u64, logs: usize },
}

/// `base · 2^attempt`, capped at `max`.
pub fn backoff_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt)).min(max)
}

/// Drives the pipeline from the chain at a fixed cadence. Owns every piece
/// of mutable surveillance state; nothing else writes to it.
pub struct Poller<C, S> {
    chain: C,
    sink: S,
    pipeline: Pipeline,
    filter: LogFilter,
    settings: PollSettings,
    state: PollerState,
    cursor: ChainCursor,
    store: Option<StateStore>,
    health: HealthState,
    seeder: Option<WalletSeeder>,
    last_seed: Option<Instant>,
}

impl<C, S> Poller<C, S>
where
    C: ChainSource + Sync,
    S: SignalSink + Sync,
{
    pub fn new(
        chain: C,
        sink: S,
        pipeline: Pipeline,
        exchange_addresses: Vec<String>,
        settings: PollSettings,
        health: HealthState,
    ) -> Self {
        Self {
            chain,
            sink,
            pipeline,
            filter: LogFilter {
                addresses: exchange_addresses,
                topic0: vec![ORDER_FILLED_TOPIC],
            },
            settings,
            state: PollerState::Init,
            cursor: ChainCursor::new(0),
            store: None,
            health,
            seeder: None,
            last_seed: None,
        }
    }

    pub fn with_store(mut self, store: StateStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_seeder(mut self, seeder: WalletSeeder) -> Self {
        self.seeder = Some(seeder);
        self
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn cursor(&self) -> u64 {
        self.cursor.last_processed()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    // -----------------------------------------------------------------------
    // INIT -> CONNECTED
    // -----------------------------------------------------------------------

    /// Probe the chain source once and position the cursor. Any failure here
    /// is fatal; nothing is retried.
    pub async fn connect(&mut self) -> Result<(), FatalError> {
        let chain_id = self
            .chain
            .chain_id()
            .await
            .map_err(FatalError::Connectivity)?;
        let height = self
            .chain
            .current_height()
            .await
            .map_err(FatalError::Connectivity)?;

        let resumed = self.restore_state();
        let start = resumed.unwrap_or(height);
        self.cursor = ChainCursor::new(start);
        gauge!("chain_cursor_block").set(start as f64);

        tracing::info!(
            chain_id,
            height,
            cursor = start,
            resumed = resumed.is_some(),
            resolver = self.pipeline.decoder().resolver_name(),
            "Connected to chain source"
        );

        self.state = PollerState::Connected;
        self.sink
            .notify(&format_startup(chain_id, start, &self.settings.startup_note))
            .await;
        Ok(())
    }

    /// Load the persisted cursor and wallet profiles. Failures degrade to a
    /// fresh start.
    fn restore_state(&mut self) -> Option<u64> {
        let store = self.store.as_ref()?;

        match store.load_profiles() {
            Ok(profiles) if !profiles.is_empty() => {
                let loaded = self.pipeline.registry_mut().load_profiles(profiles);
                tracing::info!(profiles = loaded, "Restored wallet profiles");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to load wallet profiles, starting fresh"),
        }

        match store.load_cursor() {
            Ok(cursor) => cursor,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load chain cursor, starting at head");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // POLLING
    // -----------------------------------------------------------------------

    /// Process the next block range. The cursor moves only after every log in
    /// the range has been handled; on error it is left untouched so the same
    /// range is fetched again.
    pub async fn tick(&mut self) -> Result<TickOutcome, RpcError> {
        if self.state == PollerState::Init {
            return Err(RpcError::Unavailable("poller not connected".into()));
        }
        self.state = PollerState::Polling;

        let height = self.chain.current_height().await?;
        let Some((from, to)) = self.cursor.next_range(height, self.settings.max_block_range) else {
            self.health.record_success(self.cursor.last_processed());
            return Ok(TickOutcome::Idle);
        };

        let logs = self.chain.get_logs(from, to, &self.filter).await?;
        counter!("logs_fetched_total").increment(logs.len() as u64);

        let timestamps = if self.settings.use_block_timestamps {
            self.block_timestamps(logs.iter().map(|l| l.block_number)).await?
        } else {
            HashMap::new()
        };

        let fetched_at = Utc::now();
        for log in &logs {
            let observed_at = timestamps
                .get(&log.block_number)
                .copied()
                .unwrap_or(fetched_at);
            self.pipeline.process_log(log, observed_at, &self.sink).await;
        }

        self.cursor.advance(to);
        counter!("blocks_processed_total").increment(to - from + 1);
        gauge!("chain_cursor_block").set(to as f64);
        self.persist(to);
        self.pipeline.sweep();
        self.health.record_success(to);

        tracing::debug!(from, to, logs = logs.len(), height, "Tick complete");
        Ok(TickOutcome::Advanced {
            from,
            to,
            logs: logs.len(),
        })
    }

    async fn block_timestamps(
        &self,
        blocks: impl Iterator<Item = u64>,
    ) -> Result<HashMap<u64, DateTime<Utc>>, RpcError> {
        let mut out = HashMap::new();
        for number in blocks {
            if out.contains_key(&number) {
                continue;
            }
            let block = self.chain.get_block(number, false).await?;
            out.insert(number, block.timestamp);
        }
        Ok(out)
    }

    fn persist(&mut self, block: u64) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save_cursor(block) {
            tracing::warn!(error = %e, block, "Failed to save chain cursor");
        }
        if self.pipeline.registry_mut().take_dirty() {
            if let Err(e) = store.save_profiles(self.pipeline.registry().profiles()) {
                tracing::warn!(error = %e, "Failed to save wallet profiles");
            }
        }
    }

    async fn refresh_seed(&mut self) {
        let Some(seeder) = &self.seeder else {
            return;
        };
        if self
            .last_seed
            .is_some_and(|at| at.elapsed() < seeder.refresh_every())
        {
            return;
        }
        self.last_seed = Some(Instant::now());

        if let Err(e) = seeder.refresh(self.pipeline.registry_mut()).await {
            tracing::warn!(error = %e, "Leaderboard refresh failed, keeping current wallets");
        }
    }

    /// Connect, then poll until the process is stopped. Returns only on a
    /// fatal startup condition.
    pub async fn run(&mut self) -> Result<(), FatalError> {
        self.connect().await?;

        let mut attempt: u32 = 0;
        loop {
            self.refresh_seed().await;

            let started = Instant::now();
            let delay = match self.tick().await {
                Ok(_) => {
                    attempt = 0;
                    self.settings.poll_interval
                }
                Err(e) => {
                    counter!("tick_failures_total").increment(1);
                    let failures = self.health.record_failure();
                    let delay =
                        backoff_delay(self.settings.backoff, self.settings.max_backoff, attempt);
                    attempt = attempt.saturating_add(1);
                    tracing::warn!(
                        error = %e,
                        transient = e.is_transient(),
                        cursor = self.cursor.last_processed(),
                        failures,
                        retry_in_secs = delay.as_secs(),
                        "Tick failed, retrying same range"
                    );
                    delay
                }
            };
            histogram!("tick_duration_seconds").record(started.elapsed().as_secs_f64());

            tokio::time::sleep(delay).await;
        }
    }
}
