//! Per-key sliding windows of qualifying trades.
//!
//! Eviction is lazy: expired entries are dropped when a window is read, so a
//! snapshot never contains stale data no matter how irregular the polling is.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::models::{Address, ClusterKey, Trade, TxRef};

#[derive(Debug, Clone, PartialEq)]
pub struct WindowEntry {
    pub wallet: Address,
    pub size: Decimal,
    pub price: Option<Decimal>,
    pub observed_at: DateTime<Utc>,
    pub tx_ref: TxRef,
}

impl From<&Trade> for WindowEntry {
    fn from(trade: &Trade) -> Self {
        Self {
            wallet: trade.wallet,
            size: trade.size,
            price: trade.price,
            observed_at: trade.observed_at,
            tx_ref: trade.tx_ref.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct ClusterWindow {
    /// Ordered by `observed_at`, oldest first.
    entries: VecDeque<WindowEntry>,
    /// Set after a signal fires; the key stays silent until this passes.
    quiet_until: Option<DateTime<Utc>>,
}

impl ClusterWindow {
    fn evict(&mut self, now: DateTime<Utc>, window: Duration) {
        while let Some(front) = self.entries.front() {
            if now - front.observed_at > window {
                self.entries.pop_front();
            } else {
                break;
            }
        }
        if self.quiet_until.is_some_and(|t| now > t) {
            self.quiet_until = None;
        }
    }
}

#[derive(Debug)]
pub struct ClusterStore {
    window: Duration,
    max_entries: usize,
    windows: HashMap<ClusterKey, ClusterWindow>,
}

impl ClusterStore {
    pub fn new(window_secs: i64, max_entries: usize) -> Self {
        Self {
            window: Duration::seconds(window_secs),
            max_entries: max_entries.max(1),
            windows: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Insert in timestamp order. A `tx_ref` already in the window is ignored
    /// and `false` is returned. Once a window is full the oldest entry goes.
    pub fn add(&mut self, key: ClusterKey, entry: WindowEntry) -> bool {
        let window = self.windows.entry(key).or_default();
        if window.entries.iter().any(|e| e.tx_ref == entry.tx_ref) {
            return false;
        }

        let pos = window
            .entries
            .iter()
            .rposition(|e| e.observed_at <= entry.observed_at)
            .map_or(0, |i| i + 1);
        window.entries.insert(pos, entry);

        while window.entries.len() > self.max_entries {
            window.entries.pop_front();
        }
        true
    }

    /// Live entries for `key` at `now`. Expired entries are evicted first.
    pub fn snapshot(&mut self, key: &ClusterKey, now: DateTime<Utc>) -> Vec<WindowEntry> {
        let window_len = self.window;
        match self.windows.get_mut(key) {
            Some(window) => {
                window.evict(now, window_len);
                window.entries.iter().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Whether a recent signal still silences `key`.
    pub fn is_quiet(&mut self, key: &ClusterKey, now: DateTime<Utc>) -> bool {
        let window_len = self.window;
        match self.windows.get_mut(key) {
            Some(window) => {
                window.evict(now, window_len);
                window.quiet_until.is_some()
            }
            None => false,
        }
    }

    /// Drop every entry for `key` and silence it until the newest dropped
    /// entry would have expired on its own.
    pub fn clear(&mut self, key: &ClusterKey) {
        let window_len = self.window;
        if let Some(window) = self.windows.get_mut(key) {
            if let Some(newest) = window.entries.back() {
                window.quiet_until = Some(newest.observed_at + window_len);
            }
            window.entries.clear();
        }
    }

    /// Forget keys that have nothing live and are not silenced.
    pub fn sweep(&mut self, now: DateTime<Utc>) {
        let window_len = self.window;
        self.windows.retain(|_, w| {
            w.evict(now, window_len);
            !w.entries.is_empty() || w.quiet_until.is_some()
        });
    }

    pub fn open_windows(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;

    fn entry(wallet: u8, secs: i64, base: DateTime<Utc>, hash: &str) -> WindowEntry {
        WindowEntry {
            wallet: Address::from_bytes([wallet; 20]),
            size: Decimal::from(100),
            price: None,
            observed_at: base + Duration::seconds(secs),
            tx_ref: TxRef {
                tx_hash: hash.into(),
                block_number: 1,
                log_index: 0,
            },
        }
    }

    fn key() -> ClusterKey {
        ClusterKey::market_side("m", Side::Yes)
    }

    #[test]
    fn test_snapshot_evicts_expired() {
        let base = Utc::now();
        let mut store = ClusterStore::new(300, 100);
        // Inserted out of order on purpose.
        store.add(key(), entry(1, 200, base, "0x2"));
        store.add(key(), entry(2, 0, base, "0x1"));
        store.add(key(), entry(3, 400, base, "0x3"));

        let now = base + Duration::seconds(450);
        let snap = store.snapshot(&key(), now);
        assert_eq!(snap.len(), 2);
        assert!(snap.iter().all(|e| now - e.observed_at <= Duration::seconds(300)));
        assert!(snap[0].observed_at <= snap[1].observed_at);
    }

    #[test]
    fn test_boundary_entry_is_live() {
        let base = Utc::now();
        let mut store = ClusterStore::new(300, 100);
        store.add(key(), entry(1, 0, base, "0x1"));
        assert_eq!(store.snapshot(&key(), base + Duration::seconds(300)).len(), 1);
        assert_eq!(store.snapshot(&key(), base + Duration::seconds(301)).len(), 0);
    }

    #[test]
    fn test_duplicate_tx_ref_ignored() {
        let base = Utc::now();
        let mut store = ClusterStore::new(300, 100);
        assert!(store.add(key(), entry(1, 0, base, "0x1")));
        assert!(!store.add(key(), entry(1, 0, base, "0x1")));
        assert_eq!(store.snapshot(&key(), base).len(), 1);
    }

    #[test]
    fn test_cap_drops_oldest() {
        let base = Utc::now();
        let mut store = ClusterStore::new(300, 2);
        store.add(key(), entry(1, 0, base, "0x1"));
        store.add(key(), entry(2, 1, base, "0x2"));
        store.add(key(), entry(3, 2, base, "0x3"));
        let snap = store.snapshot(&key(), base + Duration::seconds(2));
        let wallets: Vec<u8> = snap.iter().map(|e| e.wallet.as_bytes()[0]).collect();
        assert_eq!(wallets, vec![2, 3]);
    }

    #[test]
    fn test_clear_sets_quiet_period() {
        let base = Utc::now();
        let mut store = ClusterStore::new(300, 100);
        store.add(key(), entry(1, 0, base, "0x1"));
        store.add(key(), entry(2, 60, base, "0x2"));
        store.clear(&key());

        assert!(store.snapshot(&key(), base + Duration::seconds(61)).is_empty());
        assert!(store.is_quiet(&key(), base + Duration::seconds(360)));
        assert!(!store.is_quiet(&key(), base + Duration::seconds(361)));
    }

    #[test]
    fn test_sweep_forgets_idle_keys() {
        let base = Utc::now();
        let mut store = ClusterStore::new(300, 100);
        store.add(key(), entry(1, 0, base, "0x1"));
        store.add(ClusterKey::market("other"), entry(1, 100, base, "0x2"));
        store.clear(&ClusterKey::market("other"));
        assert_eq!(store.open_windows(), 2);

        store.sweep(base + Duration::seconds(301));
        // "other" is still silenced
        assert_eq!(store.open_windows(), 1);
        store.sweep(base + Duration::seconds(1_000));
        assert_eq!(store.open_windows(), 0);
    }
}
