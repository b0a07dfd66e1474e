use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, MathematicalOps};

use super::window::{ClusterStore, WindowEntry};
use crate::models::{Address, ClusterKey, ClusterSignal, Confidence};

/// Multiplier on `Σ wallet_score · ln(size + 1)` before capping at 100.
const SCORE_SCALE: i64 = 5;
const MAX_SCORE: i64 = 100;

/// Thresholds a window must reach before it fires.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRules {
    pub min_wallets: usize,
    pub min_volume: Decimal,
    /// Minimum 0–100 cluster score; zero disables the gate.
    pub min_score: Decimal,
}

impl Default for ClusterRules {
    fn default() -> Self {
        Self {
            min_wallets: 3,
            min_volume: Decimal::from(1_000),
            min_score: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClusterDetector {
    rules: ClusterRules,
}

impl ClusterDetector {
    pub fn new(rules: ClusterRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ClusterRules {
        &self.rules
    }

    /// Evaluate the live window for `key`. On a fire the window is cleared,
    /// which silences the key for one more window length, so a single
    /// accumulation produces at most one signal.
    pub fn evaluate<F>(
        &self,
        store: &mut ClusterStore,
        key: &ClusterKey,
        now: DateTime<Utc>,
        wallet_score: F,
    ) -> Option<ClusterSignal>
    where
        F: Fn(&Address) -> Decimal,
    {
        if store.is_quiet(key, now) {
            return None;
        }

        let snapshot = store.snapshot(key, now);
        let (first, last) = match (snapshot.first(), snapshot.last()) {
            (Some(f), Some(l)) => (f.observed_at, l.observed_at),
            _ => return None,
        };

        let wallets: BTreeSet<Address> = snapshot.iter().map(|e| e.wallet).collect();
        let total_size: Decimal = snapshot.iter().map(|e| e.size).sum();

        if wallets.len() < self.rules.min_wallets || total_size < self.rules.min_volume {
            return None;
        }

        let score = cluster_score(&snapshot, &wallet_score);
        if score < self.rules.min_score {
            tracing::debug!(
                key = %key,
                score = %score,
                min = %self.rules.min_score,
                "Cluster below score gate"
            );
            return None;
        }

        store.clear(key);

        Some(ClusterSignal {
            key: key.clone(),
            wallets: wallets.into_iter().collect(),
            total_size,
            trade_count: snapshot.len(),
            avg_price: weighted_price(&snapshot),
            first_seen: first,
            last_seen: last,
            score,
            confidence: Confidence::from_score(score),
        })
    }
}

/// `min(100, Σ wallet_score · ln(size + 1) · 5)`, rounded to 2 dp.
pub fn cluster_score<F>(entries: &[WindowEntry], wallet_score: &F) -> Decimal
where
    F: Fn(&Address) -> Decimal,
{
    let raw: Decimal = entries
        .iter()
        .map(|e| {
            let weight = wallet_score(&e.wallet);
            let log_size = (e.size.max(Decimal::ZERO) + Decimal::ONE)
                .checked_ln()
                .unwrap_or(Decimal::ZERO);
            weight * log_size
        })
        .sum();

    (raw * Decimal::from(SCORE_SCALE))
        .min(Decimal::from(MAX_SCORE))
        .max(Decimal::ZERO)
        .round_dp(2)
}

/// Size-weighted average over entries that carry a price.
fn weighted_price(entries: &[WindowEntry]) -> Option<Decimal> {
    let (notional, size) = entries
        .iter()
        .filter_map(|e| e.price.map(|p| (p * e.size, e.size)))
        .fold((Decimal::ZERO, Decimal::ZERO), |(n, s), (pn, ps)| (n + pn, s + ps));
    if size.is_zero() {
        None
    } else {
        Some((notional / size).round_dp(4))
    }
}
