use std::collections::HashSet;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::intelligence::WalletRegistry;
use crate::models::Address;
use crate::polymarket::{DataClient, DataClientError, LeaderboardEntry};

/// Which leaderboard entries are pinned as significant.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedCriteria {
    pub limit: u32,
    pub min_pnl: Decimal,
    pub min_volume: Decimal,
}

impl Default for SeedCriteria {
    fn default() -> Self {
        Self {
            limit: 50,
            min_pnl: Decimal::ZERO,
            min_volume: Decimal::from(1_000),
        }
    }
}

/// Reputation source plus its refresh schedule.
#[derive(Debug, Clone)]
pub struct WalletSeeder {
    client: DataClient,
    criteria: SeedCriteria,
    refresh_every: Duration,
}

impl WalletSeeder {
    pub fn new(client: DataClient, criteria: SeedCriteria, refresh_every: Duration) -> Self {
        Self {
            client,
            criteria,
            refresh_every,
        }
    }

    pub fn refresh_every(&self) -> Duration {
        self.refresh_every
    }

    /// Fetch the leaderboard and replace the registry's pinned set. On error
    /// the registry is left untouched.
    pub async fn refresh(&self, registry: &mut WalletRegistry) -> Result<usize, DataClientError> {
        let entries = self.client.get_leaderboard(self.criteria.limit).await?;
        let wallets = select_wallets(&entries, &self.criteria);
        let total = wallets.len();
        let added = registry.replace_pinned(wallets);

        tracing::info!(
            fetched = entries.len(),
            pinned = total,
            new = added,
            "Seeded wallets from leaderboard"
        );
        Ok(total)
    }
}

/// Positive-PnL, meaningful-volume entries with a parseable address.
pub fn select_wallets(entries: &[LeaderboardEntry], criteria: &SeedCriteria) -> HashSet<Address> {
    entries
        .iter()
        .filter(|entry| {
            let pnl = entry.pnl.unwrap_or(Decimal::ZERO);
            let vol = entry.volume.unwrap_or(Decimal::ZERO);
            pnl > criteria.min_pnl && vol > criteria.min_volume
        })
        .filter_map(|entry| {
            let raw = entry.address.as_deref()?;
            match raw.parse::<Address>() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    tracing::debug!(address = %raw, "Skipping leaderboard entry with bad address");
                    None
                }
            }
        })
        .collect()
}
