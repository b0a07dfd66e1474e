use std::collections::{BTreeMap, HashSet};

use crate::models::TxRef;

/// Bounded set of already-ingested fills, keyed by block so that everything
/// older than `horizon_blocks` behind the newest block can be dropped at once.
/// Retried ranges re-fetch the same logs; this keeps them from counting twice.
#[derive(Debug)]
pub struct SeenTxSet {
    horizon_blocks: u64,
    by_block: BTreeMap<u64, HashSet<(String, u64)>>,
    len: usize,
}

impl SeenTxSet {
    pub fn new(horizon_blocks: u64) -> Self {
        Self {
            horizon_blocks,
            by_block: BTreeMap::new(),
            len: 0,
        }
    }

    /// Record `tx_ref`. Returns false if it was already present.
    pub fn insert(&mut self, tx_ref: &TxRef) -> bool {
        let inserted = self
            .by_block
            .entry(tx_ref.block_number)
            .or_default()
            .insert((tx_ref.tx_hash.clone(), tx_ref.log_index));
        if inserted {
            self.len += 1;
            self.prune();
        }
        inserted
    }

    pub fn contains(&self, tx_ref: &TxRef) -> bool {
        self.by_block
            .get(&tx_ref.block_number)
            .is_some_and(|set| set.contains(&(tx_ref.tx_hash.clone(), tx_ref.log_index)))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn prune(&mut self) {
        let Some(&newest) = self.by_block.keys().next_back() else {
            return;
        };
        let floor = newest.saturating_sub(self.horizon_blocks);
        let keep = self.by_block.split_off(&floor);
        let dropped: usize = self.by_block.values().map(HashSet::len).sum();
        self.by_block = keep;
        self.len -= dropped;
    }
}
