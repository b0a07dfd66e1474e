/// Last fully processed block height. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainCursor {
    last_processed_block: u64,
}

impl ChainCursor {
    pub fn new(last_processed_block: u64) -> Self {
        Self {
            last_processed_block,
        }
    }

    pub fn last_processed(&self) -> u64 {
        self.last_processed_block
    }

    /// Next inclusive range to scan, capped at `max_range` blocks.
    /// `None` when the chain has not moved past the cursor.
    pub fn next_range(&self, height: u64, max_range: u64) -> Option<(u64, u64)> {
        if height <= self.last_processed_block {
            return None;
        }
        let from = self.last_processed_block + 1;
        let to = height.min(self.last_processed_block.saturating_add(max_range.max(1)));
        Some((from, to))
    }

    /// Advance after a range has been fully processed. Returns false (and
    /// leaves the cursor alone) for an attempt to move backwards.
    pub fn advance(&mut self, to: u64) -> bool {
        if to < self.last_processed_block {
            tracing::warn!(
                cursor = self.last_processed_block,
                requested = to,
                "Refusing to move chain cursor backwards"
            );
            return false;
        }
        self.last_processed_block = to;
        true
    }
}
