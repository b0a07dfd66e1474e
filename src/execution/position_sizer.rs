use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sizing strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizingStrategy {
    /// Always the configured stake.
    Fixed,
    /// Stake scaled by cluster score / 100.
    Scaled,
}

impl fmt::Display for SizingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizingStrategy::Fixed => write!(f, "fixed"),
            SizingStrategy::Scaled => write!(f, "scaled"),
        }
    }
}

/// Stake for a new paper position, clamped to `[0, available]`.
pub fn calculate_size(
    strategy: SizingStrategy,
    available: Decimal,
    stake: Decimal,
    cluster_score: Decimal,
) -> Decimal {
    let raw = match strategy {
        SizingStrategy::Fixed => stake,
        SizingStrategy::Scaled => scaled_size(stake, cluster_score),
    };

    raw.max(Decimal::ZERO).min(available.max(Decimal::ZERO))
}

/// Stake × score/100, score clamped to 0–100.
fn scaled_size(stake: Decimal, cluster_score: Decimal) -> Decimal {
    let strength = cluster_score.max(Decimal::ZERO).min(Decimal::ONE_HUNDRED) / Decimal::ONE_HUNDRED;
    (stake * strength).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_size() {
        let size = calculate_size(
            SizingStrategy::Fixed,
            Decimal::from(1_000),
            Decimal::from(50),
            Decimal::from(10),
        );
        assert_eq!(size, Decimal::from(50));
    }

    #[test]
    fn test_scaled_size() {
        // 100 × 0.8
        let size = calculate_size(
            SizingStrategy::Scaled,
            Decimal::from(1_000),
            Decimal::from(100),
            Decimal::from(80),
        );
        assert_eq!(size, Decimal::from(80));
    }

    #[test]
    fn test_calculate_size_clamped() {
        let size = calculate_size(
            SizingStrategy::Fixed,
            Decimal::from(30),
            Decimal::from(50),
            Decimal::ZERO,
        );
        assert_eq!(size, Decimal::from(30));

        let broke = calculate_size(
            SizingStrategy::Scaled,
            Decimal::ZERO,
            Decimal::from(50),
            Decimal::from(90),
        );
        assert_eq!(broke, Decimal::ZERO);
    }
}
