use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use crate::models::WalletProfile;

/// Weights of the linear wallet score. They sum to 1 so the score stays in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub win_rate: Decimal,
    pub roi: Decimal,
    pub sharpe: Decimal,
    pub volume: Decimal,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            win_rate: Decimal::new(35, 2),
            roi: Decimal::new(25, 2),
            sharpe: Decimal::new(25, 2),
            volume: Decimal::new(15, 2),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringParams {
    pub weights: ScoreWeights,
    /// Wallets with fewer trades than this always score 0.
    pub min_trades: u64,
    /// Volume at which the saturation factor reaches 1.
    pub volume_cap: Decimal,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            min_trades: 30,
            volume_cap: Decimal::from(100_000),
        }
    }
}

/// Sharpe ratios at or above this map to a full sharpe component.
const SHARPE_SATURATION: Decimal = Decimal::from_parts(3, 0, 0, false, 0);

/// Deterministic score in [0, 1] derived from a profile's counters.
pub fn score_profile(profile: &WalletProfile, params: &ScoringParams) -> Decimal {
    if profile.trade_count < params.min_trades {
        return Decimal::ZERO;
    }

    let w = &params.weights;
    let wr = win_rate(profile.win_count, profile.loss_count);
    let roi = clamp_unit(roi(profile.realized_pnl, profile.total_volume));
    let sharpe = clamp_unit(sharpe_ratio(&profile.returns) / SHARPE_SATURATION);
    let volume = volume_factor(profile.total_volume, params.volume_cap);

    let score = w.win_rate * wr + w.roi * roi + w.sharpe * sharpe + w.volume * volume;
    clamp_unit(score).round_dp(6)
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Risk-adjusted return: mean(returns) / stddev(returns).
/// Returns Decimal::ZERO if insufficient data or the moments overflow.
pub fn sharpe_ratio(returns: &[Decimal]) -> Decimal {
    if returns.len() < 2 {
        return Decimal::ZERO;
    }

    let n = Decimal::from(returns.len() as i64);
    let Some(total) = returns
        .iter()
        .try_fold(Decimal::ZERO, |acc, r| acc.checked_add(*r))
    else {
        return Decimal::ZERO;
    };
    let mean = total / n;

    let Some(sum_sq) = returns.iter().try_fold(Decimal::ZERO, |acc, r| {
        let diff = r.checked_sub(mean)?;
        acc.checked_add(diff.checked_mul(diff)?)
    }) else {
        return Decimal::ZERO;
    };
    let variance = sum_sq / n;

    let std_dev = variance.sqrt().unwrap_or(Decimal::ZERO);

    if std_dev.is_zero() {
        return Decimal::ZERO;
    }

    mean / std_dev
}

/// Fraction of closed positions that were profitable.
pub fn win_rate(wins: u64, losses: u64) -> Decimal {
    let closed = wins + losses;
    if closed == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(wins) / Decimal::from(closed)
}

pub fn roi(realized_pnl: Decimal, total_volume: Decimal) -> Decimal {
    if total_volume.is_zero() {
        return Decimal::ZERO;
    }
    realized_pnl / total_volume
}

/// `min(volume / cap, 1)`.
pub fn volume_factor(volume: Decimal, cap: Decimal) -> Decimal {
    if cap <= Decimal::ZERO {
        return Decimal::ONE;
    }
    clamp_unit(volume / cap)
}

fn clamp_unit(v: Decimal) -> Decimal {
    v.max(Decimal::ZERO).min(Decimal::ONE)
}
