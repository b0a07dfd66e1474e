use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::position_sizer::{calculate_size, SizingStrategy};
use crate::models::{ClusterSignal, Side, Trade};

#[derive(Debug, Clone, PartialEq)]
pub struct PaperConfig {
    pub bankroll: Decimal,
    pub stake: Decimal,
    pub sizing: SizingStrategy,
    /// Percent gain on entry that closes a position.
    pub take_profit_pct: Decimal,
    /// Percent loss on entry that closes a position.
    pub stop_loss_pct: Decimal,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            bankroll: Decimal::from(1_000),
            stake: Decimal::from(50),
            sizing: SizingStrategy::Fixed,
            take_profit_pct: Decimal::from(50),
            stop_loss_pct: Decimal::from(15),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaperPosition {
    pub market_id: String,
    pub side: Side,
    /// USDC committed.
    pub stake: Decimal,
    /// Price paid for the `side` leg.
    pub entry_price: Decimal,
    pub cluster_score: Decimal,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    Reversal,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::TakeProfit => write!(f, "take_profit"),
            ExitReason::StopLoss => write!(f, "stop_loss"),
            ExitReason::Reversal => write!(f, "reversal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaperEvent {
    Opened(PaperPosition),
    Closed {
        position: PaperPosition,
        exit_price: Decimal,
        pnl: Decimal,
        reason: ExitReason,
    },
}

/// Simulated follower of cluster signals. Holds at most one position per
/// market and never spends more than its free capital.
#[derive(Debug)]
pub struct PaperTrader {
    config: PaperConfig,
    capital: Decimal,
    positions: HashMap<String, PaperPosition>,
    realized_pnl: Decimal,
    wins: u64,
    losses: u64,
}

impl PaperTrader {
    pub fn new(config: PaperConfig) -> Self {
        Self {
            capital: config.bankroll,
            config,
            positions: HashMap::new(),
            realized_pnl: Decimal::ZERO,
            wins: 0,
            losses: 0,
        }
    }

    /// Free capital not tied up in positions.
    pub fn capital(&self) -> Decimal {
        self.capital
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    pub fn wins(&self) -> u64 {
        self.wins
    }

    pub fn losses(&self) -> u64 {
        self.losses
    }

    pub fn open_positions(&self) -> usize {
        self.positions.len()
    }

    pub fn position(&self, market_id: &str) -> Option<&PaperPosition> {
        self.positions.get(market_id)
    }

    /// React to a cluster signal. Signals without a direction or a price are
    /// ignored. An opposite-direction signal closes the open position first.
    pub fn on_signal(&mut self, signal: &ClusterSignal, now: DateTime<Utc>) -> Vec<PaperEvent> {
        let mut events = Vec::new();

        let side = match signal.key.side {
            Some(side @ (Side::Yes | Side::No)) => side,
            _ => return events,
        };
        let Some(price) = signal.avg_price else {
            return events;
        };
        let market_id = &signal.key.market_id;

        if let Some(pos) = self.positions.get(market_id) {
            if pos.side == side {
                tracing::debug!(market = %market_id, "Paper position already open on this side");
                return events;
            }
            // The signal's price is for the opposite leg.
            let exit_price = Decimal::ONE - price;
            if let Some(event) = self.close(market_id, exit_price, ExitReason::Reversal) {
                events.push(event);
            }
        }

        if price <= Decimal::ZERO || price >= Decimal::ONE {
            tracing::debug!(market = %market_id, price = %price, "Paper entry price out of range");
            return events;
        }

        let stake = calculate_size(self.config.sizing, self.capital, self.config.stake, signal.score);
        if stake <= Decimal::ZERO {
            tracing::info!(
                market = %market_id,
                capital = %self.capital,
                "Paper trader: insufficient capital, skipping signal"
            );
            return events;
        }

        let position = PaperPosition {
            market_id: market_id.clone(),
            side,
            stake,
            entry_price: price,
            cluster_score: signal.score,
            opened_at: now,
        };
        self.capital -= stake;
        self.positions.insert(market_id.clone(), position.clone());
        tracing::info!(
            market = %market_id,
            side = %side,
            stake = %stake,
            entry = %price,
            capital = %self.capital,
            "Paper position opened"
        );
        events.push(PaperEvent::Opened(position));
        events
    }

    /// Mark the position in `trade`'s market to the trade's price and close
    /// it if take-profit or stop-loss is crossed.
    pub fn on_trade(&mut self, trade: &Trade) -> Option<PaperEvent> {
        let pos = self.positions.get(&trade.market_id)?;
        let yes_price = trade.yes_price()?;
        let mark = match pos.side {
            Side::Yes => yes_price,
            _ => Decimal::ONE - yes_price,
        };
        if pos.entry_price.is_zero() {
            return None;
        }

        let pnl_pct = (mark - pos.entry_price) / pos.entry_price * Decimal::ONE_HUNDRED;
        let reason = if pnl_pct >= self.config.take_profit_pct {
            ExitReason::TakeProfit
        } else if pnl_pct <= -self.config.stop_loss_pct {
            ExitReason::StopLoss
        } else {
            return None;
        };

        let market_id = trade.market_id.clone();
        self.close(&market_id, mark, reason)
    }

    fn close(&mut self, market_id: &str, exit_price: Decimal, reason: ExitReason) -> Option<PaperEvent> {
        let position = self.positions.remove(market_id)?;
        let proceeds = (position.stake * exit_price / position.entry_price).round_dp(6);
        let pnl = proceeds - position.stake;

        self.capital += proceeds;
        self.realized_pnl += pnl;
        if pnl > Decimal::ZERO {
            self.wins += 1;
        } else {
            self.losses += 1;
        }

        tracing::info!(
            market = %market_id,
            reason = %reason,
            exit = %exit_price,
            pnl = %pnl,
            capital = %self.capital,
            "Paper position closed"
        );

        Some(PaperEvent::Closed {
            position,
            exit_price,
            pnl,
            reason,
        })
    }
}
