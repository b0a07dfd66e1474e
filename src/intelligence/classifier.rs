use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use super::scorer::{score_profile, ScoringParams};
use crate::config::ClassifierPolicy;
use crate::models::{Address, OpenPosition, Trade, WalletProfile};

/// Per-close returns kept for the sharpe component.
const MAX_RETURNS: usize = 500;
/// Per-close returns are clamped to [-100%, +500%].
const MAX_RETURN: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Answers "is this wallet significant?". Owns every [`WalletProfile`].
///
/// Addresses from the configured list and from the reputation source are
/// always significant. Under the scored policy any other wallet qualifies once
/// its score reaches the threshold.
#[derive(Debug)]
pub struct WalletRegistry {
    policy: ClassifierPolicy,
    params: ScoringParams,
    score_threshold: Decimal,
    allow_list: HashSet<Address>,
    pinned: HashSet<Address>,
    profiles: HashMap<Address, WalletProfile>,
    dirty: bool,
}

impl WalletRegistry {
    pub fn new(policy: ClassifierPolicy, params: ScoringParams, score_threshold: Decimal) -> Self {
        Self {
            policy,
            params,
            score_threshold,
            allow_list: HashSet::new(),
            pinned: HashSet::new(),
            profiles: HashMap::new(),
            dirty: false,
        }
    }

    pub fn allow_list_only(wallets: impl IntoIterator<Item = Address>) -> Self {
        let mut registry = Self::new(
            ClassifierPolicy::AllowList,
            ScoringParams::default(),
            Decimal::ONE,
        );
        registry.extend_allow_list(wallets);
        registry
    }

    pub fn policy(&self) -> ClassifierPolicy {
        self.policy
    }

    pub fn extend_allow_list(&mut self, wallets: impl IntoIterator<Item = Address>) {
        self.allow_list.extend(wallets);
    }

    /// Replace the reputation-source set. Returns how many addresses are new.
    pub fn replace_pinned(&mut self, wallets: HashSet<Address>) -> usize {
        let added = wallets.difference(&self.pinned).count();
        self.pinned = wallets;
        added
    }

    pub fn pinned_count(&self) -> usize {
        self.pinned.len()
    }

    fn is_listed(&self, wallet: &Address) -> bool {
        self.allow_list.contains(wallet) || self.pinned.contains(wallet)
    }

    pub fn is_significant(&self, wallet: &Address) -> bool {
        if self.is_listed(wallet) {
            return true;
        }
        match self.policy {
            ClassifierPolicy::AllowList => false,
            ClassifierPolicy::Scored => self
                .profiles
                .get(wallet)
                .is_some_and(|p| p.score() > Decimal::ZERO && p.score() > self.score_threshold),
        }
    }

    /// Score in [0, 1]. Listed wallets count as 1 under the allow-list policy;
    /// under the scored policy their score is floored at the threshold.
    pub fn score(&self, wallet: &Address) -> Decimal {
        let profile_score = self
            .profiles
            .get(wallet)
            .map(WalletProfile::score)
            .unwrap_or(Decimal::ZERO);

        match (self.policy, self.is_listed(wallet)) {
            (ClassifierPolicy::AllowList, true) => Decimal::ONE,
            (ClassifierPolicy::AllowList, false) => Decimal::ZERO,
            (ClassifierPolicy::Scored, true) => profile_score.max(self.score_threshold),
            (ClassifierPolicy::Scored, false) => profile_score,
        }
    }

    /// Fold one trade into its wallet's profile. A no-op under the allow-list
    /// policy and for trades without a price or a positive size.
    pub fn update(&mut self, trade: &Trade) {
        if self.policy == ClassifierPolicy::AllowList || trade.size <= Decimal::ZERO {
            return;
        }
        let Some(price) = trade.price else {
            return;
        };

        let profile = self
            .profiles
            .entry(trade.wallet)
            .or_insert_with(|| WalletProfile::new(trade.wallet));
        apply_trade(profile, trade, price);
        profile.score = score_profile(profile, &self.params);
        self.dirty = true;
    }

    pub fn profile(&self, wallet: &Address) -> Option<&WalletProfile> {
        self.profiles.get(wallet)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &WalletProfile> {
        self.profiles.values()
    }

    pub fn tracked_wallets(&self) -> usize {
        self.profiles.len()
    }

    /// Restore persisted profiles. Scores are recomputed, never trusted from disk.
    pub fn load_profiles(&mut self, profiles: impl IntoIterator<Item = WalletProfile>) -> usize {
        let mut loaded = 0;
        for mut profile in profiles {
            profile.score = score_profile(&profile, &self.params);
            self.profiles.insert(profile.address, profile);
            loaded += 1;
        }
        loaded
    }

    /// True once after any profile changed.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

// ---------------------------------------------------------------------------
// Position bookkeeping
// ---------------------------------------------------------------------------

fn apply_trade(profile: &mut WalletProfile, trade: &Trade, price: Decimal) {
    profile.trade_count += 1;
    profile.total_volume += trade.size;
    profile.last_trade_at = Some(
        profile
            .last_trade_at
            .map_or(trade.observed_at, |t| t.max(trade.observed_at)),
    );

    let n = Decimal::from(profile.priced_trades);
    profile.avg_price = (profile.avg_price * n + price) / (n + Decimal::ONE);
    profile.priced_trades += 1;

    if trade.side.opposite().is_none() {
        return;
    }

    match profile.open_positions.get_mut(&trade.market_id) {
        Some(pos) if pos.side == trade.side => {
            // Same direction: average in.
            let cost = pos.cost + trade.size;
            pos.entry_price = (pos.entry_price * pos.cost + price * trade.size) / cost;
            pos.cost = cost;
        }
        Some(pos) => {
            // Reversal closes the open leg at the complement of this trade's price.
            let closed = pos.clone();
            close_position(profile, &closed, Decimal::ONE - price);
            profile.open_positions.insert(
                trade.market_id.clone(),
                OpenPosition {
                    side: trade.side,
                    cost: trade.size,
                    entry_price: price,
                },
            );
        }
        None => {
            profile.open_positions.insert(
                trade.market_id.clone(),
                OpenPosition {
                    side: trade.side,
                    cost: trade.size,
                    entry_price: price,
                },
            );
        }
    }
}

fn close_position(profile: &mut WalletProfile, pos: &OpenPosition, exit_price: Decimal) {
    if pos.entry_price.is_zero() || pos.cost.is_zero() {
        return;
    }

    let ret = exit_price
        .checked_div(pos.entry_price)
        .map_or(MAX_RETURN, |ratio| ratio - Decimal::ONE)
        .clamp(-Decimal::ONE, MAX_RETURN);
    let pnl = pos.cost * ret;
    profile.realized_pnl += pnl;
    if pnl > Decimal::ZERO {
        profile.win_count += 1;
    } else {
        profile.loss_count += 1;
    }

    profile.returns.push(ret);
    if profile.returns.len() > MAX_RETURNS {
        let excess = profile.returns.len() - MAX_RETURNS;
        profile.returns.drain(..excess);
    }
}
