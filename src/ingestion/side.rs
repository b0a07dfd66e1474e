//! Trade-direction heuristics.
//!
//! On-chain fills do not say which outcome a token represents, so direction is
//! inferred. Each resolver tags its answer with a [`SideSource`] so downstream
//! consumers can tell which heuristic was applied.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::errors::ConfigError;
use crate::models::{Side, SideSource};

/// What a resolver may look at when deciding direction.
#[derive(Debug, Clone, Copy)]
pub struct FillContext<'a> {
    /// Raw 256-bit outcome token id.
    pub token_id: &'a [u8; 32],
    /// Same id in decimal form.
    pub market_id: &'a str,
    pub price: Option<Decimal>,
}

pub trait SideResolver: Send + Sync {
    fn resolve(&self, fill: &FillContext<'_>) -> (Side, SideSource);

    fn name(&self) -> &'static str;
}

/// YES when the implied price is at or above `threshold`, NO below it.
#[derive(Debug, Clone)]
pub struct PriceThresholdResolver {
    threshold: Decimal,
}

impl PriceThresholdResolver {
    pub fn new(threshold: Decimal) -> Self {
        Self { threshold }
    }
}

impl Default for PriceThresholdResolver {
    fn default() -> Self {
        Self::new(Decimal::new(5, 1))
    }
}

impl SideResolver for PriceThresholdResolver {
    fn resolve(&self, fill: &FillContext<'_>) -> (Side, SideSource) {
        match fill.price {
            Some(p) if p >= self.threshold => (Side::Yes, SideSource::PriceThreshold),
            Some(_) => (Side::No, SideSource::PriceThreshold),
            None => (Side::Unknown, SideSource::Unresolved),
        }
    }

    fn name(&self) -> &'static str {
        "price"
    }
}

/// `outcome_index = token_id & 1`; index 0 is YES.
#[derive(Debug, Clone, Default)]
pub struct TokenParityResolver;

impl SideResolver for TokenParityResolver {
    fn resolve(&self, fill: &FillContext<'_>) -> (Side, SideSource) {
        if fill.token_id.iter().all(|b| *b == 0) {
            return (Side::Unknown, SideSource::Unresolved);
        }
        match fill.token_id[31] & 1 {
            0 => (Side::Yes, SideSource::TokenParity),
            _ => (Side::No, SideSource::TokenParity),
        }
    }

    fn name(&self) -> &'static str {
        "parity"
    }
}

/// Explicit token id → outcome table.
#[derive(Debug, Clone, Default)]
pub struct TokenMapResolver {
    map: HashMap<String, Side>,
}

impl TokenMapResolver {
    pub fn new(map: HashMap<String, Side>) -> Self {
        Self { map }
    }

    /// Parse `token_id,YES|NO` lines. Blank lines and `#` comments are ignored.
    pub fn from_csv(contents: &str) -> Result<Self, ConfigError> {
        let mut map = HashMap::new();
        for line in contents.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let (token, label) = line.split_once(',').ok_or_else(|| ConfigError::Invalid {
                name: "SIDE_MAP_FILE",
                value: line.to_string(),
            })?;
            let side = Side::from_label(label).ok_or_else(|| ConfigError::Invalid {
                name: "SIDE_MAP_FILE",
                value: line.to_string(),
            })?;
            map.insert(token.trim().to_string(), side);
        }
        Ok(Self { map })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl SideResolver for TokenMapResolver {
    fn resolve(&self, fill: &FillContext<'_>) -> (Side, SideSource) {
        match self.map.get(fill.market_id) {
            Some(side) => (*side, SideSource::TokenMap),
            None => (Side::Unknown, SideSource::Unresolved),
        }
    }

    fn name(&self) -> &'static str {
        "map"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(last: u8) -> [u8; 32] {
        let mut t = [0u8; 32];
        t[0] = 0x75;
        t[31] = last;
        t
    }

    fn ctx<'a>(token_id: &'a [u8; 32], market_id: &'a str, price: Option<Decimal>) -> FillContext<'a> {
        FillContext {
            token_id,
            market_id,
            price,
        }
    }

    #[test]
    fn test_price_threshold() {
        let r = PriceThresholdResolver::default();
        let t = token(2);
        assert_eq!(r.resolve(&ctx(&t, "1", Some(Decimal::new(7, 1)))).0, Side::Yes);
        assert_eq!(r.resolve(&ctx(&t, "1", Some(Decimal::new(5, 1)))).0, Side::Yes);
        assert_eq!(r.resolve(&ctx(&t, "1", Some(Decimal::new(49, 2)))).0, Side::No);
        assert_eq!(
            r.resolve(&ctx(&t, "1", None)),
            (Side::Unknown, SideSource::Unresolved)
        );
    }

    #[test]
    fn test_token_parity() {
        let r = TokenParityResolver;
        let even = token(0x86);
        let odd = token(0x87);
        let zero = [0u8; 32];
        assert_eq!(r.resolve(&ctx(&even, "x", None)), (Side::Yes, SideSource::TokenParity));
        assert_eq!(r.resolve(&ctx(&odd, "x", None)), (Side::No, SideSource::TokenParity));
        assert_eq!(r.resolve(&ctx(&zero, "x", None)).0, Side::Unknown);
    }

    #[test]
    fn test_token_map_from_csv() {
        let r = TokenMapResolver::from_csv("# comment\n123,YES\n456, no\n\n").unwrap();
        assert_eq!(r.len(), 2);
        let t = token(0);
        assert_eq!(r.resolve(&ctx(&t, "123", None)), (Side::Yes, SideSource::TokenMap));
        assert_eq!(r.resolve(&ctx(&t, "456", None)).0, Side::No);
        assert_eq!(r.resolve(&ctx(&t, "789", None)).1, SideSource::Unresolved);
    }

    #[test]
    fn test_token_map_rejects_bad_line() {
        assert!(TokenMapResolver::from_csv("123;YES").is_err());
        assert!(TokenMapResolver::from_csv("123,MAYBE").is_err());
    }
}
