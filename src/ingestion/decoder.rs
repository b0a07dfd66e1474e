use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::side::{FillContext, SideResolver};
use crate::models::{Address, LogEntry, Trade, TxRef};

/// Keccak256 of OrderFilled(bytes32,address,address,uint256,uint256,uint256,uint256,uint256)
pub const ORDER_FILLED_TOPIC: [u8; 32] = [
    0xd0, 0xa0, 0x8e, 0x8c, 0x49, 0x3f, 0x9c, 0x94,
    0xf2, 0x93, 0x11, 0x60, 0x4c, 0x9d, 0xe1, 0xb4,
    0xe8, 0xc8, 0xd4, 0xc0, 0x6b, 0xd0, 0xc7, 0x89,
    0xaf, 0x57, 0xf2, 0xd6, 0x5b, 0xfe, 0xc0, 0xf6,
];

/// USDC and CTF outcome tokens on Polygon both have 6 decimals.
pub const USDC_DECIMALS: u32 = 6;

const WORD: usize = 32;
const ORDER_FILLED_TOPICS: usize = 4;
const ORDER_FILLED_WORDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("{what} truncated: expected {expected}, got {got}")]
    Truncated {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("degenerate fill: {0} amount is zero")]
    DegenerateFill(&'static str),

    #[error("{0} amount out of range")]
    Overflow(&'static str),

    #[error("{0} topic is not a padded address")]
    MalformedAddress(&'static str),
}

impl DecodeError {
    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::Truncated { .. } => "truncated",
            DecodeError::DegenerateFill(_) => "degenerate_fill",
            DecodeError::Overflow(_) => "overflow",
            DecodeError::MalformedAddress(_) => "malformed_address",
        }
    }

    /// Overflow and malformed topics should never come out of the exchange
    /// contract, so they are worth a louder log line.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            DecodeError::Overflow(_) | DecodeError::MalformedAddress(_)
        )
    }
}

/// The raw fields of one OrderFilled event.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OrderFill {
    maker: Address,
    taker: Address,
    maker_asset_id: [u8; 32],
    taker_asset_id: [u8; 32],
    maker_amount: Decimal,
    taker_amount: Decimal,
}

impl OrderFill {
    fn parse(log: &LogEntry) -> Result<Self, DecodeError> {
        if log.topics.len() < ORDER_FILLED_TOPICS {
            return Err(DecodeError::Truncated {
                what: "topics",
                expected: ORDER_FILLED_TOPICS,
                got: log.topics.len(),
            });
        }
        if log.data.len() < ORDER_FILLED_WORDS * WORD {
            return Err(DecodeError::Truncated {
                what: "data",
                expected: ORDER_FILLED_WORDS * WORD,
                got: log.data.len(),
            });
        }

        // topics[1] = orderHash (unused)
        let maker = address_topic(&log.topics[2], "maker")?;
        let taker = address_topic(&log.topics[3], "taker")?;

        let maker_asset_id = data_word(&log.data, 0);
        let taker_asset_id = data_word(&log.data, 1);
        let maker_amount = scaled_amount(&data_word(&log.data, 2), "maker")?;
        let taker_amount = scaled_amount(&data_word(&log.data, 3), "taker")?;
        // word 4 = fee (unused)

        if maker_amount.is_zero() {
            return Err(DecodeError::DegenerateFill("maker"));
        }
        if taker_amount.is_zero() {
            return Err(DecodeError::DegenerateFill("taker"));
        }

        Ok(Self {
            maker,
            taker,
            maker_asset_id,
            taker_asset_id,
            maker_amount,
            taker_amount,
        })
    }
}

/// Turns exchange logs into [`Trade`]s. Holds no mutable state: the same log
/// always decodes to the same result.
pub struct EventDecoder {
    resolver: Box<dyn SideResolver>,
}

impl EventDecoder {
    pub fn new(resolver: Box<dyn SideResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver_name(&self) -> &'static str {
        self.resolver.name()
    }

    /// `Ok(None)` for logs with another event signature.
    pub fn decode(
        &self,
        log: &LogEntry,
        observed_at: DateTime<Utc>,
    ) -> Result<Option<Trade>, DecodeError> {
        match log.topics.first() {
            Some(topic) if *topic == ORDER_FILLED_TOPIC => {}
            _ => return Ok(None),
        }

        let fill = OrderFill::parse(log)?;

        // Asset id 0 is the USDC leg. The maker gives `maker_asset_id` and
        // receives `taker_asset_id`.
        let maker_pays_cash = is_zero(&fill.maker_asset_id);
        let taker_pays_cash = is_zero(&fill.taker_asset_id);

        let (token_id, cash, tokens) = match (maker_pays_cash, taker_pays_cash) {
            (true, true) => return Err(DecodeError::DegenerateFill("outcome token")),
            (true, false) => (fill.taker_asset_id, Some(fill.maker_amount), fill.taker_amount),
            (false, true) => (fill.maker_asset_id, Some(fill.taker_amount), fill.maker_amount),
            // Token-for-token (complementary mint/merge); no USDC leg to price against.
            (false, false) => (fill.maker_asset_id, None, fill.maker_amount),
        };

        let size = cash.unwrap_or(tokens);
        let price = cash
            .and_then(|c| c.checked_div(tokens))
            .filter(|p| *p >= Decimal::ZERO && *p <= Decimal::ONE);

        let market_id = word_to_decimal_string(&token_id);
        let (side, side_source) = self.resolver.resolve(&FillContext {
            token_id: &token_id,
            market_id: &market_id,
            price,
        });

        Ok(Some(Trade {
            wallet: fill.maker,
            counterparty: Some(fill.taker),
            market_id,
            side,
            side_source,
            size,
            price,
            observed_at,
            tx_ref: TxRef {
                tx_hash: log.tx_hash.clone(),
                block_number: log.block_number,
                log_index: log.log_index,
            },
        }))
    }
}

// ---------------------------------------------------------------------------
// ABI word helpers
// ---------------------------------------------------------------------------

fn data_word(data: &[u8], index: usize) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&data[index * WORD..(index + 1) * WORD]);
    out
}

fn is_zero(word: &[u8; 32]) -> bool {
    word.iter().all(|b| *b == 0)
}

fn address_topic(word: &[u8; 32], what: &'static str) -> Result<Address, DecodeError> {
    if word[..12].iter().any(|b| *b != 0) {
        return Err(DecodeError::MalformedAddress(what));
    }
    Ok(Address::from_word(word))
}

/// Big-endian uint256 scaled by 10^6. Anything past u128, or past what a
/// `Decimal` can hold, is rejected.
fn scaled_amount(word: &[u8; 32], what: &'static str) -> Result<Decimal, DecodeError> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(DecodeError::Overflow(what));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    let raw = i128::try_from(u128::from_be_bytes(low)).map_err(|_| DecodeError::Overflow(what))?;
    Decimal::try_from_i128_with_scale(raw, USDC_DECIMALS)
        .map(|d| d.normalize())
        .map_err(|_| DecodeError::Overflow(what))
}

/// Render a uint256 as its full decimal string. CTF token ids overflow u128,
/// so the general case accumulates base-10 digits byte by byte.
pub fn word_to_decimal_string(word: &[u8; 32]) -> String {
    let Some(start) = word.iter().position(|b| *b != 0) else {
        return "0".to_string();
    };
    let bytes = &word[start..];

    // Fast path
    if bytes.len() <= 16 {
        let mut buf = [0u8; 16];
        buf[16 - bytes.len()..].copy_from_slice(bytes);
        return u128::from_be_bytes(buf).to_string();
    }

    // Least-significant digit first.
    let mut digits: Vec<u8> = vec![0];
    for &byte in bytes {
        let mut carry = u32::from(byte);
        for d in digits.iter_mut() {
            let val = u32::from(*d) * 256 + carry;
            *d = (val % 10) as u8;
            carry = val / 10;
        }
        while carry > 0 {
            digits.push((carry % 10) as u8);
            carry /= 10;
        }
    }

    digits.iter().rev().map(|d| (d + b'0') as char).collect()
}
