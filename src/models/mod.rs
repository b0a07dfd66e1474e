pub mod log;
pub mod signal;
pub mod trade;
pub mod wallet;

pub use log::{Block, LogEntry};
pub use signal::{ClusterKey, ClusterSignal, Confidence};
pub use trade::{SideSource, Trade, TxRef};
pub use wallet::{OpenPosition, WalletProfile};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// Directional leg of a binary-outcome trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Yes,
    No,
    Unknown,
}

impl Side {
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "YES" | "Y" | "0" => Some(Side::Yes),
            "NO" | "N" | "1" => Some(Side::No),
            _ => None,
        }
    }

    /// The other leg. `Unknown` has no opposite.
    pub fn opposite(&self) -> Option<Side> {
        match self {
            Side::Yes => Some(Side::No),
            Side::No => Some(Side::Yes),
            Side::Unknown => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Yes => write!(f, "YES"),
            Side::No => write!(f, "NO"),
            Side::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account identity. Always rendered as lowercase `0x` hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address: {0}")]
pub struct AddressParseError(pub String);

impl Address {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Take the low 20 bytes of a 32-byte ABI word (indexed `address` topic).
    pub fn from_word(word: &[u8; 32]) -> Self {
        let mut out = [0u8; 20];
        out.copy_from_slice(&word[12..]);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// `0x1234…abcd` form for alert text.
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex_part.len() != 40 {
            return Err(AddressParseError(s.to_string()));
        }

        let mut out = [0u8; 20];
        hex::decode_to_slice(hex_part, &mut out).map_err(|_| AddressParseError(s.to_string()))?;
        Ok(Self(out))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_normalizes_case() {
        let a: Address = "0x4BFB41D5B3570DEFD03C39A9A4D8DE6BD8B8982E".parse().unwrap();
        let b: Address = "4bfb41d5b3570defd03c39a9a4d8de6bd8b8982e".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "0x4bfb41d5b3570defd03c39a9a4d8de6bd8b8982e");
    }

    #[test]
    fn test_address_rejects_bad_length() {
        assert!("0xabcd".parse::<Address>().is_err());
        assert!("0xzzfb41d5b3570defd03c39a9a4d8de6bd8b8982e".parse::<Address>().is_err());
    }

    #[test]
    fn test_address_from_word_takes_low_bytes() {
        let mut word = [0xffu8; 32];
        word[12..].copy_from_slice(&[0x11; 20]);
        let addr = Address::from_word(&word);
        assert_eq!(addr.as_bytes(), &[0x11; 20]);
    }

    #[test]
    fn test_address_short() {
        let a: Address = "0x4bfb41d5b3570defd03c39a9a4d8de6bd8b8982e".parse().unwrap();
        assert_eq!(a.short(), "0x4bfb...982e");
    }

    #[test]
    fn test_side_labels() {
        assert_eq!(Side::from_label("yes"), Some(Side::Yes));
        assert_eq!(Side::from_label(" NO "), Some(Side::No));
        assert_eq!(Side::from_label("maybe"), None);
        assert_eq!(Side::Yes.opposite(), Some(Side::No));
        assert_eq!(Side::Unknown.opposite(), None);
    }
}
