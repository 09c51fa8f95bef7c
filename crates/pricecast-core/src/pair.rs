//! Currency and trading pair identification.
//!
//! A pair's textual form is exactly six characters: the first three name the
//! base currency, the last three the quote currency (`BTCUSD`). Input is
//! case-insensitive; the canonical form is upper case.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Number of characters in a currency code.
pub const CURRENCY_CODE_LEN: usize = 3;

/// Number of characters in a pair's textual form.
pub const PAIR_CODE_LEN: usize = CURRENCY_CODE_LEN * 2;

/// Three-letter currency code, stored upper-cased.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Currency([u8; CURRENCY_CODE_LEN]);

impl Currency {
    pub const BTC: Self = Self(*b"BTC");
    pub const ETH: Self = Self(*b"ETH");
    pub const USD: Self = Self(*b"USD");
    pub const EUR: Self = Self(*b"EUR");

    /// Parse a currency code (case-insensitive).
    pub fn new(code: &str) -> Result<Self, CoreError> {
        let bytes = code.as_bytes();
        if bytes.len() != CURRENCY_CODE_LEN || !bytes.iter().all(u8::is_ascii_alphanumeric) {
            return Err(CoreError::InvalidCurrency(code.to_string()));
        }
        Ok(Self([
            bytes[0].to_ascii_uppercase(),
            bytes[1].to_ascii_uppercase(),
            bytes[2].to_ascii_uppercase(),
        ]))
    }

    /// Canonical code, e.g. `"USD"`.
    pub fn as_str(&self) -> &str {
        // Only ever built from ASCII alphanumerics.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency({})", self.as_str())
    }
}

/// Ordered pair of currencies identifying a quote (e.g. BTC priced in USD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pair {
    from: Currency,
    to: Currency,
}

impl Pair {
    pub const BTC_USD: Self = Self::new(Currency::BTC, Currency::USD);

    pub const fn new(from: Currency, to: Currency) -> Self {
        Self { from, to }
    }

    /// Base currency (the first three characters).
    pub fn base(&self) -> Currency {
        self.from
    }

    /// Quote currency (the last three characters).
    pub fn quote(&self) -> Currency {
        self.to
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

impl FromStr for Pair {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let len = s.chars().count();
        if len != PAIR_CODE_LEN {
            return Err(CoreError::InvalidPairLength(len));
        }
        if let Some(found) = s.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidPairCharacter {
                input: s.to_string(),
                found,
            });
        }

        let (from, to) = s.split_at(CURRENCY_CODE_LEN);
        Ok(Self::new(Currency::new(from)?, Currency::new(to)?))
    }
}

impl TryFrom<String> for Pair {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pair> for String {
    fn from(pair: Pair) -> Self {
        pair.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_parse_canonicalizes_case() {
        let pair: Pair = "btcUsd".parse().unwrap();
        assert_eq!(pair, Pair::BTC_USD);
        assert_eq!(pair.to_string(), "BTCUSD");
        assert_eq!(pair.base(), Currency::BTC);
        assert_eq!(pair.quote(), Currency::USD);
    }

    #[test]
    fn test_pair_parse_rejects_wrong_length() {
        assert_eq!(
            "BTCUS".parse::<Pair>().unwrap_err(),
            CoreError::InvalidPairLength(5)
        );
        assert_eq!(
            "BTCUSDT".parse::<Pair>().unwrap_err(),
            CoreError::InvalidPairLength(7)
        );
        assert_eq!("".parse::<Pair>().unwrap_err(), CoreError::InvalidPairLength(0));
    }

    #[test]
    fn test_pair_parse_rejects_non_alphanumeric() {
        let err = "BTC/US".parse::<Pair>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidPairCharacter { found: '/', .. }));

        // Multi-byte characters are counted as characters, not bytes.
        let err = "BTCUSÉ".parse::<Pair>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidPairCharacter { found: 'É', .. }));
    }

    #[test]
    fn test_pair_equality_is_by_value() {
        let a = Pair::new(Currency::new("eth").unwrap(), Currency::USD);
        let b: Pair = "ETHUSD".parse().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Pair::BTC_USD);
    }

    #[test]
    fn test_pair_serde_as_string() {
        let json = serde_json::to_string(&Pair::BTC_USD).unwrap();
        assert_eq!(json, "\"BTCUSD\"");

        let pair: Pair = serde_json::from_str("\"ethusd\"").unwrap();
        assert_eq!(pair.to_string(), "ETHUSD");

        assert!(serde_json::from_str::<Pair>("\"ETH\"").is_err());
    }

    #[test]
    fn test_currency_rejects_bad_codes() {
        assert!(Currency::new("US").is_err());
        assert!(Currency::new("U$D").is_err());
        assert_eq!(Currency::new("usd").unwrap(), Currency::USD);
    }
}
