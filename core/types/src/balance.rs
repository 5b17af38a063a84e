use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

/// A non-negative integer balance of arbitrary precision. On the wire it is a decimal string.
#[derive(
    Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr,
)]
pub struct Amount(BigUint);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal amount {0:?}")]
pub struct AmountError(pub String);

impl Amount {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError(s.to_string()));
        }
        BigUint::from_str(s)
            .map(Self)
            .map_err(|_| AmountError(s.to_string()))
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Amount> for Amount {
    type Output = Amount;

    fn add(self, rhs: &'a Amount) -> Self::Output {
        Self(self.0 + &rhs.0)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.fold(Amount::zero(), |acc, amount| acc + amount)
    }
}

/// Balance of one script for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
    pub available_balance: Amount,
    pub overall_balance: Amount,
}

impl BalanceRecord {
    /// A record with no balance is equivalent to no record at all.
    pub fn is_empty(&self) -> bool {
        self.available_balance.is_zero() && self.overall_balance.is_zero()
    }
}

/// The absolute balance of a `(tick, pkscript)` pair as of the checkpoint carrying the delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDelta {
    pub tick: String,
    pub pkscript: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
    pub available_balance: Amount,
    pub overall_balance: Amount,
}

impl BalanceDelta {
    pub fn record(&self) -> BalanceRecord {
        BalanceRecord {
            wallet: self.wallet.clone(),
            available_balance: self.available_balance.clone(),
            overall_balance: self.overall_balance.clone(),
        }
    }
}

/// Ticks are case-insensitive.
pub fn normalize_tick(tick: &str) -> String {
    tick.to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceOfPkScript {
    pub available_balance: Amount,
    pub overall_balance: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceOfWallet {
    pub available_balance: Amount,
    pub overall_balance: Amount,
    pub pkscript: String,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_amount_parses_large_decimals() {
        let amount: Amount = "340282366920938463463374607431768211456000".parse().unwrap();
        assert_eq!(
            amount.to_string(),
            "340282366920938463463374607431768211456000"
        );
    }

    #[test]
    fn test_amount_rejects_non_decimal() {
        for input in ["", "-1", "+1", "1.5", "1_000", "0x10", " 1"] {
            assert!(input.parse::<Amount>().is_err(), "{input:?} should fail");
        }
    }

    #[test]
    fn test_amount_sum() {
        let amounts = [Amount::from(1), Amount::from(2), Amount::from(39)];
        assert_eq!(amounts.iter().sum::<Amount>(), Amount::from(42));
    }

    #[test]
    fn test_delta_wire_format() {
        let delta: BalanceDelta = serde_json::from_str(
            r#"{"tick":"ordi","pkscript":"0014abcd","availableBalance":"10","overallBalance":"25"}"#,
        )
        .unwrap();
        assert_eq!(delta.wallet, None);
        assert_eq!(delta.overall_balance, Amount::from(25));
        assert!(!delta.record().is_empty());
    }
}
