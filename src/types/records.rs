use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use super::{amount::display_string, format_decimal, ClaimedReward, RewardTx, RewardType};

pub const SEQUENCE_SECONDS: i64 = 3600;
pub const GROUPING: &str = "1h";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightTime {
    pub height: u64,
    pub time: DateTime<Utc>,
}

/// Height at which the hour bucket of the block time changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crossing {
    pub height: u64,
    pub sequence: u64,
    pub previous_height: u64,
    pub block_times: Vec<HeightTime>,
}

impl Crossing {
    pub fn time_of(&self, height: u64) -> Option<DateTime<Utc>> {
        self.block_times
            .iter()
            .find(|item| item.height == height)
            .map(|item| item.time)
    }
}

/// A signed reward delta at a fixed exponent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedAmount {
    pub text: String,
    pub currency: String,
    #[serde(with = "display_string")]
    pub numeric: BigInt,
    pub exp: i32,
}

impl EarnedAmount {
    pub fn new(currency: impl Into<String>, numeric: BigInt, exp: i32) -> Self {
        let currency = currency.into();
        EarnedAmount {
            text: format!("{}{}", format_decimal(&numeric, exp), currency),
            currency,
            numeric,
            exp,
        }
    }

    pub fn to_decimal(&self) -> BigDecimal {
        BigDecimal::new(self.numeric.clone(), -i64::from(self.exp))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleReward {
    pub account: String,
    pub validator: String,
    pub amounts: Vec<EarnedAmount>,
    pub height: u64,
    pub time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub reward_type: RewardType,
}

/// Earned and claimed rewards of one sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewards {
    pub chain_id: String,
    pub network: String,
    pub sequence: u64,
    pub height: u64,
    pub time: DateTime<Utc>,
    pub grouping: String,
    pub earned: Vec<SimpleReward>,
    pub claimed: Vec<ClaimedReward>,
}

/// Mapped transactions of one height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightTxs {
    pub height: u64,
    pub time: DateTime<Utc>,
    pub txs: Vec<RewardTx>,
}

/// Hour bucket of a block time.
pub fn sequence_of(time: &DateTime<Utc>) -> u64 {
    time.timestamp()
        .div_euclid(SEQUENCE_SECONDS)
        .try_into()
        .unwrap_or_default()
}

pub fn sequence_start(sequence: u64) -> Option<DateTime<Utc>> {
    let seconds = i64::try_from(sequence).ok()?.checked_mul(SEQUENCE_SECONDS)?;
    DateTime::from_timestamp(seconds, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_hour_bucket() {
        let time = DateTime::from_timestamp(7200 + 3599, 0).unwrap();
        assert_eq!(sequence_of(&time), 2);

        let time = DateTime::from_timestamp(7200, 0).unwrap();
        assert_eq!(sequence_of(&time), 2);
        assert_eq!(sequence_start(2), Some(time));
    }

    #[test]
    fn earned_amount_text_is_trimmed() {
        let amount = EarnedAmount::new("uatom", BigInt::from(5_133_400_000_000_000_000i128), -18);
        assert_eq!(amount.text, "5.1334uatom");

        let amount = EarnedAmount::new("uatom", BigInt::from(-25_000_000_000_000_000_000i128), -18);
        assert_eq!(amount.text, "-25uatom");
    }

    #[test]
    fn earned_records_are_tagged() {
        let reward = SimpleReward {
            account: String::from("cosmos1a"),
            validator: String::from("cosmosvaloper1a"),
            amounts: vec![EarnedAmount::new("uatom", BigInt::from(1), 0)],
            height: 12,
            time: DateTime::from_timestamp(7200, 0).unwrap(),
            reward_type: RewardType::Earned,
        };

        let value = serde_json::to_value(&reward).unwrap();

        assert_eq!(value["type"], "earned");
        assert_eq!(serde_json::from_value::<SimpleReward>(value).unwrap(), reward);
    }
}
