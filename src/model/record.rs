use std::{fmt, io, str::FromStr};

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One stored snapshot: an opaque `content` blob keyed by record type and
/// sequence (or height, for `tx_records`).
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Record {
    #[sqlx(rename = "type")]
    pub kind: String,
    pub sequence: i64,
    pub content: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    AccountRecords,
    RewardRecords,
    EarnedRewardRecords,
    TxRecords,
}

impl RecordType {
    /// Storage key of this record type under the configured prefix.
    pub fn key(&self, prefix: &str) -> String {
        if prefix.is_empty() {
            return self.to_string();
        }

        format!("{}_{}", prefix, self)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordType::AccountRecords => "account_records",
            RecordType::RewardRecords => "reward_records",
            RecordType::EarnedRewardRecords => "earned_reward_records",
            RecordType::TxRecords => "tx_records",
        };

        f.write_str(name)
    }
}

impl FromStr for RecordType {
    type Err = io::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "account_records" => Ok(RecordType::AccountRecords),
            "reward_records" => Ok(RecordType::RewardRecords),
            "earned_reward_records" => Ok(RecordType::EarnedRewardRecords),
            "tx_records" => Ok(RecordType::TxRecords),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Unknown record type: {}", value),
            )),
        }
    }
}
