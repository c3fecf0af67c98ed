use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Amount;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub hash: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub operator_address: String,
    pub jailed: bool,
    pub status: i32,
    pub tokens: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator_address: String,
    pub validator_address: String,
    pub shares: String,
    pub balance: Option<Amount>,
}

/// Unclaimed rewards of one delegator, grouped per validator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Delegators {
    pub delegator_address: String,
    pub unclaimed: Vec<DelegatorsUnclaimed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DelegatorsUnclaimed {
    pub validator_address: String,
    pub unclaimed: Vec<Amount>,
}
