use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Amount, MessageKind};

/// How a reward entry got its validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Attribution {
    /// Taken from the message's single validator.
    #[default]
    Message,
    /// Guessed from the position of the transfer in the log.
    Heuristic,
    /// Matched against the unclaimed balances before the transaction.
    Reconciled,
}

/// Tells realized claims from computed earned deltas once both are in one
/// list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    Earned,
    Claimed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardAmount {
    pub validator: String,
    pub amounts: Vec<Amount>,
    pub attribution: Attribution,
}

/// Position of a message inside the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxMeta {
    pub hash: String,
    pub height: u64,
    pub time: DateTime<Utc>,
    pub msg_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTx {
    pub kind: MessageKind,
    pub meta: TxMeta,
    pub delegator: String,
    pub validator_src: String,
    pub validator_dst: String,
    pub amounts: Vec<Amount>,
    pub rewards: Vec<RewardAmount>,
    pub reward_recipients: Vec<String>,
    pub sender: Vec<String>,
    pub recipient: Vec<String>,
}

impl RewardTx {
    pub fn new(kind: MessageKind, meta: TxMeta) -> Self {
        RewardTx {
            kind,
            meta,
            delegator: String::new(),
            validator_src: String::new(),
            validator_dst: String::new(),
            amounts: vec![],
            rewards: vec![],
            reward_recipients: vec![],
            sender: vec![],
            recipient: vec![],
        }
    }
}

/// A reward realized inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimedReward {
    pub account: String,
    pub validator: String,
    pub amounts: Vec<Amount>,
    pub height: u64,
    pub time: DateTime<Utc>,
    pub kind: MessageKind,
    pub hash: String,
    pub attribution: Attribution,
    #[serde(rename = "type")]
    pub reward_type: RewardType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelegationOp {
    Add,
    Remove,
    /// Redelegation: the source side may have been emptied and the
    /// destination side gained a delegation.
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatorValidator {
    pub op: DelegationOp,
    pub delegator: String,
    pub validator: String,
    pub height: u64,
}
