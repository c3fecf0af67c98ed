//! Maps staking and distribution messages into [`RewardTx`] records.
//!
//! Every message is read together with its slice of the transaction log. The
//! log carries the coin movements the message caused, which is where the
//! rewards withdrawn as a side effect of the message show up.

use std::{collections::HashMap, str::FromStr};

use chrono::{DateTime, Utc};
use cosmos_sdk_proto::{
    cosmos::{
        base::{
            abci::v1beta1::{Attribute, StringEvent, TxResponse},
            v1beta1::Coin,
        },
        tx::v1beta1::Tx,
    },
    prost::{Message, Name},
};
use cosmrs::Any;
use tracing::{debug, warn};

use crate::{
    configuration::ChainConfig,
    error::Error,
    types::{
        parse_amounts, Amount, AmountsBuilder, ClaimedReward, DelegationOp, DelegatorValidator,
        Delegators, MessageKind, RewardTx, RewardType, TxMeta,
    },
};

pub use self::{
    events::{group_events, group_rs_events, EventGroup, Transfer},
    redelegate::post_msg_begin_redelegate,
};

pub mod events;
mod distribution;
mod redelegate;
mod staking;

const MSG_INDEX: &str = "msg_index";

/// Chain specific reward extraction used by the pipeline.
pub trait RewardProducer: Send + Sync {
    /// Maps every supported message of the successful transactions of one
    /// height. Messages that fail to map are logged and skipped.
    fn map_transactions(
        &self,
        height: u64,
        time: DateTime<Utc>,
        txs: &[Tx],
        responses: &[TxResponse],
    ) -> Result<Vec<RewardTx>, Error>;

    fn get_rewards(&self, tx: &RewardTx) -> Vec<ClaimedReward>;

    fn get_delegations(&self, tx: &RewardTx) -> Vec<DelegatorValidator>;

    fn post_msg_begin_redelegate(
        &self,
        tx: &mut RewardTx,
        unclaimed: &[Delegators],
    ) -> Result<(), Error>;
}

#[derive(Debug, Clone)]
pub struct Mapper {
    chain: ChainConfig,
}

/// Coin movements of one message.
#[derive(Debug, Default)]
struct Transfers {
    sender: Vec<String>,
    recipient: Vec<String>,
    rewards: Vec<Transfer>,
}

impl Mapper {
    pub fn new(chain: ChainConfig) -> Self {
        Mapper { chain }
    }

    pub fn map_message(
        &self,
        meta: TxMeta,
        message: &Any,
        log: &[StringEvent],
    ) -> Result<RewardTx, Error> {
        let kind = MessageKind::from_str(&message.type_url)
            .map_err(|_| Error::UnsupportedMessage(message.type_url.to_owned()))?;

        match kind {
            MessageKind::MsgDelegate => self.delegate(meta, message, log),
            MessageKind::MsgUndelegate => self.undelegate(meta, message, log),
            MessageKind::MsgBeginRedelegate => self.begin_redelegate(meta, message, log),
            MessageKind::MsgCreateValidator => self.create_validator(meta, message, log),
            MessageKind::MsgEditValidator => self.edit_validator(meta, message),
            MessageKind::MsgWithdrawDelegatorReward => {
                self.withdraw_delegator_reward(meta, message, log)
            },
            MessageKind::MsgWithdrawValidatorCommission => {
                self.withdraw_validator_commission(meta, message, log)
            },
            MessageKind::MsgSetWithdrawAddress => self.set_withdraw_address(meta, message, log),
            MessageKind::MsgFundCommunityPool => self.fund_community_pool(meta, message, log),
        }
    }

    fn default_currency(&self) -> &str {
        &self.chain.default_currency
    }

    fn is_pool(&self, address: &str) -> bool {
        address == self.chain.bonded_pool_address || address == self.chain.not_bonded_pool_address
    }

    fn coin_amounts(&self, coins: &[Coin]) -> Result<Vec<Amount>, Error> {
        let mut builder = AmountsBuilder::new();

        for coin in coins {
            builder.add(Amount::parse(
                self.default_currency(),
                &format!("{}{}", coin.amount, coin.denom),
            )?);
        }

        Ok(builder.build())
    }

    /// Transfers of the log. Movements touching the staking pools or paid by
    /// the delegator are principal, everything else is a reward.
    fn transfers(&self, delegator: &str, log: &[StringEvent]) -> Result<Transfers, Error> {
        let mut transfers = Transfers::default();

        for transfer in group_rs_events(log)? {
            push_unique(&mut transfers.sender, &transfer.sender);
            push_unique(&mut transfers.recipient, &transfer.receiver);

            if self.is_pool(&transfer.sender)
                || self.is_pool(&transfer.receiver)
                || transfer.sender == delegator
            {
                continue;
            }

            transfers.rewards.push(transfer);
        }

        Ok(transfers)
    }

    fn transfer_amounts(&self, transfers: &[Transfer]) -> Result<Vec<Amount>, Error> {
        let mut builder = AmountsBuilder::new();

        for transfer in transfers {
            builder.extend(parse_amounts(self.default_currency(), &transfer.amount)?);
        }

        Ok(builder.build())
    }

    fn apply_transfers(tx: &mut RewardTx, transfers: &Transfers) {
        tx.sender = transfers.sender.clone();
        tx.recipient = transfers.recipient.clone();

        for transfer in &transfers.rewards {
            if transfer.receiver != tx.delegator {
                push_unique(&mut tx.reward_recipients, &transfer.receiver);
            }
        }
    }
}

impl RewardProducer for Mapper {
    fn map_transactions(
        &self,
        height: u64,
        time: DateTime<Utc>,
        txs: &[Tx],
        responses: &[TxResponse],
    ) -> Result<Vec<RewardTx>, Error> {
        if txs.len() != responses.len() {
            return Err(Error::UnexpectedEventShape(format!(
                "height {}: {} transactions with {} responses",
                height,
                txs.len(),
                responses.len()
            )));
        }

        let mut mapped = vec![];

        for (tx, response) in txs.iter().zip(responses) {
            if response.code != 0 {
                debug!("skipping failed tx {} at {}", response.txhash, height);
                continue;
            }

            let Some(body) = &tx.body else {
                warn!("tx {} at {} has no body", response.txhash, height);
                continue;
            };

            let logs = message_logs(response);

            for (index, message) in body.messages.iter().enumerate() {
                if MessageKind::from_str(&message.type_url).is_err() {
                    continue;
                }

                let msg_index = u32::try_from(index)?;
                let meta = TxMeta {
                    hash: response.txhash.to_owned(),
                    height,
                    time,
                    msg_index,
                };
                let log = logs.get(&msg_index).map(Vec::as_slice).unwrap_or_default();

                match self.map_message(meta, message, log) {
                    Ok(item) => mapped.push(item),
                    Err(error) => {
                        warn!(
                            "tx {} message {} ({}) left unmapped: {}",
                            response.txhash, index, message.type_url, error
                        );
                    },
                }
            }
        }

        Ok(mapped)
    }

    fn get_rewards(&self, tx: &RewardTx) -> Vec<ClaimedReward> {
        if !tx.kind.carries_rewards() {
            return vec![];
        }

        tx.rewards
            .iter()
            .filter(|reward| !reward.validator.is_empty() && !reward.amounts.is_empty())
            .map(|reward| ClaimedReward {
                account: tx.delegator.to_owned(),
                validator: reward.validator.to_owned(),
                amounts: reward.amounts.clone(),
                height: tx.meta.height,
                time: tx.meta.time,
                kind: tx.kind,
                hash: tx.meta.hash.to_owned(),
                attribution: reward.attribution,
                reward_type: RewardType::Claimed,
            })
            .collect()
    }

    fn get_delegations(&self, tx: &RewardTx) -> Vec<DelegatorValidator> {
        let item = |op, validator: &str| DelegatorValidator {
            op,
            delegator: tx.delegator.to_owned(),
            validator: validator.to_owned(),
            height: tx.meta.height,
        };

        match tx.kind {
            MessageKind::MsgDelegate | MessageKind::MsgCreateValidator => {
                vec![item(DelegationOp::Add, &tx.validator_dst)]
            },
            MessageKind::MsgUndelegate => vec![item(DelegationOp::Remove, &tx.validator_src)],
            MessageKind::MsgBeginRedelegate => {
                vec![
                    item(DelegationOp::Both, &tx.validator_src),
                    item(DelegationOp::Add, &tx.validator_dst),
                ]
            },
            _ => vec![],
        }
    }

    fn post_msg_begin_redelegate(
        &self,
        tx: &mut RewardTx,
        unclaimed: &[Delegators],
    ) -> Result<(), Error> {
        post_msg_begin_redelegate(tx, unclaimed)
    }
}

fn decode<M: Message + Name + Default>(message: &Any) -> Result<M, Error> {
    message
        .to_msg::<M>()
        .map_err(|error| Error::InvalidMessageEncoding {
            type_url: message.type_url.to_owned(),
            reason: error.to_string(),
        })
}

fn push_unique(items: &mut Vec<String>, value: &str) {
    if !items.iter().any(|item| item == value) {
        items.push(value.to_owned());
    }
}

/// Per message logs of a transaction. Newer nodes leave `logs` empty and tag
/// every event with a `msg_index` attribute instead.
pub fn message_logs(response: &TxResponse) -> HashMap<u32, Vec<StringEvent>> {
    let mut logs: HashMap<u32, Vec<StringEvent>> = HashMap::new();

    if !response.logs.is_empty() {
        for log in &response.logs {
            logs.entry(log.msg_index)
                .or_default()
                .extend(log.events.iter().cloned());
        }
        return logs;
    }

    for event in &response.events {
        let msg_index = event
            .attributes
            .iter()
            .find(|attribute| attribute.key == MSG_INDEX)
            .and_then(|attribute| attribute.value.parse::<u32>().ok());

        let Some(msg_index) = msg_index else {
            continue;
        };

        logs.entry(msg_index).or_default().push(StringEvent {
            r#type: event.r#type.to_owned(),
            attributes: event
                .attributes
                .iter()
                .filter(|attribute| attribute.key != MSG_INDEX)
                .map(|attribute| Attribute {
                    key: attribute.key.to_owned(),
                    value: attribute.value.to_owned(),
                })
                .collect(),
        });
    }

    logs
}
