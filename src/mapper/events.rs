use std::collections::HashMap;

use cosmos_sdk_proto::cosmos::base::abci::v1beta1::{Attribute, StringEvent};
use tracing::warn;

use crate::{
    error::Error,
    types::{parse_amounts, Amount, AmountsBuilder},
};

pub const COIN_RECEIVED: &str = "coin_received";
pub const COIN_SPENT: &str = "coin_spent";
pub const DELEGATE: &str = "delegate";
pub const UNBOND: &str = "unbond";
pub const REDELEGATE: &str = "redelegate";
pub const WITHDRAW_COMMISSION: &str = "withdraw_commission";
pub const WITHDRAW_REWARDS: &str = "withdraw_rewards";

pub type EventGroup = HashMap<String, String>;

/// One `coin_spent`/`coin_received` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub sender: String,
    pub receiver: String,
    pub amount: String,
}

/// Keys kept for an event type, in the order they repeat.
pub fn event_keys(event_type: &str) -> Option<&'static [&'static str]> {
    match event_type {
        COIN_RECEIVED => Some(&["receiver", "amount"]),
        COIN_SPENT => Some(&["spender", "amount"]),
        DELEGATE | UNBOND | REDELEGATE | WITHDRAW_COMMISSION => Some(&["amount"]),
        WITHDRAW_REWARDS => Some(&["amount", "validator"]),
        _ => None,
    }
}

fn filter_attributes<'a>(event: &'a StringEvent, keys: &[&str]) -> Vec<&'a Attribute> {
    event
        .attributes
        .iter()
        .filter(|attribute| keys.contains(&attribute.key.as_str()))
        .collect()
}

/// Re-chunks the attributes of one event into records of the event's arity.
/// An incomplete trailing stride is logged and dropped.
pub fn group_events(event: &StringEvent) -> Vec<EventGroup> {
    let Some(keys) = event_keys(&event.r#type) else {
        return vec![];
    };

    let attributes = filter_attributes(event, keys);
    let mut groups = Vec::with_capacity(attributes.len() / keys.len());

    for chunk in attributes.chunks(keys.len()) {
        if chunk.len() < keys.len() {
            warn!(
                "event {} ended inside a record: {} of {} attributes",
                event.r#type,
                chunk.len(),
                keys.len()
            );
            break;
        }

        let mut group = EventGroup::with_capacity(keys.len());
        for attribute in chunk {
            if group
                .insert(attribute.key.to_owned(), attribute.value.to_owned())
                .is_some()
            {
                warn!("event {} repeats key {} inside a record", event.r#type, attribute.key);
            }
        }
        groups.push(group);
    }

    groups
}

/// Records of every event of `event_type` in a message log.
pub fn group_log_events(log: &[StringEvent], event_type: &str) -> Vec<EventGroup> {
    log.iter()
        .filter(|event| event.r#type == event_type)
        .flat_map(group_events)
        .collect()
}

/// Sum of the `amount` attributes of every `event_type` record.
pub fn event_amounts(
    log: &[StringEvent],
    event_type: &str,
    default_currency: &str,
) -> Result<Vec<Amount>, Error> {
    let mut builder = AmountsBuilder::new();

    for group in group_log_events(log, event_type) {
        if let Some(amount) = group.get("amount") {
            builder.extend(parse_amounts(default_currency, amount)?);
        }
    }

    Ok(builder.build())
}

/// Pairs `coin_spent` and `coin_received` attributes positionally.
pub fn group_rs_events(log: &[StringEvent]) -> Result<Vec<Transfer>, Error> {
    let Some(received_keys) = event_keys(COIN_RECEIVED) else {
        return Err(Error::UnexpectedEventShape(String::from(COIN_RECEIVED)));
    };
    let Some(spent_keys) = event_keys(COIN_SPENT) else {
        return Err(Error::UnexpectedEventShape(String::from(COIN_SPENT)));
    };

    let received = flatten(log, COIN_RECEIVED, received_keys);
    let spent = flatten(log, COIN_SPENT, spent_keys);

    if received.len() != spent.len() {
        return Err(Error::InconsistentTransferEvents {
            received: received.len(),
            spent: spent.len(),
        });
    }

    let arity = received_keys.len();
    let mut transfers = Vec::with_capacity(received.len() / arity);

    for (received, spent) in received.chunks(arity).zip(spent.chunks(arity)) {
        if received.len() < arity {
            warn!("transfer events ended inside a record");
            break;
        }

        transfers.push(Transfer {
            sender: find_value(spent, "spender")?,
            receiver: find_value(received, "receiver")?,
            amount: find_value(received, "amount")?,
        });
    }

    Ok(transfers)
}

fn flatten<'a>(log: &'a [StringEvent], event_type: &str, keys: &[&str]) -> Vec<&'a Attribute> {
    log.iter()
        .filter(|event| event.r#type == event_type)
        .flat_map(|event| filter_attributes(event, keys))
        .collect()
}

fn find_value(chunk: &[&Attribute], key: &str) -> Result<String, Error> {
    chunk
        .iter()
        .find(|attribute| attribute.key == key)
        .map(|attribute| attribute.value.to_owned())
        .ok_or_else(|| Error::UnexpectedEventShape(format!("missing {} in transfer record", key)))
}
