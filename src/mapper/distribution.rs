use cosmos_sdk_proto::cosmos::{
    base::abci::v1beta1::StringEvent,
    distribution::v1beta1::{
        MsgFundCommunityPool, MsgSetWithdrawAddress, MsgWithdrawDelegatorReward,
        MsgWithdrawValidatorCommission,
    },
};
use cosmrs::Any;

use super::{decode, events, Mapper};
use crate::{
    error::Error,
    types::{parse_amounts, AmountsBuilder, Attribution, MessageKind, RewardAmount, RewardTx, TxMeta},
};

impl Mapper {
    pub(super) fn withdraw_delegator_reward(
        &self,
        meta: TxMeta,
        message: &Any,
        log: &[StringEvent],
    ) -> Result<RewardTx, Error> {
        let msg = decode::<MsgWithdrawDelegatorReward>(message)?;
        let mut tx = RewardTx::new(MessageKind::MsgWithdrawDelegatorReward, meta);
        tx.delegator = msg.delegator_address;
        tx.validator_src = msg.validator_address;

        let transfers = self.transfers(&tx.delegator, log)?;
        Self::apply_transfers(&mut tx, &transfers);

        let mut amounts = self.transfer_amounts(&transfers.rewards)?;

        // Logs without coin movements still report the withdrawn amount.
        if amounts.is_empty() {
            let mut builder = AmountsBuilder::new();
            for group in events::group_log_events(log, events::WITHDRAW_REWARDS) {
                if let Some(amount) = group.get("amount") {
                    builder.extend(parse_amounts(self.default_currency(), amount)?);
                }
            }
            amounts = builder.build();
        }

        if !amounts.is_empty() {
            tx.rewards.push(RewardAmount {
                validator: tx.validator_src.to_owned(),
                amounts,
                attribution: Attribution::Message,
            });
        }

        Ok(tx)
    }

    pub(super) fn withdraw_validator_commission(
        &self,
        meta: TxMeta,
        message: &Any,
        log: &[StringEvent],
    ) -> Result<RewardTx, Error> {
        let msg = decode::<MsgWithdrawValidatorCommission>(message)?;
        let mut tx = RewardTx::new(MessageKind::MsgWithdrawValidatorCommission, meta);
        tx.validator_dst = msg.validator_address;
        tx.amounts =
            events::event_amounts(log, events::WITHDRAW_COMMISSION, self.default_currency())?;

        let transfers = self.transfers(&tx.delegator, log)?;
        tx.sender = transfers.sender;
        tx.recipient = transfers.recipient;

        Ok(tx)
    }

    pub(super) fn set_withdraw_address(
        &self,
        meta: TxMeta,
        message: &Any,
        log: &[StringEvent],
    ) -> Result<RewardTx, Error> {
        let msg = decode::<MsgSetWithdrawAddress>(message)?;
        let mut tx = RewardTx::new(MessageKind::MsgSetWithdrawAddress, meta);
        tx.delegator = msg.delegator_address;

        let transfers = self.transfers(&tx.delegator, log)?;
        Self::apply_transfers(&mut tx, &transfers);

        if msg.withdraw_address != tx.delegator
            && !tx.reward_recipients.contains(&msg.withdraw_address)
        {
            tx.reward_recipients.push(msg.withdraw_address);
        }

        Ok(tx)
    }

    pub(super) fn fund_community_pool(
        &self,
        meta: TxMeta,
        message: &Any,
        log: &[StringEvent],
    ) -> Result<RewardTx, Error> {
        let msg = decode::<MsgFundCommunityPool>(message)?;
        let mut tx = RewardTx::new(MessageKind::MsgFundCommunityPool, meta);
        tx.amounts = self.coin_amounts(&msg.amount)?;

        let transfers = self.transfers(&msg.depositor, log)?;
        tx.recipient = transfers.recipient;
        tx.sender = transfers.sender;
        if !tx.sender.contains(&msg.depositor) {
            tx.sender.insert(0, msg.depositor);
        }

        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use cosmos_sdk_proto::cosmos::base::v1beta1::Coin;

    use super::*;
    use crate::mapper::{
        events::tests::event,
        tests::{any, chain_config, meta, DISTRIBUTION},
    };

    const VALIDATOR: &str = "cosmosvaloper1hvsdf03tl6w5pnfvfv5g8uphjd4wfw2h4gvnl7";
    const DELEGATOR: &str = "cosmos1hvsdf03tl6w5pnfvfv5g8uphjd4wfw2hsucxnd";
    const WITHDRAW_ADDRESS: &str = "cosmos1z8wrnv35mmezpseym0jy7lngvsan2alwn8gma9";

    #[test]
    fn maps_validator_commission() {
        let mapper = Mapper::new(chain_config("uatom"));
        let message = Any {
            type_url: String::from("/cosmos.distribution.v1beta1.MsgWithdrawValidatorCommission"),
            value: b"\n4cosmosvaloper1hvsdf03tl6w5pnfvfv5g8uphjd4wfw2h4gvnl7".to_vec(),
        };
        let log = vec![
            event("coin_received", &[("receiver", WITHDRAW_ADDRESS), ("amount", "36370uatom")]),
            event("coin_spent", &[("spender", DISTRIBUTION), ("amount", "36370uatom")]),
            event("withdraw_commission", &[("amount", "36370uatom")]),
        ];

        let tx = mapper.map_message(meta(10510000), &message, &log).unwrap();

        assert_eq!(tx.kind, MessageKind::MsgWithdrawValidatorCommission);
        assert_eq!(tx.validator_dst, VALIDATOR);
        assert_eq!(tx.amounts[0].text, "36370uatom");
        assert!(tx.rewards.is_empty());
        assert_eq!(tx.sender, vec![DISTRIBUTION]);
        assert_eq!(tx.recipient, vec![WITHDRAW_ADDRESS]);
    }

    #[test]
    fn maps_delegator_reward_with_empty_amount() {
        let mapper = Mapper::new(chain_config("uatom"));
        let message = Any {
            type_url: String::from("/cosmos.distribution.v1beta1.MsgWithdrawDelegatorReward"),
            value: b"\n-cosmos1hvsdf03tl6w5pnfvfv5g8uphjd4wfw2hsucxnd\x124cosmosvaloper1hvsdf03tl6w5pnfvfv5g8uphjd4wfw2h4gvnl7".to_vec(),
        };
        let log = vec![event("withdraw_rewards", &[("amount", ""), ("validator", VALIDATOR)])];

        let tx = mapper.map_message(meta(10510001), &message, &log).unwrap();

        assert_eq!(tx.delegator, DELEGATOR);
        assert_eq!(tx.validator_src, VALIDATOR);
        assert!(tx.rewards.is_empty());
    }

    #[test]
    fn delegator_reward_to_withdraw_address() {
        let mapper = Mapper::new(chain_config("uatom"));
        let msg = MsgWithdrawDelegatorReward {
            delegator_address: DELEGATOR.to_owned(),
            validator_address: VALIDATOR.to_owned(),
        };
        let log = vec![
            event("coin_received", &[("receiver", WITHDRAW_ADDRESS), ("amount", "812uatom")]),
            event("coin_spent", &[("spender", DISTRIBUTION), ("amount", "812uatom")]),
            event("withdraw_rewards", &[("amount", "812uatom"), ("validator", VALIDATOR)]),
        ];

        let tx = mapper.map_message(meta(5), &any(&msg), &log).unwrap();

        assert_eq!(tx.rewards.len(), 1);
        assert_eq!(tx.rewards[0].validator, VALIDATOR);
        assert_eq!(tx.rewards[0].amounts[0].text, "812uatom");
        assert_eq!(tx.reward_recipients, vec![WITHDRAW_ADDRESS]);
    }

    #[test]
    fn delegator_reward_falls_back_to_withdraw_event() {
        let mapper = Mapper::new(chain_config("uatom"));
        let msg = MsgWithdrawDelegatorReward {
            delegator_address: DELEGATOR.to_owned(),
            validator_address: VALIDATOR.to_owned(),
        };
        let log = vec![event("withdraw_rewards", &[("amount", "9uatom"), ("validator", VALIDATOR)])];

        let tx = mapper.map_message(meta(5), &any(&msg), &log).unwrap();

        assert_eq!(tx.rewards[0].amounts[0].text, "9uatom");
    }

    #[test]
    fn maps_set_withdraw_address() {
        let mapper = Mapper::new(chain_config("uatom"));
        let message = Any {
            type_url: String::from("/cosmos.distribution.v1beta1.MsgSetWithdrawAddress"),
            value: b"\n-cosmos1hvsdf03tl6w5pnfvfv5g8uphjd4wfw2hsucxnd\x12-cosmos1z8wrnv35mmezpseym0jy7lngvsan2alwn8gma9".to_vec(),
        };

        let tx = mapper.map_message(meta(7), &message, &[]).unwrap();

        assert_eq!(tx.kind, MessageKind::MsgSetWithdrawAddress);
        assert_eq!(tx.delegator, DELEGATOR);
        assert_eq!(tx.reward_recipients, vec![WITHDRAW_ADDRESS]);
    }

    #[test]
    fn maps_fund_community_pool() {
        let mapper = Mapper::new(chain_config("uatom"));
        let msg = MsgFundCommunityPool {
            amount: vec![
                Coin {
                    denom: String::from("uatom"),
                    amount: String::from("100"),
                },
                Coin {
                    denom: String::from("uatom"),
                    amount: String::from("50"),
                },
            ],
            depositor: DELEGATOR.to_owned(),
        };

        let tx = mapper.map_message(meta(8), &any(&msg), &[]).unwrap();

        assert_eq!(tx.sender, vec![DELEGATOR]);
        assert_eq!(tx.amounts.len(), 1);
        assert_eq!(tx.amounts[0].text, "150uatom");
    }
}
