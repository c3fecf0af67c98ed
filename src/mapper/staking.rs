use cosmos_sdk_proto::cosmos::{
    base::abci::v1beta1::StringEvent,
    staking::v1beta1::{
        MsgBeginRedelegate, MsgCreateValidator, MsgDelegate, MsgEditValidator, MsgUndelegate,
    },
};
use cosmrs::Any;

use super::{decode, events, Mapper};
use crate::{
    error::Error,
    types::{Attribution, MessageKind, RewardAmount, RewardTx, TxMeta},
};

impl Mapper {
    pub(super) fn delegate(
        &self,
        meta: TxMeta,
        message: &Any,
        log: &[StringEvent],
    ) -> Result<RewardTx, Error> {
        let msg = decode::<MsgDelegate>(message)?;
        let mut tx = RewardTx::new(MessageKind::MsgDelegate, meta);
        tx.delegator = msg.delegator_address;
        tx.validator_dst = msg.validator_address;
        tx.amounts = events::event_amounts(log, events::DELEGATE, self.default_currency())?;

        let validator = tx.validator_dst.to_owned();
        self.single_validator_rewards(&mut tx, &validator, log)?;

        Ok(tx)
    }

    pub(super) fn undelegate(
        &self,
        meta: TxMeta,
        message: &Any,
        log: &[StringEvent],
    ) -> Result<RewardTx, Error> {
        let msg = decode::<MsgUndelegate>(message)?;
        let mut tx = RewardTx::new(MessageKind::MsgUndelegate, meta);
        tx.delegator = msg.delegator_address;
        tx.validator_src = msg.validator_address;
        tx.amounts = events::event_amounts(log, events::UNBOND, self.default_currency())?;

        let validator = tx.validator_src.to_owned();
        self.single_validator_rewards(&mut tx, &validator, log)?;

        Ok(tx)
    }

    /// Rewards of both validators are withdrawn. Transfers alternate between
    /// source and destination, which is refined later against the unclaimed
    /// balances of the previous height.
    pub(super) fn begin_redelegate(
        &self,
        meta: TxMeta,
        message: &Any,
        log: &[StringEvent],
    ) -> Result<RewardTx, Error> {
        let msg = decode::<MsgBeginRedelegate>(message)?;
        let mut tx = RewardTx::new(MessageKind::MsgBeginRedelegate, meta);
        tx.delegator = msg.delegator_address;
        tx.validator_src = msg.validator_src_address;
        tx.validator_dst = msg.validator_dst_address;
        tx.amounts = events::event_amounts(log, events::REDELEGATE, self.default_currency())?;

        let transfers = self.transfers(&tx.delegator, log)?;
        Self::apply_transfers(&mut tx, &transfers);

        for (index, transfer) in transfers.rewards.iter().enumerate() {
            let validator = if index % 2 == 0 {
                &tx.validator_src
            } else {
                &tx.validator_dst
            };

            tx.rewards.push(RewardAmount {
                validator: validator.to_owned(),
                amounts: self.transfer_amounts(std::slice::from_ref(transfer))?,
                attribution: Attribution::Heuristic,
            });
        }

        Ok(tx)
    }

    pub(super) fn create_validator(
        &self,
        meta: TxMeta,
        message: &Any,
        log: &[StringEvent],
    ) -> Result<RewardTx, Error> {
        let msg = decode::<MsgCreateValidator>(message)?;
        let mut tx = RewardTx::new(MessageKind::MsgCreateValidator, meta);
        tx.delegator = msg.delegator_address;
        tx.validator_dst = msg.validator_address;
        tx.amounts = self.coin_amounts(msg.value.as_slice())?;

        let transfers = self.transfers(&tx.delegator, log)?;
        Self::apply_transfers(&mut tx, &transfers);

        Ok(tx)
    }

    pub(super) fn edit_validator(&self, meta: TxMeta, message: &Any) -> Result<RewardTx, Error> {
        let msg = decode::<MsgEditValidator>(message)?;
        let mut tx = RewardTx::new(MessageKind::MsgEditValidator, meta);
        tx.validator_dst = msg.validator_address;

        Ok(tx)
    }

    fn single_validator_rewards(
        &self,
        tx: &mut RewardTx,
        validator: &str,
        log: &[StringEvent],
    ) -> Result<(), Error> {
        let transfers = self.transfers(&tx.delegator, log)?;
        Self::apply_transfers(tx, &transfers);

        let amounts = self.transfer_amounts(&transfers.rewards)?;
        if !amounts.is_empty() {
            tx.rewards.push(RewardAmount {
                validator: validator.to_owned(),
                amounts,
                attribution: Attribution::Message,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cosmos_sdk_proto::cosmos::{base::v1beta1::Coin, staking::v1beta1::Description};
    use num_bigint::BigUint;

    use crate::{
        error::Error,
        mapper::{
            events::tests::event,
            tests::{any, chain_config, meta, BONDED_POOL, DISTRIBUTION, NOT_BONDED_POOL},
            Mapper,
        },
        types::{Attribution, MessageKind},
    };

    use super::*;

    const DELEGATE_10510041: &[u8] = b"\n-cosmos1mc0mxsdgsyjepsqetw3w5a459zj64k7akuhdu4\x124cosmosvaloper157v7tczs40axfgejp2m43kwuzqe0wsy0rv8puv\x1a\x0f\n\x05uatom\x12\x06140000";
    const DELEGATE_OSMOSIS_36: &[u8] = b"\n+osmo1de7qx00pz2j6gn9k88ntxxylelkazfk39gwddy\x122osmovaloper1de7qx00pz2j6gn9k88ntxxylelkazfk3llxw6r\x1a\x12\n\x05uosmo\x12\t500000000";

    fn raw(type_url: &str, value: &[u8]) -> Any {
        Any {
            type_url: type_url.to_owned(),
            value: value.to_vec(),
        }
    }

    #[test]
    fn maps_delegate_from_cosmos_hub() {
        let mapper = Mapper::new(chain_config("uatom"));
        let log = vec![
            event(
                "coin_received",
                &[
                    ("receiver", "cosmos1mc0mxsdgsyjepsqetw3w5a459zj64k7akuhdu4"),
                    ("amount", "25uatom"),
                    ("receiver", BONDED_POOL),
                    ("amount", "140000uatom"),
                ],
            ),
            event(
                "coin_spent",
                &[
                    ("spender", DISTRIBUTION),
                    ("amount", "25uatom"),
                    ("spender", "cosmos1mc0mxsdgsyjepsqetw3w5a459zj64k7akuhdu4"),
                    ("amount", "140000uatom"),
                ],
            ),
            event(
                "delegate",
                &[
                    ("validator", "cosmosvaloper157v7tczs40axfgejp2m43kwuzqe0wsy0rv8puv"),
                    ("amount", "140000uatom"),
                    ("new_shares", "140000.000000000000000000"),
                ],
            ),
            event(
                "message",
                &[
                    ("action", "delegate"),
                    ("sender", "cosmos1mc0mxsdgsyjepsqetw3w5a459zj64k7akuhdu4"),
                ],
            ),
        ];

        let tx = mapper
            .map_message(
                meta(10510041),
                &raw("/cosmos.staking.v1beta1.MsgDelegate", DELEGATE_10510041),
                &log,
            )
            .unwrap();

        assert_eq!(tx.kind, MessageKind::MsgDelegate);
        assert_eq!(tx.delegator, "cosmos1mc0mxsdgsyjepsqetw3w5a459zj64k7akuhdu4");
        assert_eq!(
            tx.validator_dst,
            "cosmosvaloper157v7tczs40axfgejp2m43kwuzqe0wsy0rv8puv"
        );
        assert!(tx.validator_src.is_empty());
        assert_eq!(tx.amounts.len(), 1);
        assert_eq!(tx.amounts[0].numeric, BigUint::from(140000u32));
        assert_eq!(tx.amounts[0].currency, "uatom");
        assert_eq!(tx.amounts[0].exp, 0);

        assert_eq!(tx.rewards.len(), 1);
        assert_eq!(tx.rewards[0].validator, tx.validator_dst);
        assert_eq!(tx.rewards[0].amounts[0].text, "25uatom");
        assert_eq!(tx.rewards[0].attribution, Attribution::Message);
        assert!(tx.reward_recipients.is_empty());
        assert_eq!(
            tx.sender,
            vec![DISTRIBUTION, "cosmos1mc0mxsdgsyjepsqetw3w5a459zj64k7akuhdu4"]
        );
        assert_eq!(
            tx.recipient,
            vec!["cosmos1mc0mxsdgsyjepsqetw3w5a459zj64k7akuhdu4", BONDED_POOL]
        );
    }

    #[test]
    fn maps_denomless_delegate_with_default_currency() {
        let mapper = Mapper::new(chain_config("uosmo"));
        let log = vec![event(
            "delegate",
            &[
                ("validator", "osmovaloper1de7qx00pz2j6gn9k88ntxxylelkazfk3llxw6r"),
                ("amount", "500000000"),
            ],
        )];

        let tx = mapper
            .map_message(
                meta(36),
                &raw("/cosmos.staking.v1beta1.MsgDelegate", DELEGATE_OSMOSIS_36),
                &log,
            )
            .unwrap();

        assert_eq!(tx.delegator, "osmo1de7qx00pz2j6gn9k88ntxxylelkazfk39gwddy");
        assert_eq!(tx.amounts[0].text, "500000000uosmo");
        assert_eq!(tx.amounts[0].currency, "uosmo");
        assert!(tx.rewards.is_empty());
    }

    #[test]
    fn maps_undelegate_reward_and_principal() {
        let mapper = Mapper::new(chain_config("uatom"));
        let delegator = "cosmos1q7h3kuuvnzd3fq4snhls543uvv8stt9em0nmkf";
        let validator = "cosmosvaloper1tflk30mq5vgqjdly92kkhhq3raev2hnz6eete3";
        let msg = MsgUndelegate {
            delegator_address: delegator.to_owned(),
            validator_address: validator.to_owned(),
            amount: Some(Coin {
                denom: String::from("uatom"),
                amount: String::from("200000000"),
            }),
        };
        let log = vec![
            event(
                "coin_received",
                &[
                    ("receiver", delegator),
                    ("amount", "11628006uatom"),
                    ("receiver", NOT_BONDED_POOL),
                    ("amount", "200000000uatom"),
                ],
            ),
            event(
                "coin_spent",
                &[
                    ("spender", DISTRIBUTION),
                    ("amount", "11628006uatom"),
                    ("spender", BONDED_POOL),
                    ("amount", "200000000uatom"),
                ],
            ),
            event(
                "unbond",
                &[
                    ("validator", validator),
                    ("amount", "200000000uatom"),
                    ("completion_time", "2022-05-26T12:31:04Z"),
                ],
            ),
        ];

        let tx = mapper.map_message(meta(10510043), &any(&msg), &log).unwrap();

        assert_eq!(tx.kind, MessageKind::MsgUndelegate);
        assert_eq!(tx.validator_src, validator);
        assert_eq!(tx.amounts[0].text, "200000000uatom");
        assert_eq!(tx.rewards.len(), 1);
        assert_eq!(tx.rewards[0].validator, validator);
        assert_eq!(tx.rewards[0].amounts[0].text, "11628006uatom");
    }

    #[test]
    fn maps_redelegate_with_parity_attribution() {
        let mapper = Mapper::new(chain_config("uatom"));
        let delegator = "cosmos1gv5vf68d4rfww9v2lg568vut36d5eth39rgvmh";
        let src = "cosmosvaloper132juzk0gdmwuxvx4phug7m3ymyatxlh9734g4w";
        let dst = "cosmosvaloper16k579jk6yt2cwmqx9dz5xvq9fug2tekvlu9qdv";
        let msg = MsgBeginRedelegate {
            delegator_address: delegator.to_owned(),
            validator_src_address: src.to_owned(),
            validator_dst_address: dst.to_owned(),
            amount: Some(Coin {
                denom: String::from("uatom"),
                amount: String::from("1099780"),
            }),
        };
        let log = vec![
            event(
                "coin_received",
                &[
                    ("receiver", delegator),
                    ("amount", "32800uatom"),
                    ("receiver", delegator),
                    ("amount", "411uatom"),
                ],
            ),
            event(
                "coin_spent",
                &[
                    ("spender", DISTRIBUTION),
                    ("amount", "32800uatom"),
                    ("spender", DISTRIBUTION),
                    ("amount", "411uatom"),
                ],
            ),
            event(
                "redelegate",
                &[
                    ("source_validator", src),
                    ("destination_validator", dst),
                    ("amount", "1099780uatom"),
                ],
            ),
        ];

        let tx = mapper.map_message(meta(10511859), &any(&msg), &log).unwrap();

        assert_eq!(tx.amounts[0].text, "1099780uatom");
        assert_eq!(tx.rewards.len(), 2);
        assert_eq!(tx.rewards[0].validator, src);
        assert_eq!(tx.rewards[0].amounts[0].text, "32800uatom");
        assert_eq!(tx.rewards[0].attribution, Attribution::Heuristic);
        assert_eq!(tx.rewards[1].validator, dst);
        assert_eq!(tx.rewards[1].amounts[0].text, "411uatom");
    }

    #[test]
    fn maps_create_and_edit_validator() {
        let mapper = Mapper::new(chain_config("uatom"));
        let create = MsgCreateValidator {
            description: Some(Description::default()),
            min_self_delegation: String::from("1"),
            delegator_address: String::from("cosmos1self"),
            validator_address: String::from("cosmosvaloper1self"),
            value: Some(Coin {
                denom: String::from("uatom"),
                amount: String::from("1000000"),
            }),
            ..Default::default()
        };

        let tx = mapper.map_message(meta(1), &any(&create), &[]).unwrap();
        assert_eq!(tx.delegator, "cosmos1self");
        assert_eq!(tx.validator_dst, "cosmosvaloper1self");
        assert_eq!(tx.amounts[0].text, "1000000uatom");

        let edit = MsgEditValidator {
            validator_address: String::from("cosmosvaloper1self"),
            ..Default::default()
        };
        let tx = mapper.map_message(meta(2), &any(&edit), &[]).unwrap();
        assert_eq!(tx.kind, MessageKind::MsgEditValidator);
        assert_eq!(tx.validator_dst, "cosmosvaloper1self");
        assert!(tx.amounts.is_empty());
    }

    #[test]
    fn rejects_invalid_encoding_and_inconsistent_transfers() {
        let mapper = Mapper::new(chain_config("uatom"));

        let result = mapper.map_message(
            meta(1),
            &raw("/cosmos.staking.v1beta1.MsgDelegate", b"\n\xff"),
            &[],
        );
        assert!(matches!(result, Err(Error::InvalidMessageEncoding { .. })));

        let log = vec![event("coin_received", &[("receiver", "cosmos1a"), ("amount", "1uatom")])];
        let result = mapper.map_message(
            meta(1),
            &raw("/cosmos.staking.v1beta1.MsgDelegate", DELEGATE_10510041),
            &log,
        );
        assert!(matches!(result, Err(Error::InconsistentTransferEvents { .. })));
    }
}
