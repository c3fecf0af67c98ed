use std::{fmt, io, str::FromStr};

use serde::{Deserialize, Serialize};

/// Staking and distribution messages that move or reveal rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    MsgDelegate,
    MsgUndelegate,
    MsgBeginRedelegate,
    MsgWithdrawDelegatorReward,
    MsgWithdrawValidatorCommission,
    MsgSetWithdrawAddress,
    MsgFundCommunityPool,
    MsgCreateValidator,
    MsgEditValidator,
}

impl MessageKind {
    pub fn type_url(&self) -> &'static str {
        match self {
            MessageKind::MsgDelegate => "/cosmos.staking.v1beta1.MsgDelegate",
            MessageKind::MsgUndelegate => "/cosmos.staking.v1beta1.MsgUndelegate",
            MessageKind::MsgBeginRedelegate => {
                "/cosmos.staking.v1beta1.MsgBeginRedelegate"
            },
            MessageKind::MsgWithdrawDelegatorReward => {
                "/cosmos.distribution.v1beta1.MsgWithdrawDelegatorReward"
            },
            MessageKind::MsgWithdrawValidatorCommission => {
                "/cosmos.distribution.v1beta1.MsgWithdrawValidatorCommission"
            },
            MessageKind::MsgSetWithdrawAddress => {
                "/cosmos.distribution.v1beta1.MsgSetWithdrawAddress"
            },
            MessageKind::MsgFundCommunityPool => {
                "/cosmos.distribution.v1beta1.MsgFundCommunityPool"
            },
            MessageKind::MsgCreateValidator => {
                "/cosmos.staking.v1beta1.MsgCreateValidator"
            },
            MessageKind::MsgEditValidator => {
                "/cosmos.staking.v1beta1.MsgEditValidator"
            },
        }
    }

    /// Whether mapped transactions of this kind carry delegator rewards.
    pub fn carries_rewards(&self) -> bool {
        matches!(
            self,
            MessageKind::MsgDelegate
                | MessageKind::MsgUndelegate
                | MessageKind::MsgBeginRedelegate
                | MessageKind::MsgWithdrawDelegatorReward
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.type_url())
    }
}

impl From<MessageKind> for String {
    fn from(value: MessageKind) -> Self {
        String::from(value.type_url())
    }
}

impl FromStr for MessageKind {
    type Err = io::Error;

    fn from_str(value: &str) -> Result<MessageKind, Self::Err> {
        match value {
            "/cosmos.staking.v1beta1.MsgDelegate" => Ok(MessageKind::MsgDelegate),
            "/cosmos.staking.v1beta1.MsgUndelegate" => {
                Ok(MessageKind::MsgUndelegate)
            },
            "/cosmos.staking.v1beta1.MsgBeginRedelegate" => {
                Ok(MessageKind::MsgBeginRedelegate)
            },
            "/cosmos.distribution.v1beta1.MsgWithdrawDelegatorReward" => {
                Ok(MessageKind::MsgWithdrawDelegatorReward)
            },
            "/cosmos.distribution.v1beta1.MsgWithdrawValidatorCommission" => {
                Ok(MessageKind::MsgWithdrawValidatorCommission)
            },
            "/cosmos.distribution.v1beta1.MsgSetWithdrawAddress" => {
                Ok(MessageKind::MsgSetWithdrawAddress)
            },
            "/cosmos.distribution.v1beta1.MsgFundCommunityPool" => {
                Ok(MessageKind::MsgFundCommunityPool)
            },
            "/cosmos.staking.v1beta1.MsgCreateValidator" => {
                Ok(MessageKind::MsgCreateValidator)
            },
            "/cosmos.staking.v1beta1.MsgEditValidator" => {
                Ok(MessageKind::MsgEditValidator)
            },
            _ => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("Message Type not supported: {}", &value),
            )),
        }
    }
}
