pub use self::{
    amount::{format_decimal, normalize_currency, parse_amounts, Amount, AmountsBuilder},
    chain::{Block, Delegation, Delegators, DelegatorsUnclaimed, Validator},
    message_kind::MessageKind,
    records::{
        sequence_of, sequence_start, Crossing, EarnedAmount, HeightTime, HeightTxs, Rewards,
        SimpleReward, GROUPING, SEQUENCE_SECONDS,
    },
    reward_tx::{
        Attribution, ClaimedReward, DelegationOp, DelegatorValidator, RewardAmount, RewardTx,
        RewardType, TxMeta,
    },
    snapshot::{AccountsHeight, UnclaimedSnapshot, ValidatorBalances},
};

pub(crate) mod amount;
mod chain;
mod message_kind;
mod records;
mod reward_tx;
mod snapshot;
