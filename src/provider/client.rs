use async_trait::async_trait;
use cosmos_sdk_proto::cosmos::{base::abci::v1beta1::TxResponse, tx::v1beta1::Tx};

use crate::{
    error::Error,
    types::{Block, Delegation, Delegators, Validator},
};

/// Chain queries used by the extraction. Every query is pinned to `height`
/// and walks all pages of `per_page` items.
#[async_trait]
pub trait Client: Send + Sync {
    async fn get_block(&self, height: u64) -> Result<Block, Error>;

    /// Transactions of a block and their execution results, in block order.
    async fn get_raw_txs(
        &self,
        height: u64,
        per_page: u64,
    ) -> Result<(Vec<Tx>, Vec<TxResponse>), Error>;

    async fn get_height_validators(
        &self,
        height: u64,
        per_page: u64,
    ) -> Result<Vec<Validator>, Error>;

    /// Fails with [`Error::ValidatorNotFound`] when the validator did not
    /// exist at `height`.
    async fn get_delegators(
        &self,
        height: u64,
        validator: &str,
        per_page: u64,
    ) -> Result<Vec<Delegation>, Error>;

    async fn get_delegator_delegations(
        &self,
        height: u64,
        delegator: &str,
        per_page: u64,
    ) -> Result<Vec<Delegation>, Error>;

    /// Unclaimed rewards of `delegator` per validator.
    async fn get_delegations(&self, height: u64, delegator: &str) -> Result<Delegators, Error>;
}
