use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cosmos_sdk_proto::cosmos::{
    base::{
        abci::v1beta1::TxResponse,
        query::v1beta1::{PageRequest, PageResponse},
        tendermint::v1beta1::{
            service_client::ServiceClient as TendermintServiceClient,
            GetBlockByHeightRequest, GetLatestBlockRequest,
        },
        v1beta1::{Coin, DecCoin},
    },
    distribution::v1beta1::{
        query_client::QueryClient as DistributionQueryClient,
        QueryDelegationTotalRewardsRequest,
    },
    staking::v1beta1::{
        query_client::QueryClient as StakingQueryClient, DelegationResponse,
        QueryDelegatorDelegationsRequest, QueryValidatorDelegationsRequest,
        QueryValidatorsRequest,
    },
    tx::v1beta1::{
        service_client::ServiceClient as TxServiceClient, GetTxsEventRequest,
        GetTxsEventResponse, OrderBy, Tx,
    },
};
use num_bigint::BigUint;
use tokio::time::timeout;
use tonic::{
    codec::CompressionEncoding,
    codegen::http::Uri,
    transport::{Channel, ClientTlsConfig, Endpoint},
    IntoRequest, Request, Status,
};
use tracing::{debug, warn};

use crate::{
    configuration::ClientConfig,
    error::Error,
    helpers::{retry, to_hex},
    types::{
        normalize_currency, Amount, Block, Delegation, Delegators,
        DelegatorsUnclaimed, Validator,
    },
};

use super::Client;

const BLOCK_HEIGHT_HEADER: &str = "x-cosmos-block-height";
const VALIDATOR_NOT_FOUND: &str = "validator does not exist";
const DECODING_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Grpc {
    pub config: ClientConfig,
    pub tendermint_client: TendermintServiceClient<Channel>,
    pub tx_service_client: TxServiceClient<Channel>,
    pub staking_query_client: StakingQueryClient<Channel>,
    pub distribution_query_client: DistributionQueryClient<Channel>,
}

impl Grpc {
    pub async fn new(host: &str, config: ClientConfig) -> Result<Grpc, Error> {
        let uri = Uri::from_str(host).context("Invalid grpc url")?;
        let tls_config = ClientTlsConfig::new().with_native_roots();

        let endpoint = Endpoint::from(uri.clone())
            .keep_alive_while_idle(true)
            .tls_config(tls_config)
            .context("Could not parse tls config")?;

        let channel = endpoint.connect().await.with_context(|| {
            format!(r#"Failed to connect to gRPC URI, "{uri}"!"#)
        })?;

        let tendermint_client =
            TendermintServiceClient::with_origin(channel.clone(), uri.clone())
                .accept_compressed(CompressionEncoding::Gzip)
                .max_decoding_message_size(DECODING_LIMIT);
        let tx_service_client =
            TxServiceClient::with_origin(channel.clone(), uri.clone())
                .accept_compressed(CompressionEncoding::Gzip)
                .max_decoding_message_size(DECODING_LIMIT);
        let staking_query_client =
            StakingQueryClient::with_origin(channel.clone(), uri.clone())
                .accept_compressed(CompressionEncoding::Gzip)
                .max_decoding_message_size(DECODING_LIMIT);
        let distribution_query_client =
            DistributionQueryClient::with_origin(channel, uri)
                .accept_compressed(CompressionEncoding::Gzip)
                .max_decoding_message_size(DECODING_LIMIT);

        Ok(Grpc {
            config,
            tendermint_client,
            tx_service_client,
            staking_query_client,
            distribution_query_client,
        })
    }

    fn is_unresolvable(&self, status: &Status) -> bool {
        self.config
            .unresolvable_errors
            .iter()
            .any(|fragment| status.message().contains(fragment.as_str()))
    }

    async fn get_txs_page(
        &self,
        height: u64,
        page: u64,
        limit: u64,
    ) -> Result<GetTxsEventResponse, Status> {
        let mut client = self.tx_service_client.clone();
        let request = GetTxsEventRequest {
            query: format!("tx.height={}", height),
            order_by: OrderBy::Asc as i32,
            page,
            limit,
            ..Default::default()
        };

        match timeout(
            self.config.timeout_search_tx_call,
            client.get_txs_event(request),
        )
        .await
        {
            Ok(response) => response.map(|response| response.into_inner()),
            Err(_) => Err(Status::deadline_exceeded(format!(
                "tx search at height {} timed out",
                height
            ))),
        }
    }

    /// Fetches every transaction of the block on its own page, skipping the
    /// ones the node cannot decode.
    async fn get_raw_txs_one_by_one(
        &self,
        height: u64,
    ) -> Result<(Vec<Tx>, Vec<TxResponse>), Error> {
        let count = self.get_block_tx_count(height).await?;
        let mut txs = vec![];
        let mut tx_responses = vec![];

        for page in 1..=count {
            match self.get_txs_page(height, page, 1).await {
                Ok(response) => {
                    txs.extend(response.txs);
                    tx_responses.extend(response.tx_responses);
                },
                Err(status) if self.is_unresolvable(&status) => {
                    warn!(
                        "skipping unresolvable tx {} at height {}: {}",
                        page,
                        height,
                        status.message()
                    );
                },
                Err(status) => return Err(Error::from(status)),
            }
        }

        Ok((txs, tx_responses))
    }

    async fn get_block_tx_count(&self, height: u64) -> Result<u64, Error> {
        const MISSING_BLOCK_DATA_INFO_ERROR: &str =
            "Query response doesn't contain block's data information!";

        let mut client = self.tendermint_client.clone();
        let response = timeout(
            self.config.timeout_block_call,
            client.get_block_by_height(GetBlockByHeightRequest {
                height: i64::try_from(height)?,
            }),
        )
        .await??
        .into_inner();

        let count = response
            .sdk_block
            .and_then(|block| block.data)
            .context(MISSING_BLOCK_DATA_INFO_ERROR)?
            .txs
            .len();

        Ok(u64::try_from(count)?)
    }

    fn page_request(key: Vec<u8>, limit: u64) -> Option<PageRequest> {
        Some(PageRequest {
            key,
            offset: 0,
            limit,
            count_total: false,
            reverse: false,
        })
    }

    fn next_key(pagination: Option<PageResponse>) -> Option<Vec<u8>> {
        pagination
            .map(|page| page.next_key)
            .filter(|key| !key.is_empty())
    }

    async fn delegations_page(
        &self,
        height: u64,
        validator: &str,
        key: &[u8],
        per_page: u64,
    ) -> Result<(Vec<DelegationResponse>, Option<PageResponse>), Error> {
        let mut client = self.staking_query_client.clone();
        let request = at_height(
            QueryValidatorDelegationsRequest {
                validator_addr: validator.to_owned(),
                pagination: Self::page_request(key.to_vec(), per_page),
            },
            height,
        );

        let response = timeout(
            self.config.timeout_block_call,
            client.validator_delegations(request),
        )
        .await?
        .map_err(|status| {
            if status.message().contains(VALIDATOR_NOT_FOUND) {
                Error::ValidatorNotFound(validator.to_owned())
            } else {
                Error::from(status)
            }
        })?
        .into_inner();

        Ok((response.delegation_responses, response.pagination))
    }
}

#[async_trait]
impl Client for Grpc {
    async fn get_block(&self, height: u64) -> Result<Block, Error> {
        const MISSING_BLOCK_INFO_ERROR: &str =
            "Query response doesn't contain block information!";

        const MISSING_BLOCK_HEADER_INFO_ERROR: &str =
            "Query response doesn't contain block's header information!";

        let mut client = self.tendermint_client.clone();

        let (block_id, block) = if height == 0 {
            let response = timeout(
                self.config.timeout_block_call,
                client.get_latest_block(GetLatestBlockRequest {}),
            )
            .await??
            .into_inner();
            (response.block_id, response.sdk_block)
        } else {
            let response = timeout(
                self.config.timeout_block_call,
                client.get_block_by_height(GetBlockByHeightRequest {
                    height: i64::try_from(height)?,
                }),
            )
            .await??
            .into_inner();
            (response.block_id, response.sdk_block)
        };

        let header = block
            .context(MISSING_BLOCK_INFO_ERROR)?
            .header
            .context(MISSING_BLOCK_HEADER_INFO_ERROR)?;

        let time = header.time.context("Missing header time in block")?;
        let time = DateTime::<Utc>::from_timestamp(
            time.seconds,
            u32::try_from(time.nanos)?,
        )
        .context("Block time out of range")?;

        Ok(Block {
            height: u64::try_from(header.height)?,
            hash: block_id.map(|id| to_hex(&id.hash)).unwrap_or_default(),
            time,
        })
    }

    async fn get_raw_txs(
        &self,
        height: u64,
        per_page: u64,
    ) -> Result<(Vec<Tx>, Vec<TxResponse>), Error> {
        let mut txs = vec![];
        let mut tx_responses = vec![];
        let mut page = 1;

        loop {
            let response = match self.get_txs_page(height, page, per_page).await
            {
                Ok(response) => response,
                Err(status) if self.is_unresolvable(&status) => {
                    warn!(
                        "unresolvable tx at height {}, falling back to single fetch: {}",
                        height,
                        status.message()
                    );
                    return self.get_raw_txs_one_by_one(height).await;
                },
                Err(status) => return Err(Error::from(status)),
            };

            let fetched = response.tx_responses.len();
            txs.extend(response.txs);
            tx_responses.extend(response.tx_responses);

            if fetched == 0 || u64::try_from(tx_responses.len())? >= response.total
            {
                break;
            }

            page += 1;
        }

        if txs.len() != tx_responses.len() {
            return Err(Error::UnexpectedEventShape(format!(
                "{} txs but {} tx responses at height {}",
                txs.len(),
                tx_responses.len(),
                height
            )));
        }

        debug!("fetched {} txs at height {}", tx_responses.len(), height);

        Ok((txs, tx_responses))
    }

    async fn get_height_validators(
        &self,
        height: u64,
        per_page: u64,
    ) -> Result<Vec<Validator>, Error> {
        let mut validators = vec![];
        let mut key = vec![];

        loop {
            let (items, pagination) = retry(
                self.config.retry_attempts,
                self.config.retry_backoff,
                || {
                    let mut client = self.staking_query_client.clone();
                    let request = at_height(
                        QueryValidatorsRequest {
                            status: String::new(),
                            pagination: Self::page_request(
                                key.to_owned(),
                                per_page,
                            ),
                        },
                        height,
                    );
                    let budget = self.config.timeout_block_call;

                    async move {
                        let response =
                            timeout(budget, client.validators(request))
                                .await??
                                .into_inner();
                        Ok::<_, Error>((response.validators, response.pagination))
                    }
                },
            )
            .await?;

            validators.extend(items.into_iter().map(|validator| Validator {
                operator_address: validator.operator_address,
                jailed: validator.jailed,
                status: validator.status,
                tokens: validator.tokens,
            }));

            match Self::next_key(pagination) {
                Some(next) => key = next,
                None => break,
            }
        }

        Ok(validators)
    }

    async fn get_delegators(
        &self,
        height: u64,
        validator: &str,
        per_page: u64,
    ) -> Result<Vec<Delegation>, Error> {
        let mut delegations = vec![];
        let mut key = vec![];

        loop {
            let (items, pagination) = retry(
                self.config.retry_attempts,
                self.config.retry_backoff,
                || self.delegations_page(height, validator, &key, per_page),
            )
            .await?;

            for item in items {
                delegations.push(delegation(item)?);
            }

            match Self::next_key(pagination) {
                Some(next) => key = next,
                None => break,
            }
        }

        Ok(delegations)
    }

    async fn get_delegator_delegations(
        &self,
        height: u64,
        delegator: &str,
        per_page: u64,
    ) -> Result<Vec<Delegation>, Error> {
        let mut delegations = vec![];
        let mut key = vec![];

        loop {
            let (items, pagination) = retry(
                self.config.retry_attempts,
                self.config.retry_backoff,
                || {
                    let mut client = self.staking_query_client.clone();
                    let request = at_height(
                        QueryDelegatorDelegationsRequest {
                            delegator_addr: delegator.to_owned(),
                            pagination: Self::page_request(
                                key.to_owned(),
                                per_page,
                            ),
                        },
                        height,
                    );
                    let budget = self.config.timeout_block_call;

                    async move {
                        let response = timeout(
                            budget,
                            client.delegator_delegations(request),
                        )
                        .await??
                        .into_inner();
                        Ok::<_, Error>((
                            response.delegation_responses,
                            response.pagination,
                        ))
                    }
                },
            )
            .await?;

            for item in items {
                delegations.push(delegation(item)?);
            }

            match Self::next_key(pagination) {
                Some(next) => key = next,
                None => break,
            }
        }

        Ok(delegations)
    }

    async fn get_delegations(
        &self,
        height: u64,
        delegator: &str,
    ) -> Result<Delegators, Error> {
        let mut client = self.distribution_query_client.clone();
        let request = at_height(
            QueryDelegationTotalRewardsRequest {
                delegator_address: delegator.to_owned(),
            },
            height,
        );

        let response = timeout(
            self.config.timeout_block_call,
            client.delegation_total_rewards(request),
        )
        .await??
        .into_inner();

        let mut unclaimed = vec![];
        for reward in response.rewards {
            let mut amounts = vec![];
            for coin in reward.reward {
                amounts.push(dec_coin_amount(
                    &coin,
                    self.config.decimal_precision,
                )?);
            }

            unclaimed.push(DelegatorsUnclaimed {
                validator_address: reward.validator_address,
                unclaimed: amounts,
            });
        }

        Ok(Delegators {
            delegator_address: delegator.to_owned(),
            unclaimed,
        })
    }
}

/// Pins a query to `height`. Height 0 queries the latest state.
fn at_height<T>(message: T, height: u64) -> Request<T> {
    let mut request = message.into_request();

    if height > 0 {
        request
            .metadata_mut()
            .append(BLOCK_HEIGHT_HEADER, height.into());
    }

    request
}

fn delegation(response: DelegationResponse) -> Result<Delegation, Error> {
    let item = response
        .delegation
        .context("Query response doesn't contain delegation information!")?;

    let balance = match response.balance {
        Some(coin) => Some(coin_amount(&coin)?),
        None => None,
    };

    Ok(Delegation {
        delegator_address: item.delegator_address,
        validator_address: item.validator_address,
        shares: item.shares,
        balance,
    })
}

fn coin_amount(coin: &Coin) -> Result<Amount, Error> {
    Amount::parse(&coin.denom, &format!("{}{}", coin.amount, coin.denom))
}

/// `DecCoin` amounts travel as integers scaled by `10^precision`; older
/// nodes send them with an explicit decimal point.
fn dec_coin_amount(coin: &DecCoin, precision: u32) -> Result<Amount, Error> {
    if coin.amount.contains('.') {
        return Amount::parse(
            &coin.denom,
            &format!("{}{}", coin.amount, coin.denom),
        );
    }

    let numeric = BigUint::from_str(&coin.amount)
        .map_err(|_| Error::MalformedAmount(coin.amount.to_owned()))?;
    let exp = -i32::try_from(precision)?;

    Ok(Amount::new(normalize_currency(&coin.denom), numeric, exp))
}
