use anyhow::Error as ANYHOW_ERROR;
use bigdecimal::ParseBigDecimalError as BIG_DECIMAL_ERROR;
use cosmos_sdk_proto::prost::DecodeError as DECODE_ERROR;
use serde_json::Error as JSON_ERROR;
use sqlx::error::Error as SQL_ERROR;
use std::num::TryFromIntError as TRY_FROM_INT_ERROR;
use std::{env::VarError, io::Error as IO_ERROR, num::ParseIntError};
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::error::Elapsed;
use tonic::{Code, Status};
use tracing::subscriber::SetGlobalDefaultError as TRACING_GLOBAL_DEFAULT_ERROR;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] IO_ERROR),

    #[error("{0}")]
    INT(#[from] ParseIntError),

    #[error("{0}")]
    SQL(#[from] SQL_ERROR),

    #[error("{0}")]
    VAR(#[from] VarError),

    #[error("{0}")]
    TokioJoinError(#[from] JoinError),

    #[error("{0}")]
    TokioElapsedError(#[from] Elapsed),

    #[error("{0}")]
    BigDecimalError(#[from] BIG_DECIMAL_ERROR),

    #[error("{0}")]
    JsonError(#[from] JSON_ERROR),

    #[error("{0}")]
    DecodeError(#[from] DECODE_ERROR),

    #[error("{0}")]
    TryFromIntError(#[from] TRY_FROM_INT_ERROR),

    #[error("{0}")]
    AnyHowError(#[from] ANYHOW_ERROR),

    #[error("Tracing error: {0}")]
    SetGlobalDefaultError(#[from] TRACING_GLOBAL_DEFAULT_ERROR),

    #[error("gRPC status: {0}")]
    TonicStatus(Box<Status>),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Task message error: {0}")]
    TaskError(String),

    #[error("Malformed amount: {0}")]
    MalformedAmount(String),

    #[error("Invalid message encoding for {type_url}: {reason}")]
    InvalidMessageEncoding { type_url: String, reason: String },

    #[error(
        "Inconsistent transfer events: {received} coin_received attributes, {spent} coin_spent attributes"
    )]
    InconsistentTransferEvents { received: usize, spent: usize },

    #[error("Reward {amount} of tx {hash} matches neither source nor destination validator")]
    UnattributableReward { hash: String, amount: String },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Validator does not exist: {0}")]
    ValidatorNotFound(String),

    #[error("Snapshot missing: {kind} at sequence {sequence}")]
    SnapshotMissing { kind: String, sequence: u64 },

    #[error("Unexpected event shape: {0}")]
    UnexpectedEventShape(String),

    #[error("Message type not supported: {0}")]
    UnsupportedMessage(String),
}

impl From<Status> for Error {
    fn from(value: Status) -> Self {
        Self::TonicStatus(Box::new(value))
    }
}

impl Error {
    /// Errors worth another attempt after a backoff. Node answers such as
    /// `InvalidArgument` or `NotFound` (pruned heights) are final.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::TonicStatus(status) => matches!(
                status.code(),
                Code::Unavailable
                    | Code::DeadlineExceeded
                    | Code::ResourceExhausted
                    | Code::Unknown
            ),
            Error::TokioElapsedError(_) | Error::UpstreamUnavailable(_) => true,
            _ => false,
        }
    }
}
