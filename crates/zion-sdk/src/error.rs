use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::market::TradeType;

/// Which side of a transaction an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxSide {
    Input,
    Output,
}

impl std::fmt::Display for TxSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxSide::Input => write!(f, "input"),
            TxSide::Output => write!(f, "output"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid market: {0}")]
    InvalidMarket(String),

    #[error("asset {0} is not part of the market")]
    AssetNotInMarket(String),

    #[error("swap terms do not match a {0} trade")]
    TradeTypeMismatch(TradeType),

    #[error("proposed amounts do not match the quoted price: {0}")]
    BadPricing(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("blinding key for {side} at index {index} is missing in the swap request")]
    MissingBlindingKey { side: TxSide, index: usize },

    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("broadcast failed: {0}")]
    BroadcastFailed(String),

    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error("PSET construction error: {0}")]
    Pset(String),

    #[error("blinding error: {0}")]
    Blinding(String),

    #[error("signer error: {0}")]
    Signer(String),

    #[error("descriptor error: {0}")]
    Descriptor(String),

    #[error("wallet initialization error: {0}")]
    WalletInit(String),

    #[error("electrum error: {0}")]
    Electrum(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("finalize error: {0}")]
    Finalize(String),

    #[error("unknown swap id: {0}")]
    UnknownSwap(String),

    #[error("internal mutex poisoned by a prior panic")]
    MutexPoisoned,

    #[error("task join error: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Stable, serializable classification of an [`Error`], reported to the
/// counterparty alongside the human readable reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidMarket,
    AssetNotInMarket,
    TradeTypeMismatch,
    BadPricing,
    InsufficientFunds,
    MissingBlindingKey,
    MalformedTransaction,
    BroadcastFailed,
    InvalidRequest,
    /// The counterparty abandoned the swap.
    Aborted,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidMarket(_) => ErrorKind::InvalidMarket,
            Error::AssetNotInMarket(_) => ErrorKind::AssetNotInMarket,
            Error::TradeTypeMismatch(_) => ErrorKind::TradeTypeMismatch,
            Error::BadPricing(_) => ErrorKind::BadPricing,
            Error::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            Error::MissingBlindingKey { .. } => ErrorKind::MissingBlindingKey,
            Error::MalformedTransaction(_) => ErrorKind::MalformedTransaction,
            Error::BroadcastFailed(_) => ErrorKind::BroadcastFailed,
            Error::InvalidPrice(_) | Error::UnknownSwap(_) => ErrorKind::InvalidRequest,
            Error::Pset(_)
            | Error::Blinding(_)
            | Error::Signer(_)
            | Error::Descriptor(_)
            | Error::WalletInit(_)
            | Error::Electrum(_)
            | Error::Query(_)
            | Error::Finalize(_)
            | Error::MutexPoisoned
            | Error::Task(_) => ErrorKind::Internal,
        }
    }

    /// Whether the error was raised by request validation, before any
    /// wallet or transaction work started.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidMarket
                | ErrorKind::AssetNotInMarket
                | ErrorKind::TradeTypeMismatch
                | ErrorKind::BadPricing
                | ErrorKind::InvalidRequest
        )
    }
}
