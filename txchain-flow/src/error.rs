use thiserror::Error;
use txchain_rpc::{Amount, RpcError};

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("{step}")]
    Rpc {
        step: String,
        #[source]
        source: RpcError,
    },

    #[error("Still failed with explicit fee rate")]
    FundingRetry(#[source] RpcError),

    #[error("No UTXOs for {0}.")]
    NoUtxo(String),

    #[error("{label}: {amount} plus fee {fee} exceeds the {available} UTXO")]
    InsufficientFunds {
        label: String,
        amount: Amount,
        fee: Amount,
        available: Amount,
    },

    #[error("Failed to sign transaction {label}: {detail}")]
    Unsigned { label: String, detail: String },

    #[error("node returned malformed transaction hex for {label}")]
    BadHex {
        label: String,
        #[source]
        source: hex::FromHexError,
    },

    #[error("generatetoaddress returned no block hash")]
    NoBlock,
}

impl FlowError {
    /// Adapter for `map_err` that tags an RPC failure with the step it broke.
    pub fn at(step: impl Into<String>) -> impl FnOnce(RpcError) -> FlowError {
        let step = step.into();
        move |source| FlowError::Rpc { step, source }
    }
}

pub type FlowResult<T> = std::result::Result<T, FlowError>;
