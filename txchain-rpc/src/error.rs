//! RPC error handling

use std::path::PathBuf;
use thiserror::Error;

/// Node code for "wallet is already loaded".
pub const RPC_WALLET_ALREADY_LOADED: i64 = -35;

/// Errors raised while talking to the node
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error")]
    Transport(#[from] reqwest::Error),

    #[error("node rejected credentials (HTTP {0})")]
    Unauthorized(u16),

    #[error("unexpected HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("{message} (code {code})")]
    Node { code: i64, message: String },

    #[error("malformed `{method}` response")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot read cookie file {path}")]
    Cookie {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cookie file {0} is not in user:password form")]
    CookieFormat(PathBuf),

    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

pub type RpcResult<T> = std::result::Result<T, RpcError>;

impl RpcError {
    /// Code reported by the node, if the failure came from the node itself.
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Node { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Substring test against the rendered error text.
    pub fn mentions(&self, needle: &str) -> bool {
        self.to_string().contains(needle)
    }

    pub fn is_already_loaded(&self) -> bool {
        self.code() == Some(RPC_WALLET_ALREADY_LOADED) || self.mentions("already loaded")
    }

    pub fn is_fee_estimation_failure(&self) -> bool {
        self.mentions("Fee estimation failed")
    }
}
