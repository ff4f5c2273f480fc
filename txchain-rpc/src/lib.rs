//! txchain-rpc: blocking JSON-RPC client for a Bitcoin Core compatible
//! wallet node.
//! - `client`: transport, authentication, reply/error decoding.
//! - `node`: the `NodeApi` trait with one method per endpoint we drive.
//! - `types`: satoshi-exact amounts and the node's reply shapes.

pub mod client;
pub mod error;
pub mod node;
pub mod types;

pub use client::{Auth, RpcClient, DEFAULT_TIMEOUT};
pub use error::{RpcError, RpcResult, RPC_WALLET_ALREADY_LOADED};
pub use node::NodeApi;
pub use types::{
    AddressType, Amount, EstimateMode, FeeStrategy, OutPoint, ParseAmountError, ScriptSig,
    SignedTransaction, SigningIssue, TransactionDetails, TxInput, Unspent, WalletInfo,
    SATS_PER_BTC,
};
