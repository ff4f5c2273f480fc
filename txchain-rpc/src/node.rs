//! Typed wallet/node endpoints.

use serde_json::{json, Value};

use crate::client::RpcClient;
use crate::error::RpcResult;
use crate::types::{
    AddressType, Amount, FeeStrategy, OutPoint, SignedTransaction, TransactionDetails, Unspent,
    WalletInfo,
};

/// The slice of the node's RPC surface the wallet flows use.
///
/// Wallet-scoped calls must be made on the handle returned by
/// [`NodeApi::for_wallet`].
pub trait NodeApi: Sized {
    fn for_wallet(&self, name: &str) -> RpcResult<Self>;

    fn list_wallets(&self) -> RpcResult<Vec<String>>;
    fn load_wallet(&self, name: &str) -> RpcResult<()>;
    fn create_wallet(&self, name: &str) -> RpcResult<()>;
    fn wallet_info(&self) -> RpcResult<WalletInfo>;

    fn new_address(&self, label: &str, kind: Option<AddressType>) -> RpcResult<String>;
    fn generate_to_address(&self, blocks: u32, address: &str) -> RpcResult<Vec<String>>;
    fn balance(&self) -> RpcResult<Amount>;
    fn send_to_address(&self, address: &str, amount: Amount, fee: &FeeStrategy)
        -> RpcResult<String>;

    fn raw_transaction_hex(&self, txid: &str) -> RpcResult<String>;
    fn transaction_details(&self, txid: &str, block_hash: Option<&str>)
        -> RpcResult<TransactionDetails>;
    fn list_unspent(&self) -> RpcResult<Vec<Unspent>>;

    fn create_raw_transaction(
        &self,
        inputs: &[OutPoint],
        outputs: &[(String, Amount)],
    ) -> RpcResult<String>;
    fn decode_raw_transaction(&self, hex: &str) -> RpcResult<Value>;
    fn sign_raw_transaction_with_wallet(&self, hex: &str) -> RpcResult<SignedTransaction>;
    fn send_raw_transaction(&self, hex: &str) -> RpcResult<String>;
}

/// Positional `sendtoaddress` parameters for a fee strategy.
pub fn send_to_address_params(address: &str, amount: Amount, fee: &FeeStrategy) -> Vec<Value> {
    let mut params = vec![json!(address), json!(amount)];
    match fee {
        FeeStrategy::Estimate => {}
        FeeStrategy::ConfTarget { blocks, mode } => {
            params.extend([json!(""), json!(""), json!(false), json!(true)]);
            params.extend([json!(blocks), json!(mode.as_str())]);
        }
        FeeStrategy::FeeRate { sat_per_vbyte } => {
            params.extend([json!(""), json!(""), json!(false), json!(true)]);
            params.extend([Value::Null, json!("unset"), json!(false), json!(sat_per_vbyte)]);
        }
    }
    params
}

/// `createrawtransaction` outputs, as an ordered array of one-key objects.
pub fn outputs_param(outputs: &[(String, Amount)]) -> Value {
    Value::Array(
        outputs
            .iter()
            .map(|(address, amount)| json!({ address.as_str(): amount }))
            .collect(),
    )
}

impl NodeApi for RpcClient {
    fn for_wallet(&self, name: &str) -> RpcResult<Self> {
        self.wallet_client(name)
    }

    fn list_wallets(&self) -> RpcResult<Vec<String>> {
        self.call("listwallets", &[])
    }

    fn load_wallet(&self, name: &str) -> RpcResult<()> {
        self.call_value("loadwallet", &[json!(name)]).map(|_| ())
    }

    fn create_wallet(&self, name: &str) -> RpcResult<()> {
        self.call_value("createwallet", &[json!(name)]).map(|_| ())
    }

    fn wallet_info(&self) -> RpcResult<WalletInfo> {
        self.call("getwalletinfo", &[])
    }

    fn new_address(&self, label: &str, kind: Option<AddressType>) -> RpcResult<String> {
        match kind {
            Some(kind) => self.call("getnewaddress", &[json!(label), json!(kind.as_str())]),
            None if label.is_empty() => self.call("getnewaddress", &[]),
            None => self.call("getnewaddress", &[json!(label)]),
        }
    }

    fn generate_to_address(&self, blocks: u32, address: &str) -> RpcResult<Vec<String>> {
        self.call("generatetoaddress", &[json!(blocks), json!(address)])
    }

    fn balance(&self) -> RpcResult<Amount> {
        self.call("getbalance", &[])
    }

    fn send_to_address(
        &self,
        address: &str,
        amount: Amount,
        fee: &FeeStrategy,
    ) -> RpcResult<String> {
        self.call("sendtoaddress", &send_to_address_params(address, amount, fee))
    }

    fn raw_transaction_hex(&self, txid: &str) -> RpcResult<String> {
        self.call("getrawtransaction", &[json!(txid)])
    }

    fn transaction_details(
        &self,
        txid: &str,
        block_hash: Option<&str>,
    ) -> RpcResult<TransactionDetails> {
        let mut params = vec![json!(txid), json!(true)];
        if let Some(hash) = block_hash {
            params.push(json!(hash));
        }
        self.call("getrawtransaction", &params)
    }

    fn list_unspent(&self) -> RpcResult<Vec<Unspent>> {
        self.call("listunspent", &[])
    }

    fn create_raw_transaction(
        &self,
        inputs: &[OutPoint],
        outputs: &[(String, Amount)],
    ) -> RpcResult<String> {
        self.call(
            "createrawtransaction",
            &[json!(inputs), outputs_param(outputs)],
        )
    }

    fn decode_raw_transaction(&self, hex: &str) -> RpcResult<Value> {
        self.call_value("decoderawtransaction", &[json!(hex)])
    }

    fn sign_raw_transaction_with_wallet(&self, hex: &str) -> RpcResult<SignedTransaction> {
        self.call("signrawtransactionwithwallet", &[json!(hex)])
    }

    fn send_raw_transaction(&self, hex: &str) -> RpcResult<String> {
        self.call("sendrawtransaction", &[json!(hex)])
    }
}
