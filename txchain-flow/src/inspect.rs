//! Post-broadcast inspection: unlocking data, balances, sizes.

use serde::Serialize;
use txchain_rpc::{Amount, NodeApi, RpcResult, ScriptSig, TransactionDetails, Unspent};

use crate::spend::Hop;

/// What unlocked one input: its witness stack if it has one, else its scriptSig.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InputEvidence {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness: Option<Vec<String>>,
    #[serde(rename = "scriptSig", skip_serializing_if = "Option::is_none")]
    pub script_sig: Option<ScriptSig>,
}

pub fn input_evidence(tx: &TransactionDetails) -> Vec<InputEvidence> {
    tx.vin
        .iter()
        .filter_map(|vin| {
            let input = vin.outpoint_label();
            if let Some(stack) = &vin.txinwitness {
                Some(InputEvidence {
                    input,
                    witness: Some(stack.clone()),
                    script_sig: None,
                })
            } else {
                vin.script_sig.as_ref().map(|sig| InputEvidence {
                    input,
                    witness: None,
                    script_sig: Some(sig.clone()),
                })
            }
        })
        .collect()
}

/// Unlocking data of a confirmed hop, looked up in the block that mined it.
pub fn hop_evidence<N: NodeApi>(wallet: &N, hop: &Hop) -> RpcResult<Vec<InputEvidence>> {
    let tx = wallet.transaction_details(&hop.txid, Some(&hop.block_hash))?;
    Ok(input_evidence(&tx))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TxMetrics {
    pub size: u64,
    pub vsize: Option<u64>,
    pub weight: Option<u64>,
}

impl From<&TransactionDetails> for TxMetrics {
    fn from(tx: &TransactionDetails) -> Self {
        Self {
            size: tx.size,
            vsize: tx.vsize,
            weight: tx.weight,
        }
    }
}

pub fn hop_metrics<N: NodeApi>(wallet: &N, hop: &Hop) -> RpcResult<TxMetrics> {
    let tx = wallet.transaction_details(&hop.txid, Some(&hop.block_hash))?;
    Ok(TxMetrics::from(&tx))
}

/// Sum of unspent outputs paying to `address`.
pub fn address_balance(utxos: &[Unspent], address: &str) -> Amount {
    utxos
        .iter()
        .filter(|u| u.pays_to(address))
        .map(|u| u.amount)
        .sum()
}
