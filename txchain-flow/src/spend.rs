//! One hop of the A->B->C chain: pick the source UTXO, build, sign,
//! broadcast and confirm a raw transaction.

use serde::Serialize;
use tracing::{error, info};
use txchain_rpc::{Amount, NodeApi, OutPoint, Unspent};

use crate::error::{FlowError, FlowResult};
use crate::mining;
use crate::scenario::{hop_label, Party};

/// Inputs and outputs for a single-input payment with change back to the sender.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpendPlan {
    pub input: OutPoint,
    pub input_amount: Amount,
    pub outputs: Vec<(String, Amount)>,
    pub change: Amount,
}

#[derive(Clone, Debug, Serialize)]
pub struct Hop {
    pub label: String,
    pub from: Party,
    pub to: Party,
    pub plan: SpendPlan,
    pub unsigned_hex: String,
    pub signed_hex: String,
    pub txid: String,
    pub block_hash: String,
}

/// First unspent output paying to `address`, in the node's listing order.
pub fn select_utxo<'a>(utxos: &'a [Unspent], address: &str) -> Option<&'a Unspent> {
    utxos.iter().find(|u| u.pays_to(address))
}

/// `amount` to `to`, the remainder minus a flat `fee` back to `from`.
/// A zero remainder gets no change output.
pub fn plan_spend(
    utxo: &Unspent,
    from: &Party,
    to: &Party,
    amount: Amount,
    fee: Amount,
) -> FlowResult<SpendPlan> {
    let change = utxo
        .amount
        .checked_sub(amount)
        .and_then(|rest| rest.checked_sub(fee))
        .ok_or_else(|| FlowError::InsufficientFunds {
            label: hop_label(from, to),
            amount,
            fee,
            available: utxo.amount,
        })?;

    let mut outputs = vec![(to.address.clone(), amount)];
    if !change.is_zero() {
        outputs.push((from.address.clone(), change));
    }
    Ok(SpendPlan {
        input: utxo.outpoint(),
        input_amount: utxo.amount,
        outputs,
        change,
    })
}

pub fn execute_hop<N: NodeApi>(
    wallet: &N,
    from: &Party,
    to: &Party,
    amount: Amount,
    fee: Amount,
) -> FlowResult<Hop> {
    let label = hop_label(from, to);

    let utxos = wallet
        .list_unspent()
        .map_err(FlowError::at(format!("listing UTXOs for {}", from.label)))?;
    let Some(utxo) = select_utxo(&utxos, &from.address) else {
        info!("No UTXOs for {}.", from.label);
        return Err(FlowError::NoUtxo(from.label.clone()));
    };
    let plan = plan_spend(utxo, from, to, amount, fee)?;

    let unsigned_hex = wallet
        .create_raw_transaction(std::slice::from_ref(&plan.input), &plan.outputs)
        .map_err(FlowError::at(format!("creating {label}")))?;
    info!("Raw {} transaction hex (unsigned): {}", label, unsigned_hex);

    let decoded = wallet
        .decode_raw_transaction(&unsigned_hex)
        .map_err(FlowError::at(format!("decoding {label}")))?;
    let pretty = serde_json::to_string_pretty(&decoded).unwrap_or_else(|_| decoded.to_string());
    info!("Decoded {}: {}", label, pretty);

    let signed = wallet
        .sign_raw_transaction_with_wallet(&unsigned_hex)
        .map_err(FlowError::at(format!("signing {label}")))?;
    info!("Raw {} transaction hex (signed): {}", label, signed.hex);
    if !signed.complete {
        error!("Failed to sign transaction {}", label);
        let detail = signed
            .errors
            .iter()
            .map(|issue| format!("{}:{} {}", issue.txid, issue.vout, issue.error))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(FlowError::Unsigned { label, detail });
    }
    info!("Transaction {} successfully signed", label);

    let bytes = hex::decode(&signed.hex).map_err(|source| FlowError::BadHex {
        label: label.clone(),
        source,
    })?;
    let txid = wallet.send_raw_transaction(&signed.hex).map_err(|e| {
        error!("Failed to broadcast {} transaction: {}", label, e);
        FlowError::at(format!("broadcasting {label}"))(e)
    })?;
    info!("{} broadcast ({} bytes), txid={}", label, bytes.len(), txid);

    let block_hash = mining::confirm(wallet, &to.label)?;

    Ok(Hop {
        label,
        from: from.clone(),
        to: to.clone(),
        plan,
        unsigned_hex,
        signed_hex: signed.hex,
        txid,
        block_hash,
    })
}
