use serde::Serialize;
use tracing::{error, info};
use txchain_rpc::{Amount, FeeStrategy, NodeApi};

use crate::error::{FlowError, FlowResult};
use crate::mining;
use crate::scenario::Party;

#[derive(Clone, Debug, Serialize)]
pub struct Funding {
    pub txid: String,
    pub raw_hex: String,
    /// Strategy that got the payment accepted.
    pub fee: FeeStrategy,
    /// Block mined to confirm the payment.
    pub block_hash: String,
}

/// Pay `amount` from the wallet to `to`.
///
/// When the node cannot estimate a fee (an empty regtest mempool with no
/// `fallbackfee`), the payment is retried once with `fallback`. The payment
/// is then confirmed with one block.
pub fn fund<N: NodeApi>(
    wallet: &N,
    to: &Party,
    amount: Amount,
    fallback: &FeeStrategy,
) -> FlowResult<Funding> {
    let first = FeeStrategy::Estimate;
    let (txid, fee) = match wallet.send_to_address(&to.address, amount, &first) {
        Ok(txid) => {
            info!("Funded {} with txid={}", to.label, txid);
            (txid, first)
        }
        Err(e) if e.is_fee_estimation_failure() => {
            error!("Fee estimation failed. Try setting fallbackfee in bitcoin.conf");
            info!("Attempting to use explicit fee rate ({})...", fallback);
            let txid = wallet
                .send_to_address(&to.address, amount, fallback)
                .map_err(|e2| {
                    error!("Still failed with explicit fee rate: {}", e2);
                    FlowError::FundingRetry(e2)
                })?;
            info!("Funded {} with explicit fee rate, txid={}", to.label, txid);
            (txid, fallback.clone())
        }
        Err(e) => {
            error!("Error funding address {}: {}", to.label, e);
            return Err(FlowError::at(format!("funding address {}", to.label))(e));
        }
    };

    let raw_hex = wallet
        .raw_transaction_hex(&txid)
        .map_err(FlowError::at(format!("fetching funding transaction {txid}")))?;
    info!("Fund {} raw transaction hex: {}", to.label, raw_hex);

    let block_hash = mining::confirm(wallet, &to.label)?;
    Ok(Funding {
        txid,
        raw_hex,
        fee,
        block_hash,
    })
}
