//! Block generation on the test network.

use serde::Serialize;
use tracing::{error, info, warn};
use txchain_rpc::{AddressType, Amount, NodeApi};

use crate::error::{FlowError, FlowResult};

#[derive(Clone, Debug, Serialize)]
pub struct MiningOutcome {
    pub address: String,
    pub blocks: usize,
    pub last_block: String,
    pub balance: Amount,
}

/// Mine enough blocks for a coinbase to mature.
///
/// Only the address request is fatal: a node that refuses to mine (anything
/// but regtest) is reported and the run carries on with whatever it has.
pub fn mine_to_maturity<N: NodeApi>(
    wallet: &N,
    blocks: u32,
    kind: AddressType,
) -> FlowResult<Option<MiningOutcome>> {
    let address = wallet
        .new_address("mining", Some(kind))
        .map_err(FlowError::at("requesting mining address"))?;

    let mined = wallet
        .generate_to_address(blocks, &address)
        .and_then(|hashes| wallet.balance().map(|balance| (hashes, balance)));
    match mined {
        Ok((hashes, balance)) => {
            let last_block = hashes.last().cloned().unwrap_or_default();
            info!("Generated {} blocks. Last block hash: {}", hashes.len(), last_block);
            info!("Wallet balance after mining: {} BTC", balance);
            Ok(Some(MiningOutcome {
                address,
                blocks: hashes.len(),
                last_block,
                balance,
            }))
        }
        Err(e) => {
            warn!("Could not mine blocks (this is okay if not on regtest): {}", e);
            Ok(None)
        }
    }
}

/// Mine one block to a fresh wallet address so pending payments confirm.
pub fn confirm<N: NodeApi>(wallet: &N, what: &str) -> FlowResult<String> {
    let step = format!("confirming transaction to {what}");
    let hash = wallet
        .new_address("", None)
        .and_then(|addr| wallet.generate_to_address(1, &addr))
        .map_err(|e| {
            error!("Error generating block: {}", e);
            FlowError::at(step)(e)
        })?
        .into_iter()
        .next()
        .ok_or(FlowError::NoBlock)?;
    info!("Generated 1 block to confirm transaction to {}, hash={}", what, hash);
    Ok(hash)
}
