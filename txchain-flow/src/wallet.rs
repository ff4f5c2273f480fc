use tracing::{error, info};
use txchain_rpc::{NodeApi, RpcError, WalletInfo};

use crate::error::{FlowError, FlowResult};

/// Load `name` if the node knows it, create it otherwise, then return a
/// handle bound to the wallet endpoint.
pub fn provision<N: NodeApi>(node: &N, name: &str) -> FlowResult<(N, WalletInfo)> {
    let existing = node.list_wallets().map_err(|e| {
        error!("Error listing wallets: {}", e);
        FlowError::at("listing wallets")(e)
    })?;
    info!("Existing wallets: {:?}", existing);

    if existing.iter().any(|w| w == name) {
        match node.load_wallet(name) {
            Ok(()) => info!("Loaded existing wallet: {}", name),
            Err(e) if e.is_already_loaded() => info!("Wallet already loaded"),
            Err(e) => {
                error!("Error loading wallet: {}", e);
                return Err(FlowError::at(format!("loading wallet {name}"))(e));
            }
        }
    } else {
        node.create_wallet(name).map_err(|e| {
            error!("Error creating wallet: {}", e);
            FlowError::at(format!("creating wallet {name}"))(e)
        })?;
        info!("Created new wallet: {}", name);
    }

    let connect = |e: RpcError| {
        error!("Failed to connect to wallet: {}", e);
        FlowError::at(format!("connecting to wallet {name}"))(e)
    };
    let wallet = node.for_wallet(name).map_err(connect)?;
    let info = wallet.wallet_info().map_err(connect)?;
    info!("Successfully connected to wallet: {}", info.walletname);
    Ok((wallet, info))
}
