use serde::Serialize;
use tracing::info;
use txchain_rpc::Amount;

use crate::funding::Funding;
use crate::inspect::{InputEvidence, TxMetrics};
use crate::mining::MiningOutcome;
use crate::scenario::{Party, ScenarioKind};
use crate::spend::Hop;

#[derive(Clone, Debug, Serialize)]
pub struct Balance {
    pub label: String,
    pub address: String,
    pub amount: Amount,
}

#[derive(Clone, Debug, Serialize)]
pub struct HopMetrics {
    pub label: String,
    #[serde(flatten)]
    pub metrics: TxMetrics,
}

/// Everything a scenario run produced, in the order it happened.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub scenario: ScenarioKind,
    pub wallet: String,
    pub mining: Option<MiningOutcome>,
    pub parties: Vec<Party>,
    pub funding: Funding,
    pub hops: Vec<Hop>,
    /// Unlocking data of the last hop's inputs; empty if the lookup failed.
    pub last_hop_inputs: Vec<InputEvidence>,
    pub balances: Vec<Balance>,
    /// Empty if the lookup failed.
    pub metrics: Vec<HopMetrics>,
}

impl RunReport {
    pub fn hop(&self, label: &str) -> Option<&Hop> {
        self.hops.iter().find(|h| h.label == label)
    }

    pub fn balance_of(&self, label: &str) -> Option<Amount> {
        self.balances
            .iter()
            .find(|b| b.label == label)
            .map(|b| b.amount)
    }

    pub fn log_hex_summary(&self) {
        info!("{}", self.scenario.summary_header());
        for hop in &self.hops {
            info!("Transaction {} (unsigned): {}", hop.label, hop.unsigned_hex);
            info!("Transaction {} (signed): {}", hop.label, hop.signed_hex);
        }
    }
}
