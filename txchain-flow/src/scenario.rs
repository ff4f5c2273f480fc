//! Scenario parameters: which address flavour to exercise and with what amounts.

use serde::{Deserialize, Serialize};
use std::fmt;
use txchain_rpc::{AddressType, Amount, FeeStrategy, SATS_PER_BTC};

pub const DEFAULT_MATURITY_BLOCKS: u32 = 101;
pub const DEFAULT_FUND_AMOUNT: Amount = Amount::from_sat(SATS_PER_BTC);
pub const DEFAULT_FIRST_HOP: Amount = Amount::from_sat(50_000_000);
pub const DEFAULT_SECOND_HOP: Amount = Amount::from_sat(30_000_000);
pub const DEFAULT_HOP_FEE: Amount = Amount::from_sat(1_000);
pub const DEFAULT_FALLBACK_FEE_RATE: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    Legacy,
    Segwit,
}

impl ScenarioKind {
    pub fn name(self) -> &'static str {
        match self {
            ScenarioKind::Legacy => "legacy",
            ScenarioKind::Segwit => "segwit",
        }
    }

    pub fn address_type(self) -> AddressType {
        match self {
            ScenarioKind::Legacy => AddressType::Legacy,
            ScenarioKind::Segwit => AddressType::P2shSegwit,
        }
    }

    /// Segwit parties are primed: A', B', C'.
    pub fn party_label(self, base: &str) -> String {
        match self {
            ScenarioKind::Legacy => base.to_string(),
            ScenarioKind::Segwit => format!("{base}'"),
        }
    }

    /// vsize and weight only differ from size once witness data is involved.
    pub fn reports_weight(self) -> bool {
        matches!(self, ScenarioKind::Segwit)
    }

    pub fn summary_header(self) -> &'static str {
        match self {
            ScenarioKind::Legacy => "----- RAW TRANSACTION HEX SUMMARY -----",
            ScenarioKind::Segwit => "----- RAW TRANSACTION HEX SUMMARY (SEGWIT) -----",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub wallet: String,
    pub maturity_blocks: u32,
    pub fund_amount: Amount,
    pub first_hop: Amount,
    pub second_hop: Amount,
    pub hop_fee: Amount,
    /// Used once if the node cannot estimate a fee for the funding payment.
    pub fee_fallback: FeeStrategy,
}

impl Scenario {
    pub fn new(kind: ScenarioKind, wallet: impl Into<String>) -> Self {
        Self {
            kind,
            wallet: wallet.into(),
            maturity_blocks: DEFAULT_MATURITY_BLOCKS,
            fund_amount: DEFAULT_FUND_AMOUNT,
            first_hop: DEFAULT_FIRST_HOP,
            second_hop: DEFAULT_SECOND_HOP,
            hop_fee: DEFAULT_HOP_FEE,
            fee_fallback: FeeStrategy::FeeRate {
                sat_per_vbyte: DEFAULT_FALLBACK_FEE_RATE,
            },
        }
    }
}

/// A labelled wallet address taking part in the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub label: String,
    pub address: String,
}

/// Label for a payment between two parties, e.g. `A'->B'`.
pub fn hop_label(from: &Party, to: &Party) -> String {
    format!("{}->{}", from.label, to.label)
}
