//! txchain-flow: scripted wallet scenarios against a regtest node.
//!
//! A scenario provisions a wallet, mines to maturity, funds address A and
//! then chains two raw-transaction payments A->B->C, logging every artefact
//! the node hands back. All signing, fee and UTXO work is the node's; this
//! crate only sequences the calls and decides which failures are fatal.

pub mod error;
pub mod funding;
pub mod inspect;
pub mod mining;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod spend;
pub mod wallet;

pub use error::{FlowError, FlowResult};
pub use report::RunReport;
pub use runner::run;
pub use scenario::{Party, Scenario, ScenarioKind};
