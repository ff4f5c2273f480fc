use tracing::{error, info};
use txchain_rpc::NodeApi;

use crate::error::{FlowError, FlowResult};
use crate::funding;
use crate::inspect::{self, InputEvidence};
use crate::mining;
use crate::report::{Balance, HopMetrics, RunReport};
use crate::scenario::{Party, Scenario};
use crate::spend;
use crate::wallet;

/// Run a scenario end to end against `node` (the node-level endpoint).
///
/// Fatal steps return early; the mining and inspection steps only log.
pub fn run<N: NodeApi>(node: &N, scenario: &Scenario) -> FlowResult<RunReport> {
    let kind = scenario.kind;
    info!("Running {} scenario with wallet {}", kind, scenario.wallet);

    let (wallet, _info) = wallet::provision(node, &scenario.wallet)?;

    let matured =
        mining::mine_to_maturity(&wallet, scenario.maturity_blocks, kind.address_type())?;

    let mut parties = Vec::with_capacity(3);
    for base in ["A", "B", "C"] {
        let label = kind.party_label(base);
        let address = wallet
            .new_address("", Some(kind.address_type()))
            .map_err(FlowError::at(format!("requesting address {label}")))?;
        parties.push(Party { label, address });
    }
    let (a, b, c) = (&parties[0], &parties[1], &parties[2]);
    let prefix = if kind.reports_weight() { "SegWit " } else { "" };
    info!(
        "{}Addresses: {}={}, {}={}, {}={}",
        prefix, a.label, a.address, b.label, b.address, c.label, c.address
    );

    let funding = funding::fund(&wallet, a, scenario.fund_amount, &scenario.fee_fallback)?;

    let first = spend::execute_hop(&wallet, a, b, scenario.first_hop, scenario.hop_fee)?;
    let second = spend::execute_hop(&wallet, b, c, scenario.second_hop, scenario.hop_fee)?;

    let last_hop_inputs = match inspect::hop_evidence(&wallet, &second) {
        Ok(evidence) => {
            log_evidence(&second.label, &evidence);
            evidence
        }
        Err(e) => {
            error!("Error retrieving transaction details: {}", e);
            Vec::new()
        }
    };

    let utxos = wallet
        .list_unspent()
        .map_err(FlowError::at("listing final balances"))?;
    let balances: Vec<Balance> = parties
        .iter()
        .map(|p| Balance {
            label: p.label.clone(),
            address: p.address.clone(),
            amount: inspect::address_balance(&utxos, &p.address),
        })
        .collect();
    info!(
        "Final balances: {}",
        balances
            .iter()
            .map(|b| format!("{}={}", b.label, b.amount))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let metrics = collect_metrics(&wallet, &[&first, &second], kind.reports_weight());

    let report = RunReport {
        scenario: kind,
        wallet: scenario.wallet.clone(),
        mining: matured,
        parties,
        funding,
        hops: vec![first, second],
        last_hop_inputs,
        balances,
        metrics,
    };
    report.log_hex_summary();
    Ok(report)
}

fn log_evidence(label: &str, evidence: &[InputEvidence]) {
    info!("Transaction details {}:", label);
    let pretty = serde_json::to_string_pretty(evidence).unwrap_or_default();
    info!("ScriptSig or witness data from {}: {}", label, pretty);
}

/// Both lookups or neither, like a single inspection step.
fn collect_metrics<N: NodeApi>(
    wallet: &N,
    hops: &[&spend::Hop],
    weight: bool,
) -> Vec<HopMetrics> {
    let looked_up: Result<Vec<HopMetrics>, _> = hops
        .iter()
        .map(|hop| {
            inspect::hop_metrics(wallet, hop).map(|metrics| HopMetrics {
                label: hop.label.clone(),
                metrics,
            })
        })
        .collect();

    match looked_up {
        Ok(all) => {
            for m in &all {
                let tx = &m.metrics;
                if weight {
                    info!(
                        "{} transaction size: {} bytes, vsize: {} virtual bytes",
                        m.label,
                        tx.size,
                        display_opt(tx.vsize)
                    );
                } else {
                    info!("{} transaction size: {} bytes", m.label, tx.size);
                }
            }
            if weight {
                for m in &all {
                    info!(
                        "{} transaction weight: {} weight units",
                        m.label,
                        display_opt(m.metrics.weight)
                    );
                }
            }
            all
        }
        Err(e) => {
            error!("Error retrieving transaction details: {}", e);
            Vec::new()
        }
    }
}

fn display_opt(v: Option<u64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_else(|| "n/a".to_string())
}
