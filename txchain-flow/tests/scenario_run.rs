//! Full scenario runs against an in-memory node that keeps just enough
//! chain state (loaded wallets, mempool, confirmed UTXOs) to answer the
//! calls a scenario makes.

use serde_json::{json, Value};
use std::{cell::RefCell, collections::HashMap, rc::Rc};
use txchain_flow::{run, FlowError, Scenario, ScenarioKind};
use txchain_rpc::{
    AddressType, Amount, FeeStrategy, NodeApi, OutPoint, RpcError, RpcResult, ScriptSig,
    SignedTransaction, SigningIssue, TransactionDetails, TxInput, Unspent, WalletInfo,
};

#[derive(Default)]
struct Chain {
    on_disk: Vec<String>,
    loaded: Vec<String>,
    load_error: Option<(i64, String)>,
    fee_estimation_broken: bool,
    mining_disabled: bool,
    sign_incomplete: bool,
    list_wallets_broken: bool,
    wallet_info_broken: bool,
    send_error: Option<(i64, String)>,
    /// One-block confirmations fail; maturity mining is unaffected.
    confirm_broken: bool,
    confirm_yields_nothing: bool,
    /// Broadcast transactions lose their payment output (vout 0).
    payments_vanish: bool,
    signed_hex_garbled: bool,
    lookups_broken: bool,

    counter: u64,
    height: u64,
    segwit_addresses: Vec<String>,
    confirmed: Vec<Unspent>,
    mempool: Vec<Unspent>,
    pending: Vec<String>,
    drafts: HashMap<String, (Vec<OutPoint>, Vec<(String, Amount)>)>,
    spends: HashMap<String, Vec<(OutPoint, String)>>,
    mined_in: HashMap<String, String>,

    fee_strategies: Vec<FeeStrategy>,
    broadcasts: usize,
}

impl Chain {
    fn next(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{prefix}{:04}", self.counter)
    }

    fn mine(&mut self, blocks: u32) -> Vec<String> {
        let mut hashes = Vec::new();
        for _ in 0..blocks {
            self.height += 1;
            let hash = format!("{:064x}", self.height);
            for txid in self.pending.drain(..) {
                self.mined_in.insert(txid, hash.clone());
            }
            for mut utxo in self.mempool.drain(..) {
                utxo.confirmations = 1;
                self.confirmed.push(utxo);
            }
            hashes.push(hash);
        }
        hashes
    }
}

fn node_error(code: i64, message: &str) -> RpcError {
    RpcError::Node {
        code,
        message: message.to_string(),
    }
}

#[derive(Clone)]
struct ScriptedNode {
    chain: Rc<RefCell<Chain>>,
    wallet: Option<String>,
}

impl ScriptedNode {
    fn new(chain: Chain) -> Self {
        Self {
            chain: Rc::new(RefCell::new(chain)),
            wallet: None,
        }
    }

    fn require_wallet(&self) -> RpcResult<()> {
        match &self.wallet {
            Some(name) if self.chain.borrow().loaded.contains(name) => Ok(()),
            Some(_) => Err(node_error(-18, "Requested wallet does not exist or is not loaded")),
            None => Err(node_error(-19, "Wallet file not specified")),
        }
    }
}

impl NodeApi for ScriptedNode {
    fn for_wallet(&self, name: &str) -> RpcResult<Self> {
        Ok(Self {
            chain: Rc::clone(&self.chain),
            wallet: Some(name.to_string()),
        })
    }

    fn list_wallets(&self) -> RpcResult<Vec<String>> {
        if self.chain.borrow().list_wallets_broken {
            return Err(node_error(-28, "Loading wallet..."));
        }
        Ok(self.chain.borrow().loaded.clone())
    }

    fn load_wallet(&self, name: &str) -> RpcResult<()> {
        let mut chain = self.chain.borrow_mut();
        if let Some((code, message)) = &chain.load_error {
            return Err(node_error(*code, message));
        }
        if chain.loaded.iter().any(|w| w == name) {
            return Err(node_error(-35, &format!("Wallet \"{name}\" is already loaded.")));
        }
        if !chain.on_disk.iter().any(|w| w == name) {
            return Err(node_error(-18, "Wallet file not found."));
        }
        chain.loaded.push(name.to_string());
        Ok(())
    }

    fn create_wallet(&self, name: &str) -> RpcResult<()> {
        let mut chain = self.chain.borrow_mut();
        if chain.on_disk.iter().any(|w| w == name) {
            return Err(node_error(-4, "Wallet file verification failed. Database already exists."));
        }
        chain.on_disk.push(name.to_string());
        chain.loaded.push(name.to_string());
        Ok(())
    }

    fn wallet_info(&self) -> RpcResult<WalletInfo> {
        self.require_wallet()?;
        if self.chain.borrow().wallet_info_broken {
            return Err(node_error(-4, "Wallet is currently rescanning. Abort existing rescan or wait."));
        }
        Ok(WalletInfo {
            walletname: self.wallet.clone().unwrap_or_default(),
            txcount: Some(0),
            balance: None,
        })
    }

    fn new_address(&self, _label: &str, kind: Option<AddressType>) -> RpcResult<String> {
        self.require_wallet()?;
        let mut chain = self.chain.borrow_mut();
        Ok(match kind {
            Some(AddressType::Legacy) => chain.next("m"),
            Some(AddressType::P2shSegwit) => {
                let addr = chain.next("2N");
                chain.segwit_addresses.push(addr.clone());
                addr
            }
            Some(AddressType::Bech32) | None => chain.next("bcrt1q"),
        })
    }

    fn generate_to_address(&self, blocks: u32, _address: &str) -> RpcResult<Vec<String>> {
        self.require_wallet()?;
        let mut chain = self.chain.borrow_mut();
        if chain.mining_disabled && blocks > 1 {
            return Err(node_error(-32601, "Method not found"));
        }
        if blocks == 1 && chain.confirm_broken {
            return Err(node_error(-1, "Cannot generate block: no connection"));
        }
        if blocks == 1 && chain.confirm_yields_nothing {
            return Ok(Vec::new());
        }
        Ok(chain.mine(blocks))
    }

    fn balance(&self) -> RpcResult<Amount> {
        self.require_wallet()?;
        let mature = self.chain.borrow().height.saturating_sub(100);
        Ok(Amount::from_sat(mature * 5_000_000_000))
    }

    fn send_to_address(&self, address: &str, amount: Amount, fee: &FeeStrategy) -> RpcResult<String> {
        self.require_wallet()?;
        let mut chain = self.chain.borrow_mut();
        chain.fee_strategies.push(fee.clone());
        if let Some((code, message)) = &chain.send_error {
            return Err(node_error(*code, message));
        }
        if chain.fee_estimation_broken && *fee == FeeStrategy::Estimate {
            return Err(node_error(
                -4,
                "Fee estimation failed. Fallbackfee is disabled. Wait a few blocks or enable -fallbackfee.",
            ));
        }
        let txid = chain.next("fund");
        chain.mempool.push(Unspent {
            txid: txid.clone(),
            vout: 0,
            address: Some(address.to_string()),
            label: None,
            amount,
            confirmations: 0,
        });
        chain.pending.push(txid.clone());
        Ok(txid)
    }

    fn raw_transaction_hex(&self, txid: &str) -> RpcResult<String> {
        Ok(format!("0200000001{}", txid.len()))
    }

    fn transaction_details(&self, txid: &str, block_hash: Option<&str>) -> RpcResult<TransactionDetails> {
        let chain = self.chain.borrow();
        if chain.lookups_broken {
            return Err(node_error(-5, "No such mempool or blockchain transaction."));
        }
        let mined = chain.mined_in.get(txid);
        if block_hash.is_some() && mined.map(String::as_str) != block_hash {
            return Err(node_error(-5, "No such transaction found in the provided block."));
        }
        let spent = chain
            .spends
            .get(txid)
            .ok_or_else(|| node_error(-5, "No such mempool or blockchain transaction."))?;

        let segwit = spent
            .iter()
            .any(|(_, addr)| chain.segwit_addresses.contains(addr));
        let vin = spent
            .iter()
            .map(|(op, addr)| {
                let witness_input = chain.segwit_addresses.contains(addr);
                TxInput {
                    txid: Some(op.txid.clone()),
                    vout: Some(op.vout),
                    coinbase: None,
                    script_sig: Some(if witness_input {
                        ScriptSig {
                            asm: "0014c0ffee".into(),
                            hex: "160014c0ffee".into(),
                        }
                    } else {
                        ScriptSig {
                            asm: "3044[ALL] 02ab".into(),
                            hex: "473044".into(),
                        }
                    }),
                    txinwitness: witness_input
                        .then(|| vec!["30440220aa01".to_string(), "02ab".to_string()]),
                    sequence: 4_294_967_293,
                }
            })
            .collect();
        let (size, vsize, weight) = if segwit { (247, 166, 661) } else { (225, 225, 900) };
        Ok(TransactionDetails {
            txid: txid.to_string(),
            hash: None,
            size,
            vsize: Some(vsize),
            weight: Some(weight),
            vin,
            blockhash: mined.cloned(),
            confirmations: Some(1),
        })
    }

    fn list_unspent(&self) -> RpcResult<Vec<Unspent>> {
        self.require_wallet()?;
        Ok(self.chain.borrow().confirmed.clone())
    }

    fn create_raw_transaction(
        &self,
        inputs: &[OutPoint],
        outputs: &[(String, Amount)],
    ) -> RpcResult<String> {
        let mut chain = self.chain.borrow_mut();
        chain.counter += 1;
        let hex = format!("0200{:04x}", chain.counter);
        chain
            .drafts
            .insert(hex.clone(), (inputs.to_vec(), outputs.to_vec()));
        Ok(hex)
    }

    fn decode_raw_transaction(&self, hex: &str) -> RpcResult<Value> {
        let chain = self.chain.borrow();
        let (inputs, outputs) = chain
            .drafts
            .get(hex)
            .ok_or_else(|| node_error(-22, "TX decode failed"))?;
        Ok(json!({ "vin": inputs, "vout": outputs }))
    }

    fn sign_raw_transaction_with_wallet(&self, hex: &str) -> RpcResult<SignedTransaction> {
        self.require_wallet()?;
        let mut chain = self.chain.borrow_mut();
        let draft = chain
            .drafts
            .get(hex)
            .cloned()
            .ok_or_else(|| node_error(-22, "TX decode failed"))?;
        if chain.sign_incomplete {
            return Ok(SignedTransaction {
                hex: hex.to_string(),
                complete: false,
                errors: vec![SigningIssue {
                    txid: draft.0[0].txid.clone(),
                    vout: draft.0[0].vout,
                    error: "Unable to sign input, missing key".into(),
                }],
            });
        }
        let signed = if chain.signed_hex_garbled {
            format!("{hex}zz")
        } else {
            format!("{hex}ff")
        };
        chain.drafts.insert(signed.clone(), draft);
        Ok(SignedTransaction {
            hex: signed,
            complete: true,
            errors: Vec::new(),
        })
    }

    fn send_raw_transaction(&self, hex: &str) -> RpcResult<String> {
        let mut chain = self.chain.borrow_mut();
        let (inputs, outputs) = chain
            .drafts
            .get(hex)
            .cloned()
            .ok_or_else(|| node_error(-22, "TX decode failed"))?;

        let mut spent = Vec::new();
        let mut total_in = Amount::ZERO;
        for op in &inputs {
            let pos = chain
                .confirmed
                .iter()
                .position(|u| u.txid == op.txid && u.vout == op.vout)
                .ok_or_else(|| node_error(-25, "bad-txns-inputs-missingorspent"))?;
            let utxo = chain.confirmed.remove(pos);
            total_in = total_in.checked_add(utxo.amount).unwrap_or(total_in);
            spent.push((op.clone(), utxo.address.unwrap_or_default()));
        }
        let total_out: Amount = outputs.iter().map(|(_, a)| *a).sum();
        if total_out > total_in {
            return Err(node_error(-26, "bad-txns-in-belowout"));
        }

        let txid = chain.next("tx");
        for (vout, (address, amount)) in outputs.into_iter().enumerate() {
            if vout == 0 && chain.payments_vanish {
                continue;
            }
            chain.mempool.push(Unspent {
                txid: txid.clone(),
                vout: vout as u32,
                address: Some(address),
                label: None,
                amount,
                confirmations: 0,
            });
        }
        chain.spends.insert(txid.clone(), spent);
        chain.pending.push(txid.clone());
        chain.broadcasts += 1;
        Ok(txid)
    }
}

fn btc(s: &str) -> Amount {
    s.parse().unwrap()
}

#[test]
fn legacy_chain_end_to_end() {
    let node = ScriptedNode::new(Chain::default());
    let scenario = Scenario::new(ScenarioKind::Legacy, "mywallet-5");

    let report = run(&node, &scenario).unwrap();

    let chain = node.chain.borrow();
    assert_eq!(chain.loaded, vec!["mywallet-5"]);
    assert_eq!(chain.fee_strategies, vec![FeeStrategy::Estimate]);
    assert_eq!(chain.broadcasts, 2);
    assert_eq!(
        chain.mined_in.get(&report.funding.txid),
        Some(&report.funding.block_hash)
    );
    assert_eq!(report.funding.block_hash, format!("{:064x}", 102));

    let mining = report.mining.as_ref().expect("mined");
    assert_eq!(mining.blocks, 101);

    let labels: Vec<_> = report.hops.iter().map(|h| h.label.as_str()).collect();
    assert_eq!(labels, ["A->B", "B->C"]);
    assert!(report.parties.iter().all(|p| p.address.starts_with('m')));

    assert_eq!(report.balance_of("A"), Some(btc("0.49999")));
    assert_eq!(report.balance_of("B"), Some(btc("0.19999")));
    assert_eq!(report.balance_of("C"), Some(btc("0.3")));

    let ab = report.hop("A->B").unwrap();
    assert_eq!(ab.plan.change, btc("0.49999"));
    assert_eq!(ab.signed_hex, format!("{}ff", ab.unsigned_hex));

    assert_eq!(report.last_hop_inputs.len(), 1);
    let input = &report.last_hop_inputs[0];
    assert!(input.witness.is_none());
    assert_eq!(input.input, format!("{}:0", ab.txid));
    assert_eq!(input.script_sig.as_ref().map(|s| s.hex.as_str()), Some("473044"));

    assert_eq!(report.metrics.len(), 2);
    assert_eq!(report.metrics[0].metrics.size, 225);
}

#[test]
fn segwit_chain_reuses_already_loaded_wallet() {
    let chain = Chain {
        on_disk: vec!["my_segwit_wallet-2".into()],
        loaded: vec!["my_segwit_wallet-2".into()],
        ..Chain::default()
    };
    let node = ScriptedNode::new(chain);
    let scenario = Scenario::new(ScenarioKind::Segwit, "my_segwit_wallet-2");

    let report = run(&node, &scenario).unwrap();

    let labels: Vec<_> = report.parties.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, ["A'", "B'", "C'"]);
    assert!(report.parties.iter().all(|p| p.address.starts_with("2N")));

    let witness = report.last_hop_inputs[0].witness.as_ref().expect("witness");
    assert_eq!(witness.len(), 2);
    assert_eq!(report.metrics[1].label, "B'->C'");
    assert_eq!(report.metrics[1].metrics.vsize, Some(166));
    assert_eq!(report.metrics[1].metrics.weight, Some(661));
    assert_eq!(report.balance_of("C'"), Some(btc("0.3")));
}

#[test]
fn fee_estimation_failure_retries_with_fallback() {
    let node = ScriptedNode::new(Chain {
        fee_estimation_broken: true,
        ..Chain::default()
    });
    let scenario = Scenario::new(ScenarioKind::Legacy, "w");

    let report = run(&node, &scenario).unwrap();

    assert_eq!(report.funding.fee, scenario.fee_fallback);
    assert_eq!(
        node.chain.borrow().fee_strategies,
        vec![FeeStrategy::Estimate, scenario.fee_fallback.clone()]
    );
}

#[test]
fn fallback_that_also_fails_is_fatal() {
    let node = ScriptedNode::new(Chain {
        fee_estimation_broken: true,
        ..Chain::default()
    });
    let mut scenario = Scenario::new(ScenarioKind::Segwit, "w");
    scenario.fee_fallback = FeeStrategy::Estimate;

    let err = run(&node, &scenario).unwrap_err();
    assert!(matches!(err, FlowError::FundingRetry(ref e) if e.is_fee_estimation_failure()));
    assert_eq!(node.chain.borrow().broadcasts, 0);
}

#[test]
fn unrelated_load_error_is_fatal() {
    let node = ScriptedNode::new(Chain {
        loaded: vec!["w".into()],
        load_error: Some((-4, "Wallet file verification failed.".into())),
        ..Chain::default()
    });
    let err = run(&node, &Scenario::new(ScenarioKind::Legacy, "w")).unwrap_err();
    match err {
        FlowError::Rpc { step, source } => {
            assert_eq!(step, "loading wallet w");
            assert_eq!(source.code(), Some(-4));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn incomplete_signature_stops_before_broadcast() {
    let node = ScriptedNode::new(Chain {
        sign_incomplete: true,
        ..Chain::default()
    });
    let err = run(&node, &Scenario::new(ScenarioKind::Legacy, "w")).unwrap_err();
    match err {
        FlowError::Unsigned { label, detail } => {
            assert_eq!(label, "A->B");
            assert!(detail.contains("missing key"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(node.chain.borrow().broadcasts, 0);
}

#[test]
fn refused_mining_is_only_a_warning() {
    let node = ScriptedNode::new(Chain {
        mining_disabled: true,
        ..Chain::default()
    });
    let report = run(&node, &Scenario::new(ScenarioKind::Legacy, "w")).unwrap();
    assert!(report.mining.is_none());
    assert_eq!(report.hops.len(), 2);
}

#[test]
fn second_hop_larger_than_its_utxo_is_rejected() {
    let node = ScriptedNode::new(Chain::default());
    let mut scenario = Scenario::new(ScenarioKind::Legacy, "w");
    scenario.second_hop = btc("0.5");

    let err = run(&node, &scenario).unwrap_err();
    match err {
        FlowError::InsufficientFunds { label, available, .. } => {
            assert_eq!(label, "B->C");
            assert_eq!(available, btc("0.5"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(node.chain.borrow().broadcasts, 1);
}

fn failed_step(err: FlowError) -> (String, RpcError) {
    match err {
        FlowError::Rpc { step, source } => (step, source),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn wallet_listing_creation_and_connection_failures_are_fatal() {
    let broken_listing = ScriptedNode::new(Chain {
        list_wallets_broken: true,
        ..Chain::default()
    });
    let (step, source) = failed_step(
        run(&broken_listing, &Scenario::new(ScenarioKind::Legacy, "w")).unwrap_err(),
    );
    assert_eq!(step, "listing wallets");
    assert_eq!(source.code(), Some(-28));

    // On disk but not loaded, so creation is attempted and refused.
    let unloaded = ScriptedNode::new(Chain {
        on_disk: vec!["w".into()],
        ..Chain::default()
    });
    let (step, source) =
        failed_step(run(&unloaded, &Scenario::new(ScenarioKind::Legacy, "w")).unwrap_err());
    assert_eq!(step, "creating wallet w");
    assert_eq!(source.code(), Some(-4));

    let rescanning = ScriptedNode::new(Chain {
        wallet_info_broken: true,
        ..Chain::default()
    });
    let (step, _) =
        failed_step(run(&rescanning, &Scenario::new(ScenarioKind::Segwit, "w")).unwrap_err());
    assert_eq!(step, "connecting to wallet w");
    assert!(rescanning.chain.borrow().fee_strategies.is_empty());
}

#[test]
fn non_fee_funding_error_is_fatal_without_retry() {
    let node = ScriptedNode::new(Chain {
        send_error: Some((-6, "Insufficient funds".into())),
        ..Chain::default()
    });
    let (step, source) =
        failed_step(run(&node, &Scenario::new(ScenarioKind::Legacy, "w")).unwrap_err());
    assert_eq!(step, "funding address A");
    assert_eq!(source.code(), Some(-6));

    let chain = node.chain.borrow();
    assert_eq!(chain.fee_strategies, vec![FeeStrategy::Estimate]);
    assert_eq!(chain.broadcasts, 0);
}

#[test]
fn failed_confirmation_block_is_fatal() {
    let node = ScriptedNode::new(Chain {
        confirm_broken: true,
        ..Chain::default()
    });
    let (step, source) =
        failed_step(run(&node, &Scenario::new(ScenarioKind::Legacy, "w")).unwrap_err());
    assert_eq!(step, "confirming transaction to A");
    assert_eq!(source.code(), Some(-1));
    assert_eq!(node.chain.borrow().broadcasts, 0);
}

#[test]
fn confirmation_without_block_hash_is_fatal() {
    let node = ScriptedNode::new(Chain {
        confirm_yields_nothing: true,
        ..Chain::default()
    });
    let err = run(&node, &Scenario::new(ScenarioKind::Segwit, "w")).unwrap_err();
    assert!(matches!(err, FlowError::NoBlock), "unexpected error: {err}");
}

#[test]
fn missing_utxo_for_second_hop_is_fatal() {
    let node = ScriptedNode::new(Chain {
        payments_vanish: true,
        ..Chain::default()
    });
    let err = run(&node, &Scenario::new(ScenarioKind::Legacy, "w")).unwrap_err();
    match err {
        FlowError::NoUtxo(label) => assert_eq!(label, "B"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(node.chain.borrow().broadcasts, 1);
}

#[test]
fn malformed_signed_hex_is_never_broadcast() {
    let node = ScriptedNode::new(Chain {
        signed_hex_garbled: true,
        ..Chain::default()
    });
    let err = run(&node, &Scenario::new(ScenarioKind::Legacy, "w")).unwrap_err();
    match err {
        FlowError::BadHex { label, .. } => assert_eq!(label, "A->B"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(node.chain.borrow().broadcasts, 0);
}

#[test]
fn failed_inspection_lookups_only_log() {
    let node = ScriptedNode::new(Chain {
        lookups_broken: true,
        ..Chain::default()
    });
    let report = run(&node, &Scenario::new(ScenarioKind::Segwit, "w")).unwrap();

    assert!(report.last_hop_inputs.is_empty());
    assert!(report.metrics.is_empty());
    assert_eq!(report.hops.len(), 2);
    assert_eq!(report.balances.len(), 3);
    assert_eq!(report.balance_of("C'"), Some(btc("0.3")));
}
