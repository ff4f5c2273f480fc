//! Wire types exchanged with the node.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, iter::Sum, str::FromStr};
use thiserror::Error;

pub const SATS_PER_BTC: u64 = 100_000_000;

/// BTC amount held as whole satoshis.
///
/// The node reports amounts as JSON numbers; we send them back as
/// 8-decimal strings so no float rounding reaches a transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseAmountError {
    #[error("empty amount")]
    Empty,
    #[error("invalid digit in amount `{0}`")]
    InvalidDigit(String),
    #[error("amount `{0}` has more than 8 decimal places")]
    TooPrecise(String),
    #[error("amount `{0}` overflows")]
    Overflow(String),
}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_sat(sat: u64) -> Self {
        Amount(sat)
    }

    pub const fn to_sat(self) -> u64 {
        self.0
    }

    /// Converts a node-reported float. Negative or non-finite values are rejected.
    pub fn from_btc(btc: f64) -> Option<Self> {
        if !btc.is_finite() || btc < 0.0 {
            return None;
        }
        let sats = (btc * SATS_PER_BTC as f64).round();
        if sats > u64::MAX as f64 {
            return None;
        }
        Some(Amount(sats as u64))
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:08}", self.0 / SATS_PER_BTC, self.0 % SATS_PER_BTC)
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseAmountError::Empty);
        }
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        let digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !digits(whole) || !digits(frac) {
            return Err(ParseAmountError::InvalidDigit(s.to_string()));
        }
        if frac.len() > 8 {
            return Err(ParseAmountError::TooPrecise(s.to_string()));
        }
        let overflow = || ParseAmountError::Overflow(s.to_string());
        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let frac: u64 = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<8}").parse().map_err(|_| overflow())?
        };
        whole
            .checked_mul(SATS_PER_BTC)
            .and_then(|w| w.checked_add(frac))
            .map(Amount)
            .ok_or_else(overflow)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        Amount(iter.map(|a| a.0).sum())
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Amount::from_btc(n)
                .ok_or_else(|| de::Error::custom(format!("invalid amount {n}"))),
            Raw::Text(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

/// Address flavours accepted by `getnewaddress`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressType {
    Legacy,
    P2shSegwit,
    Bech32,
}

impl AddressType {
    pub fn as_str(self) -> &'static str {
        match self {
            AddressType::Legacy => "legacy",
            AddressType::P2shSegwit => "p2sh-segwit",
            AddressType::Bech32 => "bech32",
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(AddressType::Legacy),
            "p2sh-segwit" => Ok(AddressType::P2shSegwit),
            "bech32" => Ok(AddressType::Bech32),
            other => Err(format!("unknown address type `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateMode {
    Unset,
    Economical,
    Conservative,
}

impl EstimateMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EstimateMode::Unset => "unset",
            EstimateMode::Economical => "economical",
            EstimateMode::Conservative => "conservative",
        }
    }
}

/// How `sendtoaddress` should pick its fee.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum FeeStrategy {
    /// Leave it to the node's estimator.
    Estimate,
    ConfTarget { blocks: u32, mode: EstimateMode },
    FeeRate { sat_per_vbyte: f64 },
}

impl fmt::Display for FeeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeeStrategy::Estimate => f.write_str("node estimate"),
            FeeStrategy::ConfTarget { blocks, mode } => {
                write!(f, "conf_target={blocks} ({})", mode.as_str())
            }
            FeeStrategy::FeeRate { sat_per_vbyte } => write!(f, "{sat_per_vbyte} sat/vB"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalletInfo {
    pub walletname: String,
    #[serde(default)]
    pub txcount: Option<u64>,
    #[serde(default)]
    pub balance: Option<Amount>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: String,
    pub vout: u32,
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// One `listunspent` entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Unspent {
    pub txid: String,
    pub vout: u32,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    pub amount: Amount,
    #[serde(default)]
    pub confirmations: u64,
}

impl Unspent {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            txid: self.txid.clone(),
            vout: self.vout,
        }
    }

    pub fn pays_to(&self, address: &str) -> bool {
        self.address.as_deref() == Some(address)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SigningIssue {
    #[serde(default)]
    pub txid: String,
    #[serde(default)]
    pub vout: u32,
    #[serde(default)]
    pub error: String,
}

/// Result of `signrawtransactionwithwallet`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub hex: String,
    pub complete: bool,
    #[serde(default)]
    pub errors: Vec<SigningIssue>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSig {
    pub asm: String,
    pub hex: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxInput {
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub vout: Option<u32>,
    #[serde(default)]
    pub coinbase: Option<String>,
    #[serde(rename = "scriptSig", default)]
    pub script_sig: Option<ScriptSig>,
    #[serde(default)]
    pub txinwitness: Option<Vec<String>>,
    #[serde(default)]
    pub sequence: u64,
}

impl TxInput {
    /// `txid:vout`, or `coinbase` for a generation input.
    pub fn outpoint_label(&self) -> String {
        match (&self.txid, self.vout) {
            (Some(txid), Some(vout)) => format!("{txid}:{vout}"),
            _ => "coinbase".to_string(),
        }
    }
}

/// Verbose `getrawtransaction` / `decoderawtransaction` fields we read.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionDetails {
    pub txid: String,
    #[serde(default)]
    pub hash: Option<String>,
    pub size: u64,
    #[serde(default)]
    pub vsize: Option<u64>,
    #[serde(default)]
    pub weight: Option<u64>,
    #[serde(default)]
    pub vin: Vec<TxInput>,
    #[serde(default)]
    pub blockhash: Option<String>,
    #[serde(default)]
    pub confirmations: Option<u64>,
}
