use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path, path::PathBuf, time::Duration};
use tracing::warn;
use txchain_flow::scenario::{
    DEFAULT_FALLBACK_FEE_RATE, DEFAULT_FIRST_HOP, DEFAULT_FUND_AMOUNT, DEFAULT_HOP_FEE,
    DEFAULT_MATURITY_BLOCKS, DEFAULT_SECOND_HOP,
};
use txchain_flow::{Scenario, ScenarioKind};
use txchain_rpc::{Amount, Auth, FeeStrategy};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcSettings {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Takes precedence over user/password when set.
    pub cookie_file: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            user: None,
            password: None,
            cookie_file: None,
            timeout_secs: 30,
        }
    }
}

impl RpcSettings {
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn auth(&self) -> Auth {
        if let Some(path) = &self.cookie_file {
            return Auth::CookieFile(path.clone());
        }
        match (&self.user, &self.password) {
            (Some(user), password) => Auth::UserPass {
                user: user.clone(),
                password: password.clone().unwrap_or_default(),
            },
            (None, _) => Auth::None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rpc: RpcSettings,
    pub legacy_wallet: String,
    pub segwit_wallet: String,
    pub maturity_blocks: u32,
    pub fund_amount: Amount,
    pub first_hop: Amount,
    pub second_hop: Amount,
    pub hop_fee: Amount,
    pub fee_fallback: FeeStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcSettings::default(),
            legacy_wallet: "mywallet-5".to_string(),
            segwit_wallet: "my_segwit_wallet-2".to_string(),
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

impl Config {
    pub fn scenario(&self, kind: ScenarioKind, wallet: Option<String>) -> Scenario {
        let wallet = wallet.unwrap_or_else(|| match kind {
            ScenarioKind::Legacy => self.legacy_wallet.clone(),
            ScenarioKind::Segwit => self.segwit_wallet.clone(),
        });
        Scenario {
            maturity_blocks: self.maturity_blocks,
            fund_amount: self.fund_amount,
            first_hop: self.first_hop,
            second_hop: self.second_hop,
            hop_fee: self.hop_fee,
            fee_fallback: self.fee_fallback.clone(),
            ..Scenario::new(kind, wallet)
        }
    }

    /// Copy safe to print.
    pub fn masked(&self) -> Self {
        let mut out = self.clone();
        if out.rpc.password.is_some() {
            out.rpc.password = Some("********".to_string());
        }
        out
    }
}

/* ---------- Local storage ---------- */

pub fn txchain_dir() -> PathBuf {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    home.join(".txchain")
}

pub fn default_config_path() -> PathBuf {
    txchain_dir().join("config.json")
}

/// Missing file means defaults; an unreadable one is reported and ignored.
pub fn load_config(path: &Path) -> Config {
    let s = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Config::default(),
        Err(e) => {
            warn!("Ignoring unreadable config {}: {}", path.display(), e);
            return Config::default();
        }
    };
    match serde_json::from_str(&s) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Ignoring malformed config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

pub fn save_config(path: &Path, cfg: &Config) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    fs::write(path, serde_json::to_string_pretty(cfg)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
