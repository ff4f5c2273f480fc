use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::{fs, path::Path, path::PathBuf, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use txchain_flow::{RunReport, ScenarioKind};
use txchain_rpc::RpcClient;

mod config;

use config::{default_config_path, load_config, save_config, Config};

#[derive(Parser)]
#[command(
    name = "txchain",
    version,
    about = "Build, sign and broadcast chained A->B->C transactions on a regtest wallet node"
)]
struct Cli {
    /// Config file (default: ~/.txchain/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true, env = "TXCHAIN_RPC_HOST")]
    host: Option<String>,
    #[arg(long, global = true, env = "TXCHAIN_RPC_PORT")]
    port: Option<u16>,
    #[arg(long, global = true, env = "TXCHAIN_RPC_USER")]
    user: Option<String>,
    #[arg(long, global = true, env = "TXCHAIN_RPC_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Node cookie file, used instead of user/password
    #[arg(long, global = true, env = "TXCHAIN_RPC_COOKIE")]
    cookie: Option<PathBuf>,
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// tracing filter, e.g. `debug` or `txchain_rpc=debug,info` (default: RUST_LOG, then info)
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Legacy (P2PKH) chain A->B->C
    Legacy(RunArgs),
    /// P2SH-wrapped segwit chain A'->B'->C'
    Segwit(RunArgs),
    /// Legacy, then segwit; stops at the first failure
    All {
        /// Writes legacy.json and segwit.json here
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },
    /// Write the effective configuration to the config file
    InitConfig {
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration (password masked)
    ShowConfig,
}

#[derive(Args)]
struct RunArgs {
    /// Wallet to load or create (default from config)
    #[arg(long)]
    wallet: Option<String>,
    /// Write the run report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(l) => EnvFilter::new(l),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn dispatch(cli: Cli) -> Result<()> {
    let path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut cfg = load_config(&path);
    apply_overrides(&mut cfg, &cli);

    match cli.cmd {
        Cmd::Legacy(args) => cmd_run(&cfg, ScenarioKind::Legacy, &args),
        Cmd::Segwit(args) => cmd_run(&cfg, ScenarioKind::Segwit, &args),
        Cmd::All { report_dir } => {
            for kind in [ScenarioKind::Legacy, ScenarioKind::Segwit] {
                let args = RunArgs {
                    wallet: None,
                    report: report_dir
                        .as_ref()
                        .map(|dir| dir.join(format!("{}.json", kind.name()))),
                };
                cmd_run(&cfg, kind, &args)?;
            }
            Ok(())
        }
        Cmd::InitConfig { force } => {
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            save_config(&path, &cfg)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Cmd::ShowConfig => {
            println!("# {}", path.display());
            println!("{}", serde_json::to_string_pretty(&cfg.masked())?);
            Ok(())
        }
    }
}

fn apply_overrides(cfg: &mut Config, cli: &Cli) {
    if let Some(host) = &cli.host {
        cfg.rpc.host = host.clone();
    }
    if let Some(port) = cli.port {
        cfg.rpc.port = port;
    }
    if let Some(user) = &cli.user {
        cfg.rpc.user = Some(user.clone());
    }
    if let Some(password) = &cli.password {
        cfg.rpc.password = Some(password.clone());
    }
    if let Some(cookie) = &cli.cookie {
        cfg.rpc.cookie_file = Some(cookie.clone());
    }
    if let Some(secs) = cli.timeout_secs {
        cfg.rpc.timeout_secs = secs;
    }
}

fn cmd_run(cfg: &Config, kind: ScenarioKind, args: &RunArgs) -> Result<()> {
    let url = cfg.rpc.url();
    let node = RpcClient::new(&url, cfg.rpc.auth(), cfg.rpc.timeout())
        .with_context(|| format!("connecting to node at {url}"))?;
    let scenario = cfg.scenario(kind, args.wallet.clone());

    let report = txchain_flow::run(&node, &scenario)
        .with_context(|| format!("{kind} scenario failed"))?;

    if let Some(path) = &args.report {
        write_report(path, &report)?;
        info!("Report written to {}", path.display());
    }
    Ok(())
}

fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("writing report {}", path.display()))?;
    Ok(())
}
