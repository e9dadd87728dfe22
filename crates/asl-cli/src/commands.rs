use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use asl_anchor::{
    AnchorError, AnchorValidator, EthereumAnchorValidator, ValidatorSet, KNOWN_NETWORKS,
};
use asl_sdk::NodeConfig;
use asl_stream::GenesisCommit;
use asl_types::{AnchorProof, ChainId, StreamId};
use colored::Colorize;
use serde_json::json;

use crate::cli::*;

const DEFAULT_CONFIG_FILE: &str = "asl.toml";

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Chains => cmd_chains(format),
        Command::VerifyAnchor(args) => cmd_verify_anchor(cli.config.as_deref(), args, format).await,
        Command::StreamId(args) => cmd_stream_id(args, format),
        Command::Config(args) => cmd_config(cli.config.as_deref(), args, format),
    }
}

/// Where the configuration comes from: `--config`, else `./asl.toml` if it
/// exists, else built-in defaults (`None`).
fn config_source(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.exists().then_some(default)
        }
    }
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<NodeConfig> {
    match config_source(explicit) {
        Some(path) => NodeConfig::load(&path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(NodeConfig::default()),
    }
}

fn cmd_chains(format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let chains: Vec<_> = KNOWN_NETWORKS
                .iter()
                .map(|n| {
                    json!({
                        "chainId": ChainId::eip155(n.reference).to_string(),
                        "name": n.name,
                        "rpc": n.default_rpc,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&chains)?);
        }
        OutputFormat::Text => {
            for n in KNOWN_NETWORKS {
                println!(
                    "{:<18} {:<10} {}",
                    ChainId::eip155(n.reference).to_string().yellow(),
                    n.name.bold(),
                    n.default_rpc.dimmed()
                );
            }
        }
    }
    Ok(())
}

/// Effective Ethereum settings after command-line overrides.
fn verify_settings(
    config: &NodeConfig,
    args: &VerifyAnchorArgs,
) -> anyhow::Result<(asl_anchor::EthereumConfig, Option<ChainId>, Duration)> {
    let mut ethereum = config.anchor.ethereum.clone();
    if let Some(url) = &args.rpc_url {
        ethereum.rpc_url = Some(url.clone());
    }
    let chain_id = match &args.chain_id {
        Some(raw) => Some(
            raw.parse::<ChainId>()
                .with_context(|| format!("invalid --chain-id {raw}"))?,
        ),
        None => config.chain_id()?,
    };
    let timeout = match args.timeout_ms {
        Some(0) => anyhow::bail!("--timeout-ms must be greater than zero"),
        Some(ms) => Duration::from_millis(ms),
        None => config.validation_timeout(),
    };
    Ok((ethereum, chain_id, timeout))
}

async fn cmd_verify_anchor(
    config_path: Option<&Path>,
    args: VerifyAnchorArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let (ethereum, chain_id, timeout) = verify_settings(&config, &args)?;

    let raw = std::fs::read_to_string(&args.proof)
        .with_context(|| format!("reading {}", args.proof.display()))?;
    let proof: AnchorProof = serde_json::from_str(&raw)
        .with_context(|| format!("parsing anchor proof {}", args.proof.display()))?;

    let validator = EthereumAnchorValidator::new(ethereum)?;
    validator
        .init(chain_id.as_ref())
        .await
        .context("initializing the ethereum validator")?;
    let validators = ValidatorSet::new().with(Arc::new(validator));

    let outcome = validators.validate(&proof, timeout).await;
    report_verification(&proof, &outcome, format)?;
    match outcome {
        Ok(()) => Ok(()),
        Err(err) => Err(anyhow::Error::new(err).context("anchor proof rejected")),
    }
}

fn report_verification(
    proof: &AnchorProof,
    outcome: &Result<(), AnchorError>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let report = match outcome {
                Ok(()) => json!({
                    "valid": true,
                    "chainId": proof.chain_id.to_string(),
                    "txHash": proof.tx_hash_hex(),
                }),
                Err(err) => json!({
                    "valid": false,
                    "chainId": proof.chain_id.to_string(),
                    "txHash": proof.tx_hash_hex(),
                    "field": err.mismatched_field().map(|f| f.to_string()),
                    "kind": format!("{:?}", err.kind()),
                    "retryable": err.is_retryable(),
                    "error": err.to_string(),
                }),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => match outcome {
            Ok(()) => {
                println!("{} Anchor proof valid", "✓".green().bold());
                println!("  Chain: {}", proof.chain_id.to_string().cyan());
                println!("  Tx: {}", proof.tx_hash_hex().yellow());
                println!("  Root: {}", proof.root);
                println!("  Block: {} @ {}", proof.block_number, proof.block_timestamp);
            }
            Err(err) => {
                println!("{} Anchor proof invalid", "✗".red().bold());
                if let Some(field) = err.mismatched_field() {
                    println!("  Field: {}", field.to_string().yellow());
                }
                if err.is_retryable() {
                    println!("  {}", "transient failure, retrying may succeed".dimmed());
                }
            }
        },
    }
    Ok(())
}

fn derive_stream_id(raw: &str) -> anyhow::Result<(GenesisCommit, StreamId)> {
    let genesis: GenesisCommit =
        serde_json::from_str(raw).context("parsing genesis commit")?;
    let id = genesis.stream_id()?;
    Ok((genesis, id))
}

fn cmd_stream_id(args: StreamIdArgs, format: OutputFormat) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.genesis)
        .with_context(|| format!("reading {}", args.genesis.display()))?;
    let (genesis, id) = derive_stream_id(&raw)?;
    match format {
        OutputFormat::Json => {
            let report = json!({
                "streamId": id.to_string(),
                "streamType": genesis.stream_type,
                "genesis": id.genesis().to_hex(),
                "commitId": id.at_commit(id.genesis()).to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("{}", id.to_string().bold());
            println!("  Type: {:?}", genesis.stream_type);
            println!("  Genesis: {}", id.genesis().short_hex().dimmed());
        }
    }
    Ok(())
}

fn cmd_config(explicit: Option<&Path>, args: ConfigArgs, format: OutputFormat) -> anyhow::Result<()> {
    let source = config_source(explicit);
    if args.path {
        match &source {
            Some(path) => println!("{}", path.display()),
            None => println!("(defaults)"),
        }
        return Ok(());
    }

    let config = load_config(explicit)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Text => {
            let origin = source
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in defaults".into());
            println!("{}", format!("# effective configuration ({origin})").dimmed());
            print!("{}", config.to_toml_string()?);
        }
    }
    Ok(())
}
