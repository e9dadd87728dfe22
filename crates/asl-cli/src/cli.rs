use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "asl",
    about = "Anchored Stream Log: content-addressed streams with blockchain timestamps",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Node configuration file (TOML). Defaults to ./asl.toml when present.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the well-known Ethereum networks
    Chains,
    /// Check an anchor proof against its chain
    VerifyAnchor(VerifyAnchorArgs),
    /// Derive the stream id of a genesis commit
    StreamId(StreamIdArgs),
    /// Show the effective configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct VerifyAnchorArgs {
    /// JSON file holding the anchor proof
    pub proof: PathBuf,
    /// JSON-RPC endpoint to query instead of the configured one
    #[arg(long)]
    pub rpc_url: Option<String>,
    /// CAIP-2 chain the endpoint must serve, e.g. eip155:1
    #[arg(long)]
    pub chain_id: Option<String>,
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[derive(Args)]
pub struct StreamIdArgs {
    /// JSON file holding the genesis commit
    pub genesis: PathBuf,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Print only which file the configuration comes from
    #[arg(long)]
    pub path: bool,
}
