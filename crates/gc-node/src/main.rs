use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gc_node::{Node, NodeConfig};
use gc_wallet::Wallet;

/// Gossip node daemon: participates in the UDP peer network, mines blocks,
/// and serves chain sync to shorter-chained peers.
#[derive(Parser, Debug)]
#[command(
    name = "gc-node",
    version,
    about = "UDP gossip node for a proof-of-work currency chain",
    long_about = "Runs a node that gossips transactions and blocks over UDP, \
                  mines new blocks from its mempool, and syncs its chain with peers."
)]
struct Cli {
    /// UDP port to listen on.
    #[arg(short, long, default_value_t = 51025, env = "GC_PORT")]
    port: u16,

    /// Hash-prefix difficulty a freshly created chain starts at.
    #[arg(long, default_value_t = gc_ledger::DEFAULT_DIFFICULTY, env = "GC_DIFFICULTY")]
    difficulty: u32,

    /// Bootstrap peer address (`host:port`); may be repeated.
    #[arg(long = "peer", env = "GC_PEERS", value_delimiter = ',')]
    peers: Vec<SocketAddr>,

    /// Path to a wallet file. Loaded if present; otherwise a new wallet is
    /// generated (unsaved unless the operator exports it separately).
    #[arg(long, env = "GC_WALLET")]
    wallet: Option<PathBuf>,

    /// Suppress log output to stderr (run silently).
    #[arg(short, long, default_value_t = false, env = "GC_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_filter = if cli.quiet {
        EnvFilter::new("off")
    } else {
        EnvFilter::from_default_env().add_directive("gc_node=info".parse()?)
    };
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    let wallet = load_or_generate_wallet(cli.wallet.as_deref())?;
    info!(address = %wallet.address, "mining to address");

    let config = NodeConfig {
        port: cli.port,
        difficulty: cli.difficulty,
        bootstrap_peers: cli.peers,
        wallet_path: cli.wallet,
        quiet: cli.quiet,
        ..NodeConfig::default()
    };

    info!(port = config.port, difficulty = config.difficulty, "starting gossip node");

    let (mut node, mut events) = Node::new(config, wallet.address.clone()).await?;
    info!(node_id = %node.node_id(), "node id");

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!(?event, "node event");
        }
    });

    node.spawn_miner();
    node.run().await?;

    Ok(())
}

/// `Wallet::export`/`import` require a password this CLI has no prompt for
/// yet, so `--wallet` is accepted but not loaded: every run mines to a
/// freshly generated address.
fn load_or_generate_wallet(_path: Option<&std::path::Path>) -> Result<Wallet, Box<dyn std::error::Error>> {
    Ok(Wallet::generate())
}
