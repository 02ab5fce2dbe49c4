//! gateway-node — the transaction-submission gateway's process entry point.
//!
//! Startup sequence:
//!   1. Parse process config (env vars, spec.md §4.2) and process-level CLI flags
//!   2. Open the KV backend (in-memory or sled)
//!   3. Build the chain-RPC and relayer-runtime HTTP collaborators
//!   4. Construct the `Handler` orchestrator
//!   5. Start the JSON-RPC server and run until shut down

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;

use gateway_chain::HttpChainClient;
use gateway_core::config::Config;
use gateway_handler::Handler;
use gateway_kv::{InMemoryKvStore, KvStore, SledKvStore};
use gateway_rpc::{RpcServer, RpcServerState};
use gateway_submit::HttpRelayerRuntime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KvBackend {
    Memory,
    Sled,
}

#[derive(Parser, Debug)]
#[command(
    name = "gateway-node",
    version,
    about = "Soroban transaction-submission gateway — channel pool, sequence cache, fee-bump submit pipeline"
)]
struct Args {
    /// JSON-RPC listen address.
    #[arg(long, default_value = "127.0.0.1:8787")]
    rpc_addr: SocketAddr,

    /// KV storage backend.
    #[arg(long, value_enum, default_value_t = KvBackend::Sled)]
    kv_backend: KvBackend,

    /// Directory for the persistent KV store (sled backend only).
    #[arg(long, default_value = "~/.gateway/data")]
    kv_path: PathBuf,

    /// Chain RPC endpoint (`simulateTransaction`/`getLedgerEntries`).
    #[arg(long, default_value = "http://127.0.0.1:8000/soroban/rpc")]
    chain_rpc_url: String,

    /// Hosting runtime's relayer sidecar base URL (sign/send/wait).
    #[arg(long, default_value = "http://127.0.0.1:8001")]
    relayer_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gateway=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("gateway node starting");

    let config = Config::from_env().context("loading gateway configuration from environment")?;
    info!(network = %config.network, fund_relayer = %config.fund_relayer_id, "configuration loaded");

    let kv: Arc<dyn KvStore> = match args.kv_backend {
        KvBackend::Memory => {
            info!("using in-memory KV store (not shared across replicas)");
            Arc::new(InMemoryKvStore::new())
        }
        KvBackend::Sled => {
            let data_dir = expand_tilde(&args.kv_path);
            std::fs::create_dir_all(&data_dir)
                .with_context(|| format!("creating KV data dir {}", data_dir.display()))?;
            info!(path = %data_dir.display(), "opening sled KV store");
            Arc::new(SledKvStore::open(&data_dir).context("opening sled KV store")?)
        }
    };

    let chain = Arc::new(HttpChainClient::new(args.chain_rpc_url.clone()));
    let relayer = Arc::new(HttpRelayerRuntime::new(args.relayer_url.clone()));

    let handler = Arc::new(Handler::new(config, kv, chain, relayer));

    let rpc_state = Arc::new(RpcServerState { handler });
    let rpc_handle = RpcServer::new(rpc_state)
        .start(args.rpc_addr)
        .await
        .context("starting JSON-RPC server")?;

    info!("gateway node ready");
    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    info!("shutdown signal received, stopping RPC server");
    rpc_handle.stop().ok();
    rpc_handle.stopped().await;

    Ok(())
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
