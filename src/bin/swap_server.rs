use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use bitcoin::Network;
use clap::Parser as _;
use submarine_swapd::proto::v1::swapper_server::SwapperServer;
use submarine_swapd::server::SwapServer;
use submarine_swapd::swap::privkey_provider::RandomPrivateKeyProvider;
use submarine_swapd::swap::service::SwapService;
use submarine_swapd::swap::store::SqliteSwapStore;
use submarine_swapd::swap::swapper::Swapper;
use tonic::transport::Server;

#[derive(Debug, clap::Parser)]
struct Args {
    #[arg(long, default_value = "127.0.0.1:50051")]
    listen_addr: String,

    /// Bitcoin network. Valid values are bitcoin, testnet, signet, regtest.
    #[arg(long, default_value = "bitcoin")]
    network: Network,

    #[arg(long)]
    store_path: PathBuf,

    /// Relative lock time (sequence blocks) gating the refund path of every
    /// swap created by this instance.
    #[arg(long, default_value_t = 288)]
    lock_time: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    submarine_swapd::logging::init().ok();

    let args = Args::parse();
    let listen_addr: SocketAddr = args.listen_addr.parse().context("parse listen_addr")?;

    // The store is opened before any request is served; there is no lazy
    // connection setup on the request path.
    let store = Arc::new(SqliteSwapStore::open(args.store_path).context("open sqlite store")?);
    tracing::info!(store_path = %store.path().display(), "swap store ready");

    let service = SwapService::new(args.network, RandomPrivateKeyProvider::new(), args.lock_time);
    let swapper = Arc::new(Swapper::new(service, store));

    tracing::info!(
        %listen_addr,
        network = %args.network,
        lock_time = args.lock_time,
        "starting swap gRPC server"
    );

    Server::builder()
        .add_service(SwapperServer::new(SwapServer::new(swapper)))
        .serve(listen_addr)
        .await
        .context("serve gRPC")?;

    Ok(())
}
