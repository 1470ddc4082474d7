use anyhow::{Context as _, Result};
use clap::{Parser as _, Subcommand};
use serde_json::json;
use submarine_swapd::proto::v1::InitSwapRequest;
use submarine_swapd::proto::v1::swapper_client::SwapperClient;

#[derive(Debug, clap::Parser)]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:50051")]
    grpc_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    InitSwap {
        /// Compressed payer public key, hex encoded.
        #[arg(long)]
        pubkey: String,

        /// sha256 payment hash, hex encoded.
        #[arg(long)]
        payment_hash: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut client = SwapperClient::connect(args.grpc_url.clone())
        .await
        .with_context(|| format!("connect {}", args.grpc_url))?;

    match args.command {
        Command::InitSwap {
            pubkey,
            payment_hash,
        } => {
            let pubkey = hex::decode(pubkey).context("decode pubkey hex")?;
            let hash = hex::decode(payment_hash).context("decode payment_hash hex")?;

            let resp = client
                .init_swap(InitSwapRequest { hash, pubkey })
                .await
                .context("init swap")?
                .into_inner();

            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "address": resp.address,
                    "service_pubkey": hex::encode(resp.pubkey),
                    "lock_time": resp.lock_time,
                }))
                .context("encode response")?
            );
        }
    }

    Ok(())
}
