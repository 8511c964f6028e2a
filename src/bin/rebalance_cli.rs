use anyhow::{Context as _, Result};
use clap::Parser as _;
use ln_rebalance::lightning::ldk::{DEFAULT_INVOICE_EXPIRY_SECS, LdkLightningClient};
use ln_rebalance::rebalance::{RebalanceConfig, RebalanceRequest, RebalanceService};
use serde_json::json;
use tokio_util::sync::CancellationToken;

#[derive(Debug, clap::Parser)]
struct Args {
    /// LDK Server REST address. Without it the node is treated as not started.
    #[arg(long, env = "LDK_REST_ADDR")]
    ldk_rest_addr: Option<String>,

    #[arg(long, env = "REBALANCE_SERVICE_URL")]
    rebalance_service_url: String,

    /// Channel peer the rebalance payment is routed through.
    #[arg(long)]
    receive_through: String,

    #[arg(long)]
    amount_sat: u64,

    #[arg(long, default_value_t = DEFAULT_INVOICE_EXPIRY_SECS)]
    invoice_expiry_secs: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    ln_rebalance::logging::init().ok();
    let args = Args::parse();

    let node = args.ldk_rest_addr.map(LdkLightningClient::new);
    let svc = RebalanceService::new(
        RebalanceConfig {
            rebalance_service_url: args.rebalance_service_url,
            invoice_expiry_secs: Some(args.invoice_expiry_secs),
        },
        node,
    )
    .context("create rebalance service")?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling rebalance");
                cancel.cancel();
            }
        }
    });

    let req = RebalanceRequest {
        receive_through_node_pubkey: args.receive_through,
        amount_sat: args.amount_sat,
    };
    let resp = svc
        .rebalance_channel(&req, &cancel)
        .await
        .context("rebalance channel")?;

    let out = json!({
      "total_fee_sat": resp.total_fee_sat,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
