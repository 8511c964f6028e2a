use std::future::Future;
use std::str::FromStr as _;

use bitcoin::secp256k1::PublicKey;
use tokio_util::sync::CancellationToken;
use tracing::Instrument as _;
use uuid::Uuid;

use super::channel::{channel_info, find_channel, log_channels};
use super::order::SwapOrderClient;
use super::{RebalanceConfig, RebalanceError, RebalanceRequest, RebalanceResponse, RebalanceStage};
use crate::lightning::invoice::decode_bolt11;
use crate::lightning::node::{
    InvoiceRequest, LightningNode, PaymentFailure, PaymentOutcome, RebalanceMetadata,
};

/// Runs rebalances against one node and one order service.
///
/// Every call is independent: there is no deduplication of concurrent requests for the same
/// peer, each one creates its own invoice, order and payment.
#[derive(Debug, Clone)]
pub struct RebalanceService<N> {
    node: Option<N>,
    orders: SwapOrderClient,
    invoice_expiry_secs: Option<u32>,
}

impl<N: LightningNode> RebalanceService<N> {
    pub fn new(cfg: RebalanceConfig, node: Option<N>) -> Result<Self, RebalanceError> {
        let orders = SwapOrderClient::new(&cfg.rebalance_service_url)?;
        Ok(Self {
            node,
            orders,
            invoice_expiry_secs: cfg.invoice_expiry_secs,
        })
    }

    pub async fn rebalance_channel(
        &self,
        req: &RebalanceRequest,
        cancel: &CancellationToken,
    ) -> Result<RebalanceResponse, RebalanceError> {
        let span = tracing::info_span!(
            "rebalance",
            attempt_id = %Uuid::new_v4(),
            receive_through_pubkey = %req.receive_through_node_pubkey,
            amount_sat = req.amount_sat,
            stage = tracing::field::Empty,
        );
        self.run(req, cancel).instrument(span).await
    }

    async fn run(
        &self,
        req: &RebalanceRequest,
        cancel: &CancellationToken,
    ) -> Result<RebalanceResponse, RebalanceError> {
        let node = self.node.as_ref().ok_or(RebalanceError::NodeNotStarted)?;
        validate_request(req)?;
        let peer = req.receive_through_node_pubkey.as_str();

        enter(RebalanceStage::Validating);
        let channels = cancellable(cancel, RebalanceStage::Validating, node.list_channels())
            .await?
            .map_err(|e| {
                tracing::error!(
                    error = %format!("{e:#}"),
                    "failed to list channels for rebalance validation"
                );
                RebalanceError::ListChannels(e)
            })?;

        log_channels(&channels);
        let Some(channel) = find_channel(peer, &channels) else {
            let available_peers: Vec<&str> =
                channels.iter().map(|c| c.remote_pubkey.as_str()).collect();
            tracing::error!(
                ?available_peers,
                "no active channel found with specified receive_through node"
            );
            return Err(RebalanceError::NoChannelWithPeer {
                pubkey: peer.to_string(),
            });
        };

        tracing::info!(
            channel_info = %channel_info(channel),
            "starting rebalance through validated channel peer"
        );

        enter(RebalanceStage::CreatingReceiveInvoice);
        let amount_msat = req
            .amount_sat
            .checked_mul(1000)
            .ok_or(RebalanceError::AmountOverflow {
                amount_sat: req.amount_sat,
            })?;
        let invoice_request = InvoiceRequest {
            amount_msat,
            memo: format!("Alby Hub Rebalance through {peer}"),
            expiry_secs: self.invoice_expiry_secs,
            metadata: RebalanceMetadata::receive(peer, req.amount_sat),
        };
        let receive_invoice = cancellable(
            cancel,
            RebalanceStage::CreatingReceiveInvoice,
            node.make_invoice(invoice_request),
        )
        .await?
        .map_err(|e| {
            tracing::error!(
                error = %format!("{e:#}"),
                "failed to generate rebalance receive invoice"
            );
            RebalanceError::CreateInvoice(e)
        })?;

        enter(RebalanceStage::RequestingOrder);
        let order = self
            .orders
            .create_order(&receive_invoice, peer, cancel)
            .await
            .map_err(|e| match e {
                super::OrderError::Cancelled => RebalanceError::Cancelled {
                    stage: RebalanceStage::RequestingOrder,
                },
                e => RebalanceError::Order(e),
            })?;

        // Diagnostics only; the outcome must not depend on this lookup.
        match cancellable(cancel, RebalanceStage::RequestingOrder, node.node_identity()).await {
            Ok(Ok(identity)) => {
                tracing::info!(
                    our_pubkey = %identity.pubkey,
                    "node information for rebalance routing"
                );
            }
            Ok(Err(e)) => tracing::debug!(error = %format!("{e:#}"), "node identity lookup failed"),
            Err(_) => tracing::debug!("node identity lookup cancelled"),
        }

        enter(RebalanceStage::DecodingInvoice);
        let decoded = decode_bolt11(&order.pay_request).map_err(|e| {
            tracing::error!(error = %format!("{e:#}"), "failed to decode bolt11 invoice");
            RebalanceError::DecodeInvoice(e)
        })?;

        enter(RebalanceStage::Paying);
        tracing::info!(
            order_id = %order.order_id,
            payment_hash = %decoded.payment_hash,
            destination = %decoded.payee_pubkey,
            amount_msat = decoded.amount_msat,
            description = %decoded.description,
            expiry = decoded.expiry_secs,
            "attempting to pay rebalance invoice"
        );
        let metadata = RebalanceMetadata::pay(peer, req.amount_sat, &order.order_id);
        let payment: Result<PaymentOutcome, PaymentFailure> = cancellable(
            cancel,
            RebalanceStage::Paying,
            node.send_payment(&order.pay_request, None, &metadata),
        )
        .await?;
        let payment = payment.map_err(|failure| {
            tracing::error!(
                order_id = %order.order_id,
                payment_hash = %decoded.payment_hash,
                destination = %decoded.payee_pubkey,
                amount_msat = decoded.amount_msat,
                bolt11 = %order.pay_request,
                reason = ?failure.reason,
                error = %failure,
                "failed to pay rebalance invoice, check if routing path exists through specified node"
            );
            payment_error(failure, peer, req.amount_sat)
        })?;

        enter(RebalanceStage::Done);
        let total_fee_sat = total_fee_sat(decoded.amount_msat, payment.fee_msat, req.amount_sat);
        if total_fee_sat < 0 {
            tracing::warn!(
                total_fee_sat,
                decoded_amount_msat = decoded.amount_msat,
                "rebalance invoice was smaller than the requested amount"
            );
        }
        tracing::info!(
            order_id = %order.order_id,
            payment_id = payment.payment_id.as_deref().unwrap_or_default(),
            fee_msat = payment.fee_msat,
            total_fee_sat,
            "rebalance completed"
        );

        Ok(RebalanceResponse { total_fee_sat })
    }
}

fn enter(stage: RebalanceStage) {
    tracing::Span::current().record("stage", stage.as_str());
}

fn validate_request(req: &RebalanceRequest) -> Result<(), RebalanceError> {
    if req.amount_sat == 0 {
        return Err(RebalanceError::InvalidRequest(
            "amount_sat must be > 0".to_string(),
        ));
    }
    let pubkey = &req.receive_through_node_pubkey;
    if pubkey.len() != 66 {
        return Err(RebalanceError::InvalidRequest(format!(
            "invalid receive_through node pubkey: expected 33 hex-encoded bytes, got {} chars",
            pubkey.len()
        )));
    }
    PublicKey::from_str(pubkey).map_err(|e| {
        RebalanceError::InvalidRequest(format!("invalid receive_through node pubkey: {e}"))
    })?;
    Ok(())
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    stage: RebalanceStage,
    fut: impl Future<Output = T>,
) -> Result<T, RebalanceError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RebalanceError::Cancelled { stage }),
        out = fut => Ok(out),
    }
}

fn payment_error(failure: PaymentFailure, peer: &str, amount_sat: u64) -> RebalanceError {
    if !failure.reason.is_routing() {
        return RebalanceError::Payment(failure);
    }

    let message = format!(
        "failed to pay rebalance invoice: {failure}. \
         This typically indicates insufficient liquidity in the specified routing path. \
         Please ensure: 1) The receive_through node ({peer}) has sufficient outbound liquidity to the destination, \
         2) Your node has sufficient outbound liquidity to the receive_through node, \
         3) The amount ({amount_sat} sats) is within routing limits"
    );
    RebalanceError::RouteNotFound {
        message,
        source: failure,
    }
}

/// Paid amount plus routing fee minus the requested amount, each term truncated to whole sats.
pub fn total_fee_sat(decoded_amount_msat: u64, fee_msat: u64, amount_sat: u64) -> i64 {
    // Each u64 / 1000 term is below 2^54, and callers reject amount_sat that overflows msat,
    // so the arithmetic fits in i64.
    let paid_sat = (decoded_amount_msat / 1000) as i64 + (fee_msat / 1000) as i64;
    paid_sat - amount_sat as i64
}
