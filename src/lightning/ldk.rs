use std::future::Future;
use std::time::Duration;

use anyhow::{Context as _, Result};
use ldk_server_client::client::LdkServerClient;
use ldk_server_protos::api::{
    Bolt11ReceiveRequest, Bolt11SendRequest, GetNodeInfoRequest, ListChannelsRequest,
    ListPaymentsRequest,
};
use ldk_server_protos::types::{
    Bolt11InvoiceDescription, Channel, Payment, PaymentDirection, PaymentStatus,
    bolt11_invoice_description,
};
use tokio::time::Instant;

use super::node::{
    ChannelSummary, InvoiceRequest, LightningNode, NodeIdentity, PaymentFailure,
    PaymentFailureReason, PaymentOutcome, RebalanceMetadata,
};

pub const DEFAULT_INVOICE_EXPIRY_SECS: u32 = 3600;
const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(60);
const PAYMENT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// `LightningNode` backed by an LDK Server REST endpoint.
///
/// LDK Server has no place to store invoice or payment metadata, so it is only logged.
#[derive(Clone)]
pub struct LdkLightningClient {
    client: LdkServerClient,
    payment_timeout: Duration,
}

impl LdkLightningClient {
    pub fn new(rest_service_address: String) -> Self {
        Self {
            client: LdkServerClient::new(rest_service_address),
            payment_timeout: DEFAULT_PAYMENT_TIMEOUT,
        }
    }

    pub fn with_payment_timeout(mut self, timeout: Duration) -> Self {
        self.payment_timeout = timeout;
        self
    }

    async fn wait_payment(&self, payment_id: &str) -> Result<PaymentOutcome, PaymentFailure> {
        poll_payment(payment_id, self.payment_timeout, || async {
            self.client
                .list_payments(ListPaymentsRequest { page_token: None })
                .await
                .map(|r| r.payments)
                .map_err(|e| format!("ListPayments: {e}"))
        })
        .await
    }
}

/// Polls `list` until the outbound payment settles. Listing errors are retried until the
/// deadline; a payment still pending at the deadline may yet complete.
async fn poll_payment<F, Fut>(
    payment_id: &str,
    timeout: Duration,
    mut list: F,
) -> Result<PaymentOutcome, PaymentFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<Payment>, String>>,
{
    let deadline = Instant::now() + timeout;
    let mut last_error = None;
    loop {
        match list().await {
            Ok(payments) => {
                last_error = None;
                if let Some(p) = payments.into_iter().find(|p| {
                    p.id == payment_id && p.direction == PaymentDirection::Outbound as i32
                }) {
                    if p.status == PaymentStatus::Succeeded as i32 {
                        return Ok(PaymentOutcome {
                            payment_id: Some(p.id),
                            fee_msat: p.fee_paid_msat.unwrap_or(0),
                        });
                    }
                    // LDK Server reports no failure reason; a failed outbound payment almost
                    // always means path finding gave up.
                    if p.status == PaymentStatus::Failed as i32 {
                        return Err(PaymentFailure::new(
                            PaymentFailureReason::NoRoute,
                            format!(
                                "payment failed: payment_id={payment_id} (RouteNotFound or retries exhausted)"
                            ),
                        ));
                    }
                }
            }
            Err(err) => {
                tracing::warn!(payment_id, error = %err, "listing payments failed, retrying");
                last_error = Some(err);
            }
        }

        if Instant::now() >= deadline {
            let detail = last_error
                .map(|e| format!(", last error: {e}"))
                .unwrap_or_default();
            return Err(PaymentFailure::new(
                PaymentFailureReason::Timeout,
                format!(
                    "payment state unknown after {}s, it may still complete: payment_id={payment_id}{detail}",
                    timeout.as_secs()
                ),
            ));
        }

        tokio::time::sleep(PAYMENT_POLL_INTERVAL).await;
    }
}

impl LightningNode for LdkLightningClient {
    async fn list_channels(&self) -> Result<Vec<ChannelSummary>> {
        let channels = self
            .client
            .list_channels(ListChannelsRequest {})
            .await
            .context("ListChannels")?
            .channels;

        Ok(channels.into_iter().map(channel_summary).collect())
    }

    async fn make_invoice(&self, request: InvoiceRequest) -> Result<String> {
        tracing::debug!(metadata = ?request.metadata, "creating invoice");

        let description = Bolt11InvoiceDescription {
            kind: Some(bolt11_invoice_description::Kind::Direct(request.memo)),
        };

        let resp = self
            .client
            .bolt11_receive(Bolt11ReceiveRequest {
                amount_msat: Some(request.amount_msat),
                description: Some(description),
                expiry_secs: request.expiry_secs.unwrap_or(DEFAULT_INVOICE_EXPIRY_SECS),
            })
            .await
            .context("Bolt11Receive")?;

        Ok(resp.invoice)
    }

    async fn send_payment(
        &self,
        bolt11: &str,
        amount_override_msat: Option<u64>,
        metadata: &RebalanceMetadata,
    ) -> Result<PaymentOutcome, PaymentFailure> {
        tracing::debug!(?metadata, "sending payment");

        let payment_id = self
            .client
            .bolt11_send(Bolt11SendRequest {
                invoice: bolt11.to_string(),
                amount_msat: amount_override_msat,
                route_parameters: None,
            })
            .await
            .map_err(|e| {
                let message = format!("Bolt11Send: {e}");
                PaymentFailure::new(classify_send_error(&message), message)
            })?
            .payment_id;

        self.wait_payment(&payment_id).await
    }

    async fn node_identity(&self) -> Result<NodeIdentity> {
        let info = self
            .client
            .get_node_info(GetNodeInfoRequest {})
            .await
            .context("GetNodeInfo")?;
        Ok(NodeIdentity {
            pubkey: info.node_id,
        })
    }
}

fn channel_summary(c: Channel) -> ChannelSummary {
    ChannelSummary {
        channel_id: c.channel_id,
        remote_pubkey: c.counterparty_node_id,
        local_balance_msat: c.outbound_capacity_msat,
        remote_balance_msat: c.inbound_capacity_msat,
        spendable_msat: c.next_outbound_htlc_limit_msat,
        active: c.is_usable,
        public: c.is_announced,
        is_outbound: c.is_outbound,
    }
}

/// LDK reports send errors as text only; this is the single place that text is interpreted.
fn classify_send_error(message: &str) -> PaymentFailureReason {
    let lower = message.to_ascii_lowercase();
    if lower.contains("routenotfound") || lower.contains("route") {
        PaymentFailureReason::NoRoute
    } else if lower.contains("insufficientfunds") || lower.contains("liquidity") {
        PaymentFailureReason::InsufficientLiquidity
    } else if lower.contains("timeout") || lower.contains("timed out") {
        PaymentFailureReason::Timeout
    } else {
        PaymentFailureReason::Other
    }
}
