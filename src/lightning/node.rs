use std::fmt;
use std::future::Future;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub const REBALANCE_METADATA_VERSION: u8 = 1;

/// Snapshot of one channel as reported by the node. Balances are in msat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub channel_id: String,
    pub remote_pubkey: String,
    pub local_balance_msat: u64,
    pub remote_balance_msat: u64,
    pub spendable_msat: u64,
    pub active: bool,
    pub public: bool,
    pub is_outbound: bool,
}

impl ChannelSummary {
    pub fn capacity_msat(&self) -> u64 {
        self.local_balance_msat
            .saturating_add(self.remote_balance_msat)
    }
}

/// Diagnostic data attached to the invoice and the payment of a rebalance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceMetadata {
    pub version: u8,
    pub receive_through: String,
    pub amount_sat: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

impl RebalanceMetadata {
    pub fn receive(receive_through: &str, amount_sat: u64) -> Self {
        Self {
            version: REBALANCE_METADATA_VERSION,
            receive_through: receive_through.to_string(),
            amount_sat,
            order_id: None,
        }
    }

    pub fn pay(receive_through: &str, amount_sat: u64, order_id: &str) -> Self {
        Self {
            order_id: Some(order_id.to_string()),
            ..Self::receive(receive_through, amount_sat)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceRequest {
    pub amount_msat: u64,
    pub memo: String,
    pub expiry_secs: Option<u32>,
    pub metadata: RebalanceMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub payment_id: Option<String>,
    pub fee_msat: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub pubkey: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFailureReason {
    /// Also used for failures the node reports without any reason.
    NoRoute,
    InsufficientLiquidity,
    Timeout,
    Other,
}

impl PaymentFailureReason {
    /// Failures caused by the lack of a usable path, as opposed to protocol or node errors.
    pub fn is_routing(self) -> bool {
        matches!(self, Self::NoRoute | Self::InsufficientLiquidity)
    }
}

/// Why a payment did not complete. The node implementation classifies its own errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentFailure {
    pub reason: PaymentFailureReason,
    pub message: String,
}

impl PaymentFailure {
    pub fn new(reason: PaymentFailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

impl fmt::Display for PaymentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PaymentFailure {}

/// The Lightning node a rebalance runs against.
pub trait LightningNode: Send + Sync {
    fn list_channels(&self) -> impl Future<Output = Result<Vec<ChannelSummary>>> + Send;

    /// Returns the BOLT11 payment request of the new invoice.
    fn make_invoice(&self, request: InvoiceRequest) -> impl Future<Output = Result<String>> + Send;

    /// Pays `bolt11` and waits for the payment to settle.
    fn send_payment(
        &self,
        bolt11: &str,
        amount_override_msat: Option<u64>,
        metadata: &RebalanceMetadata,
    ) -> impl Future<Output = Result<PaymentOutcome, PaymentFailure>> + Send;

    fn node_identity(&self) -> impl Future<Output = Result<NodeIdentity>> + Send;
}
