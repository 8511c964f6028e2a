use super::RebalanceStage;
use super::order::OrderError;
use crate::lightning::node::PaymentFailure;

#[derive(Debug, thiserror::Error)]
pub enum RebalanceError {
    #[error("LNClient not started")]
    NodeNotStarted,

    #[error("invalid rebalance request: {0}")]
    InvalidRequest(String),

    #[error("failed to validate rebalance request: {0:#}")]
    ListChannels(anyhow::Error),

    #[error("no channel found with node {pubkey}")]
    NoChannelWithPeer { pubkey: String },

    #[error("amount_sat={amount_sat} overflows msat")]
    AmountOverflow { amount_sat: u64 },

    #[error("{0:#}")]
    CreateInvoice(anyhow::Error),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("failed to decode rebalance invoice: {0:#}")]
    DecodeInvoice(anyhow::Error),

    #[error("{message}")]
    RouteNotFound {
        message: String,
        #[source]
        source: PaymentFailure,
    },

    #[error("failed to pay rebalance invoice: {0}")]
    Payment(#[source] PaymentFailure),

    #[error("rebalance cancelled while {}", .stage.as_str())]
    Cancelled { stage: RebalanceStage },
}

impl RebalanceError {
    /// Errors raised before any invoice was created or any network call to the swap service.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NodeNotStarted | Self::InvalidRequest(_) | Self::NoChannelWithPeer { .. }
        )
    }
}
