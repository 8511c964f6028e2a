pub mod channel;
pub mod error;
pub mod order;
pub mod service;

use serde::{Deserialize, Serialize};

pub use error::RebalanceError;
pub use order::{OrderError, SwapOrder, SwapOrderClient};
pub use service::RebalanceService;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceRequest {
    pub receive_through_node_pubkey: String,
    pub amount_sat: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceResponse {
    /// Not clamped: a service that returns a smaller invoice than requested yields a negative fee.
    pub total_fee_sat: i64,
}

#[derive(Debug, Clone)]
pub struct RebalanceConfig {
    pub rebalance_service_url: String,
    pub invoice_expiry_secs: Option<u32>,
}

/// Where a rebalance attempt is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalanceStage {
    Validating,
    CreatingReceiveInvoice,
    RequestingOrder,
    DecodingInvoice,
    Paying,
    Done,
}

impl RebalanceStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::CreatingReceiveInvoice => "creating_receive_invoice",
            Self::RequestingOrder => "requesting_order",
            Self::DecodingInvoice => "decoding_invoice",
            Self::Paying => "paying",
            Self::Done => "done",
        }
    }
}
