use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

pub const CREATE_ORDER_PATH: &str = "/api/rebalance/v1/create_order";
pub const CLIENT_TOKEN: &str = "alby-hub";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub token: String,
    pub pay_request: String,
    pub pay_through_this_public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOrder {
    pub order_id: String,
    pub pay_request: String,
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("build rebalance http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to request new rebalance order: {0}")]
    Request(#[source] reqwest::Error),

    #[error("rebalance create_order request timed out after {}s", REQUEST_TIMEOUT.as_secs())]
    Timeout,

    #[error("rebalance create_order request cancelled")]
    Cancelled,

    #[error("failed to read response body")]
    ReadBody(#[source] reqwest::Error),

    #[error("rebalance create_order endpoint returned non-success code: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to deserialize json from rebalance create order response: {body}")]
    Deserialize {
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Client for the external rebalance order service. Requests are never retried.
#[derive(Debug, Clone)]
pub struct SwapOrderClient {
    base_url: String,
    http: reqwest::Client,
}

impl SwapOrderClient {
    pub fn new(base_url: &str) -> Result<Self, OrderError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(OrderError::Client)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{CREATE_ORDER_PATH}", self.base_url)
    }

    pub async fn create_order(
        &self,
        receive_pay_request: &str,
        target_peer_pubkey: &str,
        cancel: &CancellationToken,
    ) -> Result<SwapOrder, OrderError> {
        let request = CreateOrderRequest {
            token: CLIENT_TOKEN.to_string(),
            pay_request: receive_pay_request.to_string(),
            pay_through_this_public_key: target_peer_pubkey.to_string(),
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(OrderError::Cancelled),
            res = self.send(&request) => res,
        }
    }

    async fn send(&self, request: &CreateOrderRequest) -> Result<SwapOrder, OrderError> {
        let res = self
            .http
            .post(self.endpoint())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, ?request, "failed to request new rebalance order");
                if e.is_timeout() {
                    OrderError::Timeout
                } else {
                    OrderError::Request(e)
                }
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            tracing::error!(error = %e, ?request, "failed to read response body");
            if e.is_timeout() {
                OrderError::Timeout
            } else {
                OrderError::ReadBody(e)
            }
        })?;

        if status.as_u16() >= 300 {
            tracing::error!(
                ?request,
                %body,
                status_code = status.as_u16(),
                "rebalance create_order endpoint returned non-success code"
            );
            return Err(OrderError::Status { status, body });
        }

        let order: SwapOrder = serde_json::from_str(&body).map_err(|source| {
            tracing::error!(error = %source, ?request, "failed to deserialize json");
            OrderError::Deserialize {
                body: body.clone(),
                source,
            }
        })?;

        tracing::info!(order_id = %order.order_id, "new rebalance order created");
        Ok(order)
    }
}
