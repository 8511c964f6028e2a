use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::{Context as _, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse as _, Response};
use axum::routing::post;
use axum::{Json, Router};
use ln_rebalance::rebalance::order::{CREATE_ORDER_PATH, CreateOrderRequest};
use ln_rebalance::rebalance::SwapOrder;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub enum OrderReply {
    Order(SwapOrder),
    Status(u16, String),
    Raw(String),
    /// Never answers.
    Hang,
}

struct ServerState {
    reply: OrderReply,
    requests: Mutex<Vec<CreateOrderRequest>>,
}

/// Swap order service stand-in listening on an ephemeral local port.
pub struct OrderServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    handle: JoinHandle<()>,
}

impl OrderServer {
    pub async fn start(reply: OrderReply) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind order server")?;
        let addr = listener.local_addr().context("order server local addr")?;

        let state = Arc::new(ServerState {
            reply,
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route(CREATE_ORDER_PATH, post(create_order))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::warn!(error = %err, "order server stopped");
            }
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<CreateOrderRequest> {
        self.state
            .requests
            .lock()
            .expect("order server mutex poisoned")
            .clone()
    }
}

impl Drop for OrderServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_order(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Response {
    state
        .requests
        .lock()
        .expect("order server mutex poisoned")
        .push(req);

    match &state.reply {
        OrderReply::Order(order) => Json(order.clone()).into_response(),
        OrderReply::Status(code, body) => {
            let status = StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, body.clone()).into_response()
        }
        OrderReply::Raw(body) => (StatusCode::OK, body.clone()).into_response(),
        OrderReply::Hang => std::future::pending::<Response>().await,
    }
}

/// Answers one order request with a `Content-Length` larger than the body it sends, then
/// closes the connection.
pub struct TruncatedOrderServer {
    addr: SocketAddr,
    handle: JoinHandle<Result<()>>,
}

impl TruncatedOrderServer {
    pub async fn start() -> Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind truncated order server")?;
        let addr = listener.local_addr().context("truncated order server local addr")?;

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.context("accept")?;

            // The JSON request body is the last thing sent and ends with `}`.
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request.ends_with(b"}") {
                let n = stream.read(&mut buf).await.context("read request")?;
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"order_id\":",
                )
                .await
                .context("write truncated response")?;
            stream.shutdown().await.context("shutdown")?;
            Ok(())
        });

        Ok(Self { addr, handle })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TruncatedOrderServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
