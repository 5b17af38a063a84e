use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::RwLock;
use serde_json::{json, Value};
use url::Url;

use crate::fixtures::block_hash;

/// Serve `router` on an ephemeral local port.
pub fn spawn_router(router: Router) -> SocketAddr {
    let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
        .serve(router.into_make_service());
    let addr = server.local_addr();
    tokio::spawn(async move {
        if let Err(e) = server.await {
            tracing::error!("test server failed: {e}");
        }
    });
    addr
}

pub fn base_url(addr: SocketAddr) -> Url {
    Url::parse(&format!("http://{addr}/")).expect("valid socket address url")
}

#[derive(Default)]
struct DocumentState {
    documents: RwLock<HashMap<String, (StatusCode, Vec<u8>)>>,
    requests: RwLock<Vec<String>>,
}

/// Serves checkpoint documents by path, standing in for S3 buckets and DA gateways.
#[derive(Clone, Default)]
pub struct DocumentServer {
    state: Arc<DocumentState>,
}

impl DocumentServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&self) -> SocketAddr {
        let router = Router::new()
            .fallback(serve_document)
            .with_state(self.state.clone());
        spawn_router(router)
    }

    /// Serve `body` at `path`, e.g. `/bucket/checkpoint-a-brc-20-latest.json`.
    pub fn put(&self, path: &str, body: Vec<u8>) {
        self.respond(path, StatusCode::OK, body);
    }

    pub fn respond(&self, path: &str, status: StatusCode, body: Vec<u8>) {
        self.state
            .documents
            .write()
            .insert(path.to_string(), (status, body));
    }

    /// Every request seen so far, with its query string.
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.read().clone()
    }
}

async fn serve_document(
    State(state): State<Arc<DocumentState>>,
    uri: Uri,
) -> (StatusCode, Vec<u8>) {
    state.requests.write().push(uri.to_string());
    state
        .documents
        .read()
        .get(uri.path())
        .cloned()
        .unwrap_or((StatusCode::NOT_FOUND, b"<Error><Code>NoSuchKey</Code></Error>".to_vec()))
}

#[derive(Default)]
struct BitcoindState {
    height: AtomicU64,
    failing: AtomicBool,
}

/// A bitcoind JSON-RPC endpoint answering `getblockcount` and `getblockhash`.
#[derive(Clone, Default)]
pub struct BitcoindServer {
    state: Arc<BitcoindState>,
}

impl BitcoindServer {
    pub fn at(height: u64) -> Self {
        let server = Self::default();
        server.set_height(height);
        server
    }

    pub fn spawn(&self) -> SocketAddr {
        let router = Router::new()
            .route("/", post(handle_rpc))
            .with_state(self.state.clone());
        spawn_router(router)
    }

    pub fn set_height(&self, height: u64) {
        self.state.height.store(height, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }
}

async fn handle_rpc(
    State(state): State<Arc<BitcoindState>>,
    Json(request): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if state.failing.load(Ordering::SeqCst) {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    let id = request["id"].clone();
    let height = state.height.load(Ordering::SeqCst);
    let response = match request["method"].as_str() {
        Some("getblockcount") => json!({"result": height, "error": null, "id": id}),
        Some("getblockhash") => match request["params"][0].as_u64() {
            Some(h) if h <= height => json!({"result": block_hash(h), "error": null, "id": id}),
            _ => json!({
                "result": null,
                "error": {"code": -8, "message": "Block height out of range"},
                "id": id
            }),
        },
        _ => json!({
            "result": null,
            "error": {"code": -32601, "message": "Method not found"},
            "id": id
        }),
    };
    Ok(Json(response))
}
