use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{Block, CancelToken, LedgerError, SearchHit, SharedLedger};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) ledger: SharedLedger,
    pub(crate) display_name: String,
    /// Cancelled on shutdown so a running search gives up.
    pub(crate) cancel: CancelToken,
}

pub(crate) fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/name", get(name))
        .route("/view", get(view))
        .route("/pending", get(pending))
        .route("/tx", post(submit_tx))
        .route("/mine", post(mine))
        .route("/search", get(search))
        .route("/verify", get(verify))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub(crate) enum ApiError {
    Ledger(LedgerError),
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Ledger(err @ LedgerError::EmptyPool) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Ledger(err @ LedgerError::Cancelled) => {
                (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            Self::Ledger(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        warn!(%status, %message, "request failed");
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

#[derive(Serialize)]
struct NameOut {
    name: String,
}

async fn name(State(state): State<AppState>) -> Json<NameOut> {
    Json(NameOut {
        name: state.ledger.name(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewOut {
    blocks: Vec<Block>,
    difficulty: u32,
    pending_tx: Vec<String>,
    display_name: String,
}

async fn view(State(state): State<AppState>) -> Json<ViewOut> {
    let view = state.ledger.view();
    Json(ViewOut {
        blocks: view.blocks,
        difficulty: view.difficulty,
        pending_tx: view.pending_tx,
        display_name: state.display_name.clone(),
    })
}

#[derive(Serialize)]
struct PendingOut {
    pending: Vec<String>,
}

async fn pending(State(state): State<AppState>) -> Json<PendingOut> {
    Json(PendingOut {
        pending: state.ledger.pending(),
    })
}

#[derive(Deserialize)]
struct TxIn {
    #[serde(default)]
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TxOut {
    ok: bool,
    added: String,
    pending_size: usize,
}

/// Blank transactions are accepted and dropped, so this always answers `ok`.
async fn submit_tx(State(state): State<AppState>, Json(tx): Json<TxIn>) -> Json<TxOut> {
    let (_, pending_size) = state.ledger.add_transaction(tx.data.clone());
    Json(TxOut {
        ok: true,
        added: tx.data,
        pending_size,
    })
}

#[derive(Serialize)]
struct MineOut {
    ok: bool,
    block: Block,
}

async fn mine(State(state): State<AppState>) -> Result<Json<MineOut>, ApiError> {
    let ledger = state.ledger.clone();
    let cancel = state.cancel.clone();
    let block = tokio::task::spawn_blocking(move || ledger.mine_pending(&cancel))
        .await
        .map_err(|e| ApiError::Internal(format!("mining task failed: {e}")))??;
    Ok(Json(MineOut { ok: true, block }))
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
struct SearchOut {
    query: String,
    results: Vec<SearchHit>,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<SearchOut> {
    let results = state.ledger.search(&params.q);
    Json(SearchOut {
        query: params.q,
        results,
    })
}

#[derive(Serialize)]
struct VerifyOut {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn verify(State(state): State<AppState>) -> Json<VerifyOut> {
    let outcome = state.ledger.verify();
    Json(VerifyOut {
        valid: outcome.is_ok(),
        error: outcome.err().map(|e| e.to_string()),
    })
}
