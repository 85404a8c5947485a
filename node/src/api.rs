// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # REST + JSON-RPC API
//!
//! The axum router that exposes the ledger. All handlers share one
//! [`AppState`]; the ledger inside it sits behind a single mutex, so every
//! call runs its read-modify-write without interleaving with another.
//!
//! ## Endpoints
//!
//! | Method | Path                  | Description                        |
//! |--------|-----------------------|------------------------------------|
//! | GET    | `/health`             | Liveness probe                     |
//! | GET    | `/status`             | Ledger status and integrity check  |
//! | GET    | `/token`              | Token name, ticker and supply      |
//! | GET    | `/accounts/:address`  | Balance and granted allowances     |
//! | POST   | `/rpc`                | JSON-RPC 2.0 gateway               |
//!
//! ## Caller Identity
//!
//! Mutating RPC methods act as the address in the `x-caller` header. The node
//! does not authenticate; it trusts the proxy in front of it to set the header.
//! A request without it fails with code `-32012`.
//!
//! ## RPC Methods
//!
//! | Method              | Params                      | Result              |
//! |---------------------|-----------------------------|---------------------|
//! | `token_initialize`  | `[name, ticker, supply]`    | creator address     |
//! | `token_transfer`    | `[to, amount]`              | `OperationResult`   |
//! | `token_approve`     | `[spender, amount]`         | `OperationResult`   |
//! | `token_transferFrom`| `[from, to, amount]`        | `OperationResult`   |
//! | `token_balanceOf`   | `[address]`                 | u64                 |
//! | `token_allowance`   | `[owner, spender]`          | u64                 |
//! | `token_name`        | —                           | string              |
//! | `token_ticker`      | —                           | string              |
//! | `token_totalSupply` | —                           | u64                 |

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use token_ledger::config::CALLER_HEADER;
use token_ledger::{
    Address, CallerIdentity, IdentityError, Ledger, LedgerError, Outcome, Rejection, SledStore,
};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// The ledger as shared by all handlers.
pub type SharedLedger = Arc<Mutex<Ledger<SledStore>>>;

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The single ledger instance for this process.
    pub ledger: SharedLedger,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the API [`Router`] with CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/token", get(token_handler))
        .route("/accounts/:address", get(account_handler))
        .route("/rpc", post(rpc_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request Caller
// ---------------------------------------------------------------------------

/// Caller identity lifted from the request headers.
///
/// Resolution is deferred to the ledger, so a missing header is reported the
/// same way as any other missing identity.
#[derive(Debug, Clone)]
pub struct RequestCaller(Result<Address, IdentityError>);

impl RequestCaller {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let resolved = match headers.get(CALLER_HEADER) {
            None => Err(IdentityError::Missing),
            Some(value) => match value.to_str() {
                Ok(raw) => Address::new(raw.trim()).map_err(IdentityError::from),
                Err(_) => Err(IdentityError::Missing),
            },
        };
        Self(resolved)
    }
}

impl CallerIdentity for RequestCaller {
    fn current_caller(&self) -> Result<Address, IdentityError> {
        self.0.clone()
    }
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    /// The method to invoke.
    pub method: String,
    /// Positional parameters.
    pub params: Option<serde_json::Value>,
    /// Request identifier. Echoed back in the response.
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version. Always "2.0".
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Request identifier, echoed from the request.
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Standard and application error codes.
pub mod codes {
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const NOT_INITIALIZED: i32 = -32010;
    pub const ALREADY_INITIALIZED: i32 = -32011;
    pub const MISSING_CALLER: i32 = -32012;
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<LedgerError> for JsonRpcError {
    fn from(err: LedgerError) -> Self {
        let code = match &err {
            LedgerError::NotInitialized => codes::NOT_INITIALIZED,
            LedgerError::AlreadyInitialized { .. } => codes::ALREADY_INITIALIZED,
            LedgerError::Identity(_) => codes::MISSING_CALLER,
            LedgerError::Store(_) | LedgerError::SupplyMismatch { .. } => {
                tracing::error!(error = %err, "ledger fault");
                codes::INTERNAL_ERROR
            }
        };
        JsonRpcError::new(code, err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Result of a mutating RPC call. `success == false` means nothing changed.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationResult {
    pub success: bool,
    /// Why the call was refused, when it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<serde_json::Value>,
}

impl From<Outcome> for OperationResult {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Applied => Self {
                success: true,
                rejection: None,
            },
            Outcome::Rejected(reason) => Self {
                success: false,
                rejection: rejection_value(&reason),
            },
        }
    }
}

fn rejection_value(reason: &Rejection) -> Option<serde_json::Value> {
    let mut value = serde_json::to_value(reason).ok()?;
    if let Some(object) = value.as_object_mut() {
        object.insert("message".into(), serde_json::json!(reason.to_string()));
    }
    Some(value)
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Whether `initialize` has run.
    pub initialized: bool,
    pub ticker: Option<String>,
    pub total_supply: Option<u64>,
    /// Number of account records.
    pub account_count: usize,
    /// Hex-encoded BLAKE3 root over all accounts.
    pub state_root: String,
    /// Whether balances sum to the total supply. `None` before initialization.
    pub supply_consistent: Option<bool>,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /token`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub name: String,
    pub ticker: String,
    pub total_supply: u64,
}

/// Response payload for `GET /accounts/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub address: String,
    pub balance: u64,
    /// Allowances this account has granted, keyed by spender.
    pub allowances: BTreeMap<String, u64>,
}

/// Generic error body returned by REST endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn ledger_error_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::NotInitialized => error_response(StatusCode::NOT_FOUND, err),
        other => {
            tracing::error!(error = %other, "ledger read failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, other)
        }
    }
}

// ---------------------------------------------------------------------------
// REST Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — 200 while the process is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — ledger summary, including a fresh supply audit.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.ledger.lock();

    let state_root = match ledger.state_root() {
        Ok(root) => hex::encode(root),
        Err(e) => return ledger_error_response(e),
    };
    let token = ledger.token_info().ok().cloned();
    let supply_consistent = token.as_ref().map(|_| ledger.audit_supply().is_ok());
    let account_count = ledger.store().account_count();
    drop(ledger);

    Json(StatusResponse {
        version: state.version.clone(),
        initialized: token.is_some(),
        ticker: token.as_ref().map(|t| t.ticker.clone()),
        total_supply: token.as_ref().map(|t| t.total_supply),
        account_count,
        state_root,
        supply_consistent,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
    .into_response()
}

/// `GET /token` — token metadata; 404 before initialization.
async fn token_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.ledger.lock();
    match ledger.token_info() {
        Ok(info) => Json(TokenResponse {
            name: info.name.clone(),
            ticker: info.ticker.clone(),
            total_supply: info.total_supply,
        })
        .into_response(),
        Err(e) => ledger_error_response(e),
    }
}

/// `GET /accounts/:address` — balance and allowances. Unknown addresses
/// report a zero balance, matching `token_balanceOf`.
async fn account_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let address = match Address::new(address) {
        Ok(address) => address,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    let account = match state.ledger.lock().account(&address) {
        Ok(account) => account,
        Err(e) => return ledger_error_response(e),
    };

    let (balance, allowances) = match account {
        Some(account) => (
            account.balance,
            account
                .allowances
                .into_iter()
                .map(|(spender, amount)| (spender.into(), amount))
                .collect(),
        ),
        None => (0, BTreeMap::new()),
    };

    Json(AccountResponse {
        address: address.into(),
        balance,
        allowances,
    })
    .into_response()
}

// ---------------------------------------------------------------------------
// JSON-RPC Dispatch
// ---------------------------------------------------------------------------

/// `POST /rpc` — JSON-RPC 2.0 gateway.
async fn rpc_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError::new(
                codes::INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            )),
            id: req.id,
        });
    }

    let caller = RequestCaller::from_headers(&headers);
    let (result, error) = match dispatch(&state, &caller, &req.method, req.params) {
        Ok(value) => (Some(value), None),
        Err(err) => (None, Some(err)),
    };

    Json(JsonRpcResponse {
        jsonrpc: "2.0".into(),
        result,
        error,
        id: req.id,
    })
}

/// Route one RPC method to the ledger.
fn dispatch(
    state: &AppState,
    caller: &RequestCaller,
    method: &str,
    params: Option<serde_json::Value>,
) -> Result<serde_json::Value, JsonRpcError> {
    match method {
        "token_initialize" => {
            let (name, ticker, total_supply): (String, String, u64) = parse_params(params)?;
            let started = Instant::now();
            let mut ledger = state.ledger.lock();
            let result = ledger.initialize(caller, name, ticker, total_supply);
            let account_count = ledger.store().account_count();
            drop(ledger);

            let applied = Outcome::Applied;
            state.metrics.observe(
                "initialize",
                result.as_ref().map(|_| &applied),
                started.elapsed(),
            );
            let creator = result?;
            state.metrics.accounts.set(account_count as i64);
            Ok(serde_json::json!(creator))
        }
        "token_transfer" => {
            let (to, amount): (Address, u64) = parse_params(params)?;
            mutate(state, "transfer", |ledger| ledger.transfer(caller, &to, amount))
        }
        "token_approve" => {
            let (spender, amount): (Address, u64) = parse_params(params)?;
            mutate(state, "approve", |ledger| {
                ledger.approve(caller, &spender, amount)
            })
        }
        "token_transferFrom" => {
            let (from, to, amount): (Address, Address, u64) = parse_params(params)?;
            mutate(state, "transfer_from", |ledger| {
                ledger.transfer_from(caller, &from, &to, amount)
            })
        }
        "token_balanceOf" => {
            let (address,): (Address,) = parse_params(params)?;
            Ok(serde_json::json!(state.ledger.lock().balance_of(&address)?))
        }
        "token_allowance" => {
            let (owner, spender): (Address, Address) = parse_params(params)?;
            Ok(serde_json::json!(state
                .ledger
                .lock()
                .allowance(&owner, &spender)?))
        }
        "token_name" => Ok(serde_json::json!(state.ledger.lock().name()?)),
        "token_ticker" => Ok(serde_json::json!(state.ledger.lock().ticker()?)),
        "token_totalSupply" => Ok(serde_json::json!(state.ledger.lock().total_supply()?)),
        _ => Err(JsonRpcError::new(
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )),
    }
}

/// Run a mutating call under the ledger lock and record it.
fn mutate<F>(
    state: &AppState,
    operation: &'static str,
    call: F,
) -> Result<serde_json::Value, JsonRpcError>
where
    F: FnOnce(&mut Ledger<SledStore>) -> Result<Outcome, LedgerError>,
{
    let started = Instant::now();
    let mut ledger = state.ledger.lock();
    let result = call(&mut ledger);
    let account_count = matches!(result, Ok(Outcome::Applied))
        .then(|| ledger.store().account_count());
    drop(ledger);

    state
        .metrics
        .observe(operation, result.as_ref(), started.elapsed());
    if let Some(count) = account_count {
        state.metrics.accounts.set(count as i64);
    }

    let outcome = result?;
    serde_json::to_value(OperationResult::from(outcome))
        .map_err(|e| JsonRpcError::new(codes::INTERNAL_ERROR, format!("Internal error: {}", e)))
}

/// Decode positional params into a tuple; absent params decode as `[]`.
fn parse_params<T: DeserializeOwned>(params: Option<serde_json::Value>) -> Result<T, JsonRpcError> {
    let params = params.unwrap_or_else(|| serde_json::Value::Array(Vec::new()));
    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::new(codes::INVALID_PARAMS, format!("Invalid params: {}", e)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
