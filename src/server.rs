//! Status HTTP server: liveness plus create/read/delete over a ticker→price
//! store owned by the server state.
//!
//! # Endpoints
//!
//! - `GET /` - service banner
//! - `GET /health` - liveness probe
//! - `GET /stocks` - every stored price, keyed by ticker
//! - `GET /stock/{ticker}` - one stored price
//! - `POST /stock` - create or replace a price
//! - `DELETE /stock/{ticker}` - remove a price

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::error::ServerError;

pub const BANNER: &str = "TradingAnalyticsPlatform Monitoring Service is Running";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub ticker: String,
    pub price: f64,
}

/// Ticker→price map handed to the handlers as router state.
#[derive(Debug, Clone, Default)]
pub struct StockStore {
    inner: Arc<RwLock<BTreeMap<String, Stock>>>,
}

impl StockStore {
    pub fn new() -> Self {
        Self::default()
    }

    // a poisoned lock still holds a consistent map: every write is a single insert/remove
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Stock>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Stock>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, ticker: &str) -> Option<Stock> {
        self.read().get(ticker).cloned()
    }

    pub fn all(&self) -> BTreeMap<String, Stock> {
        self.read().clone()
    }

    pub fn upsert(&self, stock: Stock) -> Stock {
        self.write().insert(stock.ticker.clone(), stock.clone());
        stock
    }

    pub fn remove(&self, ticker: &str) -> Option<Stock> {
        self.write().remove(ticker)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(ticker) => (StatusCode::NOT_FOUND, format!("stock not found: {}", ticker)),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn router(store: StockStore) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/stocks", get(list_stocks))
        .route("/stock", post(upsert_stock))
        .route("/stock/{ticker}", get(get_stock).delete(delete_stock))
        .with_state(store)
}

async fn banner() -> &'static str {
    BANNER
}

async fn health() -> &'static str {
    "OK"
}

async fn list_stocks(State(store): State<StockStore>) -> Json<BTreeMap<String, Stock>> {
    Json(store.all())
}

async fn get_stock(
    State(store): State<StockStore>,
    Path(ticker): Path<String>,
) -> Result<Json<Stock>, ApiError> {
    store.get(&ticker).map(Json).ok_or(ApiError::NotFound(ticker))
}

async fn upsert_stock(
    State(store): State<StockStore>,
    Json(input): Json<Stock>,
) -> Result<Json<Stock>, ApiError> {
    let ticker = input.ticker.trim().to_string();
    if ticker.is_empty() {
        return Err(ApiError::BadRequest("ticker must not be empty".to_string()));
    }
    if !input.price.is_finite() || input.price < 0.0 {
        return Err(ApiError::BadRequest(format!(
            "price must be a finite, non-negative amount, got {}",
            input.price
        )));
    }

    debug!("Storing {} at {:.2}", ticker, input.price);
    Ok(Json(store.upsert(Stock {
        ticker,
        price: input.price,
    })))
}

async fn delete_stock(
    State(store): State<StockStore>,
    Path(ticker): Path<String>,
) -> Result<Json<Stock>, ApiError> {
    store.remove(&ticker).map(Json).ok_or(ApiError::NotFound(ticker))
}

pub struct StatusServer {
    port: u16,
    store: StockStore,
    cancel: CancellationToken,
}

impl StatusServer {
    pub fn new(port: u16, store: StockStore, cancel: CancellationToken) -> Self {
        Self {
            port,
            store,
            cancel,
        }
    }

    /// Serves until the cancellation token fires.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                port: self.port,
                source,
            })?;
        info!("Status server listening on {}", addr);

        axum::serve(listener, router(self.store))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(ServerError::Serve)?;

        info!("Status server stopped");
        Ok(())
    }
}
