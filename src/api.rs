//! HTTP surface.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use validator::Validate;

use crate::domain::aggregates::{MutationLine, StockJournal};
use crate::domain::value_objects::{PageRequest, Paginated, Quantity};
use crate::repository::JournalFilter;
use crate::service::{CancelOrderResponse, ChartPoint, CommerceService};
use crate::{EcommerceError, Result};

#[derive(Clone)]
pub struct AppState { pub commerce: Arc<CommerceService> }

impl AppState {
    pub fn new(commerce: CommerceService) -> Self { Self { commerce: Arc::new(commerce) } }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({"status": "healthy", "service": "multistore-commerce"})) }))
        .route("/api/v1/users/:user_id/orders/:order_id/cancel", post(cancel_order))
        .route("/api/v1/stores/:store_id/stock-mutations", post(create_stock_mutation))
        .route("/api/v1/stock-journals/filter", get(list_stock_journals))
        .route("/api/v1/reports/revenue", get(revenue_report))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

impl EcommerceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UserNotFound | Self::OrderNotFound | Self::PaymentNotFound(_) | Self::StoreNotFound(_) | Self::StoreProductNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            Self::CannotCancel { .. } | Self::AlreadyCancelled(_) | Self::ConcurrentModification(_) => StatusCode::CONFLICT,
            Self::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidQuantity(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EcommerceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string(), "status": status.as_u16() }))).into_response()
    }
}

async fn cancel_order(State(s): State<AppState>, Path((user_id, order_id)): Path<(i64, i64)>) -> Result<Json<CancelOrderResponse>> {
    Ok(Json(s.commerce.cancel_order(user_id, order_id).await?))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StockMutationRequest {
    /// Destination store.
    #[validate(range(min = 1))]
    pub store_id: i64,
    #[validate]
    pub stocks: Vec<StockLineRequest>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StockLineRequest {
    #[validate(range(min = 1))]
    pub product_id: i64,
    #[validate(range(min = 1, message = "qty must be at least 1"))]
    pub qty: i32,
}

async fn create_stock_mutation(State(s): State<AppState>, Path(store_id): Path<i64>, Json(r): Json<StockMutationRequest>) -> Result<(StatusCode, Json<Vec<StockJournal>>)> {
    r.validate()?;
    let lines = r.stocks.iter()
        .map(|l| Quantity::new(l.qty).map(|qty| MutationLine { product_id: l.product_id, qty }))
        .collect::<Result<Vec<_>>>()?;
    let journals = s.commerce.transfer_stock(store_id, r.store_id, lines).await?;
    Ok((StatusCode::CREATED, Json(journals)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JournalListParams {
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub take: Option<u32>,
    pub search: Option<String>,
    pub store_id: Option<i64>,
}

async fn list_stock_journals(State(s): State<AppState>, Query(p): Query<JournalListParams>) -> Result<Json<Paginated<StockJournal>>> {
    p.validate()?;
    let filter = JournalFilter { store_id: p.store_id, search: p.search, page: PageRequest::new(p.page, p.take) };
    Ok(Json(s.commerce.list_stock_journals(filter).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueParams { pub year: Option<i32>, pub store_id: Option<i64> }

async fn revenue_report(State(s): State<AppState>, Query(p): Query<RevenueParams>) -> Result<Json<Vec<ChartPoint>>> {
    Ok(Json(s.commerce.revenue_report(p.year, p.store_id).await?))
}
