//! HTTP handlers for payment endpoints.
//!
//! These handlers connect Axum routes to application layer command/query
//! handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::payment::{
    CancelOrderCommand, CancelOrderHandler, GetOrderStatusHandler, GetOrderStatusQuery,
    IngestWebhookCommand, IngestWebhookHandler, ReplayStormCommand, ReplayStormHandler,
};
use crate::domain::billing::WebhookError;
use crate::domain::foundation::{DomainError, ErrorCode, OrderId};
use crate::ports::{EventPublisher, InvoiceRepository, SubscriptionRepository, WebhookEventStore};

use super::dto::{
    ErrorResponse, OrderStatusResponse, PurgeResponse, ReplayStormRequest, ReplayStormResponse,
    WebhookAckResponse,
};

/// Header carrying the gateway's HMAC signature.
pub const SIGNATURE_HEADER: &str = "X-Gateway-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all payment dependencies.
///
/// Cloned for each request; dependencies are Arc-wrapped for cheap
/// sharing. The ingestion and storm handlers are constructed once at
/// startup because they carry configuration (verifier, feature gate).
#[derive(Clone)]
pub struct PaymentAppState {
    pub ingest: Arc<IngestWebhookHandler>,
    pub replay_storm: Arc<ReplayStormHandler>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub event_store: Arc<dyn WebhookEventStore>,
    pub event_publisher: Arc<dyn EventPublisher>,
}

impl PaymentAppState {
    pub fn order_status_handler(&self) -> GetOrderStatusHandler {
        GetOrderStatusHandler::new(
            self.invoices.clone(),
            self.subscriptions.clone(),
            self.event_store.clone(),
        )
    }

    pub fn cancel_order_handler(&self) -> CancelOrderHandler {
        CancelOrderHandler::new(self.invoices.clone(), self.event_publisher.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Endpoint
// ════════════════════════════════════════════════════════════════════════════════

/// POST /payment/webhook - Ingest a gateway webhook delivery.
///
/// The raw body is passed through byte-exact; the signature comes from
/// the `X-Gateway-Signature` header. All request headers are captured
/// alongside the payload for replay.
pub async fn handle_gateway_webhook(
    State(state): State<PaymentAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, PaymentApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::InvalidSignature)?
        .to_string();

    let captured_headers: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let cmd = IngestWebhookCommand {
        payload: body.to_vec(),
        signature,
        headers: captured_headers,
    };

    let outcome = state.ingest.handle(cmd).await?;

    Ok((StatusCode::OK, Json(WebhookAckResponse::from(outcome))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Order Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// GET /payment/order/:order_id - Full status of one order.
pub async fn get_order_status(
    State(state): State<PaymentAppState>,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let order_id = parse_order_id(&order_id)?;

    let handler = state.order_status_handler();
    let view = handler.handle(GetOrderStatusQuery { order_id }).await?;

    Ok(Json(OrderStatusResponse::from(view)))
}

/// POST /payment/order/:order_id/cancel - Cancel a pending order.
pub async fn cancel_order(
    State(state): State<PaymentAppState>,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let order_id = parse_order_id(&order_id)?;

    let handler = state.cancel_order_handler();
    handler.handle(CancelOrderCommand { order_id }).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ════════════════════════════════════════════════════════════════════════════════
// Replay Storm Endpoint
// ════════════════════════════════════════════════════════════════════════════════

/// POST /payment/replay-storm - Storm-replay a stored delivery.
///
/// Feature-gated; answers 403 in environments where the gate is off.
pub async fn run_replay_storm(
    State(state): State<PaymentAppState>,
    Json(request): Json<ReplayStormRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let order_id = request
        .order_id
        .as_deref()
        .map(parse_order_id)
        .transpose()?;

    let report = state
        .replay_storm
        .handle(ReplayStormCommand {
            order_id,
            replays: request.replay_count,
            concurrent: request.concurrent,
        })
        .await?;

    Ok(Json(ReplayStormResponse::from(report)))
}

/// DELETE /payment/test-records - Purge deliveries for test-marked orders.
///
/// Shares the replay-storm feature gate; answers 403 when disabled.
pub async fn purge_test_records(
    State(state): State<PaymentAppState>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let removed = state.replay_storm.purge_test_data().await?;

    Ok(Json(PurgeResponse { removed }))
}

fn parse_order_id(raw: &str) -> Result<OrderId, PaymentApiError> {
    OrderId::new(raw).map_err(|e| {
        PaymentApiError::Domain(DomainError::validation("order_id", e.to_string()))
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts processing errors to HTTP responses.
pub enum PaymentApiError {
    Webhook(WebhookError),
    Domain(DomainError),
}

impl From<WebhookError> for PaymentApiError {
    fn from(err: WebhookError) -> Self {
        Self::Webhook(err)
    }
}

impl From<DomainError> for PaymentApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            // The webhook endpoint speaks the gateway's retry protocol:
            // the status alone decides whether it redelivers.
            PaymentApiError::Webhook(err) => {
                let status = err.status_code();
                let body = ErrorResponse::new("WEBHOOK_ERROR", err.to_string());
                (status, Json(body)).into_response()
            }
            PaymentApiError::Domain(err) => {
                let status = match err.code {
                    ErrorCode::OrderNotFound
                    | ErrorCode::InvoiceNotFound
                    | ErrorCode::SubscriptionNotFound
                    | ErrorCode::CourseNotFound
                    | ErrorCode::EventNotFound => StatusCode::NOT_FOUND,
                    ErrorCode::ValidationFailed
                    | ErrorCode::EmptyField
                    | ErrorCode::OutOfRange
                    | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,
                    ErrorCode::InvalidStateTransition
                    | ErrorCode::InvoiceTerminal
                    | ErrorCode::SubscriptionExists
                    | ErrorCode::VersionConflict => StatusCode::CONFLICT,
                    ErrorCode::Forbidden => StatusCode::FORBIDDEN,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let body = ErrorResponse::new(err.code.to_string(), err.message.clone());
                (status, Json(body)).into_response()
            }
        }
    }
}
