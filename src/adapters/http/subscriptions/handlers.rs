//! HTTP handlers for subscription endpoints.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::enrollment::SyncSubscriptionHandler;
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId};
use crate::ports::{CourseCatalog, EventPublisher, SubscriptionRepository};

use super::dto::{RefreshResponse, SyncStatusResponse};
use crate::adapters::http::payment::dto::ErrorResponse;

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state for subscription endpoints.
#[derive(Clone)]
pub struct SubscriptionsAppState {
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub catalog: Arc<dyn CourseCatalog>,
    pub event_publisher: Arc<dyn EventPublisher>,
}

impl SubscriptionsAppState {
    pub fn sync_handler(&self) -> SyncSubscriptionHandler {
        SyncSubscriptionHandler::new(
            self.subscriptions.clone(),
            self.catalog.clone(),
            self.event_publisher.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /usersubscriptions/:id/refresh - Apply the catalog's current
/// subject set to one grant.
pub async fn refresh_subscription(
    State(state): State<SubscriptionsAppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, SubscriptionsApiError> {
    let id = parse_subscription_id(&id)?;

    let handler = state.sync_handler();
    let outcome = handler.refresh(&id).await?;

    Ok(Json(RefreshResponse::from(outcome)))
}

/// GET /usersubscriptions/:id/sync-status - Report what a refresh would
/// change, without writing anything.
pub async fn get_sync_status(
    State(state): State<SubscriptionsAppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, SubscriptionsApiError> {
    let id = parse_subscription_id(&id)?;

    let handler = state.sync_handler();
    let status = handler.sync_status(&id).await?;

    Ok(Json(SyncStatusResponse::from(status)))
}

fn parse_subscription_id(raw: &str) -> Result<SubscriptionId, SubscriptionsApiError> {
    raw.parse().map_err(|_| {
        SubscriptionsApiError(DomainError::validation(
            "subscription_id",
            "must be a UUID",
        ))
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
pub struct SubscriptionsApiError(DomainError);

impl From<DomainError> for SubscriptionsApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for SubscriptionsApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0.code {
            ErrorCode::SubscriptionNotFound | ErrorCode::CourseNotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationFailed | ErrorCode::EmptyField | ErrorCode::InvalidFormat => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::VersionConflict => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse::new(self.0.code.to_string(), self.0.message.clone());
        (status, Json(body)).into_response()
    }
}
