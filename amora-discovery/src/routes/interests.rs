use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use amora_engine::profile::CandidateSummary;
use amora_shared::errors::AppResult;
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::events::publisher;
use crate::routes::{map_engine_error, resolve_profile};
use crate::ApiState;

#[derive(Debug, Deserialize)]
pub struct SignalRequest {
    pub target_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SignalResponse {
    pub is_match: bool,
    #[serde(rename = "match")]
    pub match_summary: Option<CandidateSummary>,
}

/// POST /interests — signal interest toward a candidate.
pub async fn signal_interest(
    user: AuthUser,
    State(state): State<Arc<ApiState>>,
    Json(req): Json<SignalRequest>,
) -> AppResult<Json<ApiResponse<SignalResponse>>> {
    let source = resolve_profile(&state, user.id)?;

    let outcome = state
        .detector
        .signal_interest(source.id, req.target_id)
        .await
        .map_err(map_engine_error)?;

    if outcome.created {
        publisher::publish_interest_signaled(
            &state.app.rabbitmq,
            source.id,
            req.target_id,
            outcome.is_match,
        )
        .await;
        if outcome.is_match {
            publisher::publish_match_created(&state.app.rabbitmq, source.id, req.target_id).await;
        }
    }

    Ok(Json(ApiResponse::ok(SignalResponse {
        is_match: outcome.is_match,
        match_summary: outcome.counterpart,
    })))
}

#[derive(Debug, Serialize)]
pub struct WithdrawResponse {
    pub removed: bool,
}

/// DELETE /interests/:target_id — withdraw a previously signaled interest.
/// Idempotent; withdrawing ends any derived match immediately.
pub async fn withdraw_interest(
    user: AuthUser,
    State(state): State<Arc<ApiState>>,
    Path(target_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<WithdrawResponse>>> {
    let source = resolve_profile(&state, user.id)?;

    let removed = state
        .detector
        .withdraw_interest(source.id, target_id)
        .await
        .map_err(map_engine_error)?;

    if removed {
        publisher::publish_interest_withdrawn(&state.app.rabbitmq, source.id, target_id).await;
    }

    Ok(Json(ApiResponse::ok(WithdrawResponse { removed })))
}

#[derive(Debug, Serialize)]
pub struct InterestCheckResponse {
    pub already_signaled: bool,
}

/// GET /interests/check/:target_id — has the caller already signaled this
/// target. Never discloses the reverse direction.
pub async fn check_interest(
    user: AuthUser,
    State(state): State<Arc<ApiState>>,
    Path(target_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<InterestCheckResponse>>> {
    let source = resolve_profile(&state, user.id)?;

    let already_signaled = state
        .detector
        .already_signaled(source.id, target_id)
        .await
        .map_err(map_engine_error)?;

    Ok(Json(ApiResponse::ok(InterestCheckResponse { already_signaled })))
}

#[derive(Debug, Serialize)]
pub struct ReceivedCountResponse {
    pub count: usize,
}

/// GET /interests/received/count — resync counter for recipients that were
/// offline when `interest.received` events were dropped.
pub async fn received_count(
    user: AuthUser,
    State(state): State<Arc<ApiState>>,
) -> AppResult<Json<ApiResponse<ReceivedCountResponse>>> {
    let viewer = resolve_profile(&state, user.id)?;

    let count = state
        .detector
        .pending_received(viewer.id)
        .await
        .map_err(map_engine_error)?;

    Ok(Json(ApiResponse::ok(ReceivedCountResponse { count })))
}
