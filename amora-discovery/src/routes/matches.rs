use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use amora_engine::ports::{CandidateStore, Conversations};
use amora_engine::profile::{distance_between, CandidateSummary};
use amora_shared::errors::AppResult;
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::routes::{map_engine_error, resolve_profile};
use crate::ApiState;

#[derive(Debug, Deserialize)]
pub struct MatchesParams {
    #[serde(default)]
    pub with_conversation: bool,
}

#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub matches: Vec<CandidateSummary>,
}

/// GET /matches — the caller's mutual matches, computed from the two edge
/// directions on every call (a match is never stored). The optional
/// `with_conversation` flag layers the messaging collaborator's boolean on
/// top, for the "matches you are already talking to" view.
pub async fn list_matches(
    user: AuthUser,
    State(state): State<Arc<ApiState>>,
    Query(params): Query<MatchesParams>,
) -> AppResult<Json<ApiResponse<MatchesResponse>>> {
    let viewer = resolve_profile(&state, user.id)?;
    let viewer_record = viewer.clone().into_record();

    let ids = state
        .detector
        .mutual_matches(viewer.id)
        .await
        .map_err(map_engine_error)?;

    let now = chrono::Utc::now();
    let mut matches = Vec::with_capacity(ids.len());
    for id in ids {
        if params.with_conversation && !state.conversations.exists(viewer.id, id).await {
            continue;
        }
        match state.store.get(id).await.map_err(map_engine_error)? {
            Some(record) => {
                let distance = distance_between(&viewer_record, &record);
                matches.push(record.summary(now, distance, true));
            }
            None => {
                tracing::warn!(profile_id = %id, "matched profile missing from store");
            }
        }
    }

    Ok(Json(ApiResponse::ok(MatchesResponse { matches })))
}
