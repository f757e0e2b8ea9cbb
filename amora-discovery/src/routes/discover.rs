use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use amora_engine::filters::SearchFilters;
use amora_engine::profile::{Gender, RelationshipGoal, Role};
use amora_engine::ranking::SearchPage;
use amora_shared::types::auth::AuthUser;
use amora_shared::types::{ApiResponse, PaginationParams};
use amora_shared::errors::AppResult;

use crate::routes::{map_engine_error, resolve_profile};
use crate::ApiState;

#[derive(Debug, Deserialize)]
pub struct DiscoverParams {
    #[serde(default)]
    pub recent: bool,
    #[serde(default)]
    pub online: bool,
    pub city: Option<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    pub distance_min: Option<f64>,
    pub distance_max: Option<f64>,
    pub gender: Option<String>,
    pub goal: Option<String>,
    pub role: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

/// GET /discover — the ranked candidate feed.
///
/// Unknown token values behave like absent filters; numeric ranges are
/// clamped inside the engine. Nothing here rejects, except an incomplete
/// viewer profile.
pub async fn discover(
    user: AuthUser,
    State(state): State<Arc<ApiState>>,
    Query(params): Query<DiscoverParams>,
) -> AppResult<Json<ApiResponse<SearchPage>>> {
    let viewer = resolve_profile(&state, user.id)?;

    let filters = SearchFilters {
        recent_activity: params.recent,
        online_now: params.online,
        city: params.city,
        age_min: params.age_min,
        age_max: params.age_max,
        distance_min_km: params.distance_min,
        distance_max_km: params.distance_max,
        gender: parse_token::<Gender>(params.gender.as_deref()),
        goal: parse_token::<RelationshipGoal>(params.goal.as_deref()),
        role: parse_token::<Role>(params.role.as_deref()),
    };

    let pagination = PaginationParams {
        page: params.page,
        per_page: params.per_page,
    };

    let page = state
        .ranking
        .search(viewer.id, filters, pagination.page, pagination.limit() as usize)
        .await
        .map_err(map_engine_error)?;

    Ok(Json(ApiResponse::ok(page)))
}

fn parse_token<T: std::str::FromStr>(token: Option<&str>) -> Option<T> {
    let token = token?.trim();
    if token.is_empty() {
        return None;
    }
    match token.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::debug!(token = %token, "unrecognized filter token ignored");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tokens_are_ignored_not_rejected() {
        assert_eq!(parse_token::<Gender>(Some("female")), Some(Gender::Female));
        assert_eq!(parse_token::<Gender>(Some("martian")), None);
        assert_eq!(parse_token::<Gender>(Some("")), None);
        assert_eq!(parse_token::<Gender>(None), None);
    }
}
