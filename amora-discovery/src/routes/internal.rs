use axum::extract::State;
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::schema::profiles;
use crate::ApiState;

#[derive(Debug, Deserialize)]
pub struct UpdatePresenceRequest {
    pub profile_id: Uuid,
    pub is_online: bool,
}

#[derive(Debug, Serialize)]
pub struct PresenceResponse {
    pub ok: bool,
}

/// POST /internal/presence — presence updates from the connection-lifecycle
/// owner (service-to-service, no auth). Ranking reads these fields fresh on
/// every call, so there is nothing to invalidate here.
pub async fn update_presence(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<UpdatePresenceRequest>,
) -> Json<PresenceResponse> {
    let mut conn = match state.app.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to get db connection for presence update");
            return Json(PresenceResponse { ok: false });
        }
    };

    let result = diesel::update(profiles::table.find(req.profile_id))
        .set((
            profiles::is_online.eq(req.is_online),
            profiles::last_active_at.eq(Utc::now()),
        ))
        .execute(&mut conn);

    match result {
        Ok(_) => {
            let redis = &state.app.redis;
            let key = format!("online:{}", req.profile_id);
            if req.is_online {
                let _ = redis.set(&key, "1", 3600).await;
            } else {
                let _ = redis.del(&key).await;
            }
            tracing::debug!(profile_id = %req.profile_id, is_online = req.is_online, "presence updated");
            Json(PresenceResponse { ok: true })
        }
        Err(e) => {
            tracing::error!(error = %e, profile_id = %req.profile_id, "failed to update presence");
            Json(PresenceResponse { ok: false })
        }
    }
}
