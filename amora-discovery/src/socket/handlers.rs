use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;
use serde::Serialize;
use socketioxide::extract::{SocketRef, State};
use uuid::Uuid;

use crate::schema::profiles;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

/// Connection lifecycle: authenticate, join the profile's room, flip
/// presence on. The per-profile room is what the notification dispatcher
/// emits into; nothing else about discovery flows through the socket from
/// the client side.
pub async fn on_connect(socket: SocketRef, state: State<Arc<AppState>>) {
    let credential_id = match authenticate_socket(&socket, &state) {
        Ok(id) => id,
        Err(msg) => {
            tracing::warn!(error = %msg, "socket auth failed");
            let _ = socket.emit(
                "error",
                &ErrorPayload {
                    code: "AUTH_FAILED".into(),
                    message: msg,
                },
            );
            socket.disconnect().ok();
            return;
        }
    };

    // Resolve the profile behind the credential before any handler can run.
    let profile_id = match lookup_profile_id(&state, credential_id) {
        Some(id) => id,
        None => {
            let _ = socket.emit(
                "error",
                &ErrorPayload {
                    code: "PROFILE_NOT_FOUND".into(),
                    message: "no profile for this account".into(),
                },
            );
            socket.disconnect().ok();
            return;
        }
    };

    socket.extensions.insert(profile_id);
    socket.on_disconnect(on_disconnect);

    // All of this profile's connections share one logical channel.
    let user_room = format!("user:{profile_id}");
    socket.join(user_room).ok();

    tracing::info!(profile_id = %profile_id, sid = %socket.id, "socket connected");

    let _ = state.redis.set(&format!("online:{profile_id}"), "1", 3600).await;
    set_presence(&state, profile_id, true);

    let _ = socket.emit("connected", &serde_json::json!({ "profile_id": profile_id }));
}

async fn on_disconnect(socket: SocketRef, state: State<Arc<AppState>>) {
    let profile_id = match socket.extensions.get::<Uuid>() {
        Some(id) => id,
        None => return,
    };

    tracing::info!(profile_id = %profile_id, sid = %socket.id, "socket disconnected");

    let _ = state.redis.del(&format!("online:{profile_id}")).await;
    set_presence(&state, profile_id, false);
}

fn authenticate_socket(socket: &SocketRef, state: &Arc<AppState>) -> Result<Uuid, String> {
    let connect_info = socket.req_parts();

    // Extract token from query string
    let query = connect_info.uri.query().unwrap_or_default();
    let token = query
        .split('&')
        .find_map(|pair| {
            let mut split = pair.splitn(2, '=');
            let key = split.next()?;
            let value = split.next()?;
            if key == "token" {
                Some(value.to_string())
            } else {
                None
            }
        })
        .ok_or_else(|| "missing token query parameter".to_string())?;

    let claims =
        amora_shared::middleware::auth_extractor::validate_jwt_with_secret(&token, &state.config.jwt_secret)
            .map_err(|e| format!("invalid token: {e}"))?;

    if claims.is_expired() {
        return Err("token has expired".into());
    }

    Ok(claims.sub)
}

fn lookup_profile_id(state: &Arc<AppState>, credential_id: Uuid) -> Option<Uuid> {
    let mut conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to get db connection for socket auth");
            return None;
        }
    };

    profiles::table
        .filter(profiles::credential_id.eq(credential_id))
        .select(profiles::id)
        .first::<Uuid>(&mut conn)
        .optional()
        .unwrap_or(None)
}

/// Presence flags live in the profile row as well as Redis; ranking reads
/// them fresh on every call.
fn set_presence(state: &Arc<AppState>, profile_id: Uuid, online: bool) {
    let mut conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to get db connection for presence update");
            return;
        }
    };

    let result = diesel::update(profiles::table.find(profile_id))
        .set((
            profiles::is_online.eq(online),
            profiles::last_active_at.eq(Utc::now()),
        ))
        .execute(&mut conn);

    if let Err(e) = result {
        tracing::error!(error = %e, profile_id = %profile_id, "failed to update presence");
    }
}
