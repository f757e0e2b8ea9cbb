pub mod discover;
pub mod health;
pub mod interests;
pub mod internal;
pub mod matches;

use diesel::prelude::*;
use uuid::Uuid;

use amora_engine::error::EngineError;
use amora_shared::errors::{AppError, ErrorCode};

use crate::models::Profile;
use crate::schema::profiles;
use crate::ApiState;

/// Resolve the authenticated credential to its profile row.
pub(crate) fn resolve_profile(state: &ApiState, credential_id: Uuid) -> Result<Profile, AppError> {
    let mut conn = state
        .app
        .db
        .get()
        .map_err(|e| AppError::internal(e.to_string()))?;

    profiles::table
        .filter(profiles::credential_id.eq(credential_id))
        .first::<Profile>(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
}

/// Map the engine's precondition taxonomy onto API error codes, one code
/// per rejection reason.
pub(crate) fn map_engine_error(err: EngineError) -> AppError {
    match err {
        EngineError::IncompleteProfile => AppError::new(
            ErrorCode::IncompleteProfile,
            "orientation and gender must be set first",
        ),
        EngineError::SelfTarget => {
            AppError::new(ErrorCode::SelfTarget, "a profile cannot target itself")
        }
        EngineError::TargetNotFound(id) => {
            AppError::new(ErrorCode::TargetNotFound, format!("profile {id} not found"))
        }
        EngineError::OrientationMismatch => AppError::new(
            ErrorCode::OrientationMismatch,
            "profiles belong to different orientation pools",
        ),
        EngineError::Blocked => AppError::new(
            ErrorCode::Blocked,
            "a block relationship exists between these profiles",
        ),
        EngineError::Storage(msg) => AppError::internal(msg),
    }
}
