use uuid::Uuid;

/// Terminal precondition failures and storage faults surfaced by the core.
///
/// Invalid filter values are never an error (they are clamped), deferred-task
/// revalidation misses are never an error (silent no-op), and missed live
/// deliveries are never an error (best-effort channel).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("viewer profile is missing orientation or gender")]
    IncompleteProfile,

    #[error("a profile cannot target itself")]
    SelfTarget,

    #[error("target profile {0} not found or not visible")]
    TargetNotFound(Uuid),

    #[error("profiles belong to different orientation pools")]
    OrientationMismatch,

    #[error("a block relationship exists between the two profiles")]
    Blocked,

    #[error("storage failure: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
