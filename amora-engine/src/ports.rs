//! Port interfaces between the discovery core and its infrastructure.
//!
//! No ambient globals: the socket server, the timer and the stores all
//! arrive as constructor dependencies, so the core runs against doubles
//! in tests.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::profile::{Orientation, ProfileRecord};

/// Read access to the profile system-of-record. Presence and boost state
/// must be fresh on every call; implementations must not cache them.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Fetch a single profile by id, or None if it does not exist.
    async fn get(&self, id: Uuid) -> EngineResult<Option<ProfileRecord>>;

    /// Fetch an over-fetch window for one orientation pool: visible profiles
    /// with at least one photo, ordered by last-active descending.
    async fn window(&self, pool: Orientation, limit: usize) -> EngineResult<Vec<ProfileRecord>>;
}

/// Directed interest edges and block relationships. Source of truth for
/// match detection; a match is never materialized here.
#[async_trait]
pub trait InterestLedger: Send + Sync {
    /// Idempotent upsert of the (from, to) edge. Returns true when the edge
    /// was created by this call; a repeated signal keeps the original
    /// creation timestamp and returns false.
    async fn upsert(&self, from: Uuid, to: Uuid, at: DateTime<Utc>) -> EngineResult<bool>;

    async fn exists(&self, from: Uuid, to: Uuid) -> EngineResult<bool>;

    /// Idempotent removal. Returns true when an edge was actually deleted.
    async fn remove(&self, from: Uuid, to: Uuid) -> EngineResult<bool>;

    /// All profile ids `from` has signaled interest toward.
    async fn outgoing(&self, from: Uuid) -> EngineResult<HashSet<Uuid>>;

    /// All profile ids that have signaled interest toward `to`.
    async fn incoming(&self, to: Uuid) -> EngineResult<HashSet<Uuid>>;

    /// True when a block edge exists in either direction.
    async fn blocked_between(&self, a: Uuid, b: Uuid) -> EngineResult<bool>;

    /// Every profile in a block relationship with `id`, either direction.
    async fn blocked_with(&self, id: Uuid) -> EngineResult<HashSet<Uuid>>;
}

/// Billing collaborator: is the paid tier active for this profile.
#[async_trait]
pub trait Entitlements: Send + Sync {
    async fn is_active(&self, profile_id: Uuid) -> bool;
}

/// Messaging collaborator: does a conversation exist between two profiles.
/// Not consumed by the core pipeline; exposed for views layered on top of
/// match data.
#[async_trait]
pub trait Conversations: Send + Sync {
    async fn exists(&self, a: Uuid, b: Uuid) -> bool;
}

/// Per-profile live delivery channel. All of a profile's connections share
/// one logical channel; emitting to a profile with no connection is a
/// silent no-op.
pub trait ChannelRegistry: Send + Sync {
    fn emit(&self, profile_id: Uuid, event: &str, payload: serde_json::Value);
}

pub type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Delayed execution port. Production wiring spawns onto the runtime; tests
/// capture tasks and fire them manually.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: BoxedTask);
}

/// Time source. All recency, boost-expiry and edge-timestamp math goes
/// through this so tests can pin the clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Tokio-backed scheduler: sleep then run, detached from the scheduling
/// request.
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: BoxedTask) {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
    }
}
