//! Discovery, ranking and mutual-match core.
//!
//! Everything in this crate is storage- and transport-agnostic: the service
//! crate injects implementations of the [`ports`] traits (Postgres-backed
//! stores, a Socket.IO channel registry, the Tokio scheduler), and tests
//! inject the in-memory doubles from [`testing`].

pub mod detector;
pub mod dispatcher;
pub mod error;
pub mod filters;
pub mod ports;
pub mod profile;
pub mod ranking;
pub mod simulator;
pub mod testing;

pub use detector::{MatchDetector, PairLocks, SignalOutcome};
pub use dispatcher::NotificationDispatcher;
pub use error::{EngineError, EngineResult};
pub use filters::SearchFilters;
pub use profile::{CandidateSummary, Gender, Orientation, ProfileRecord, RelationshipGoal, Role};
pub use ranking::{RankingPipeline, SearchPage};
pub use simulator::ReciprocitySimulator;
