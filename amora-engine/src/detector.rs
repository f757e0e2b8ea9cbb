use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::dispatcher::NotificationDispatcher;
use crate::error::{EngineError, EngineResult};
use crate::ports::{CandidateStore, Clock, InterestLedger};
use crate::profile::CandidateSummary;
use crate::simulator::ReciprocitySimulator;

/// One async mutex per unordered profile pair. Both directions of a pair
/// serialize through the same lock, so when A→B and B→A are signaled
/// concurrently each call's reverse-edge read observes the other call's
/// completed upsert. A missed match is forbidden; a doubled match
/// notification is acceptable.
#[derive(Default)]
pub struct PairLocks {
    locks: Mutex<HashMap<(Uuid, Uuid), Arc<Mutex<()>>>>,
}

impl PairLocks {
    fn key(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
        if a < b { (a, b) } else { (b, a) }
    }

    pub async fn lock(&self, a: Uuid, b: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(Self::key(a, b)).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[derive(Debug, Serialize)]
pub struct SignalOutcome {
    /// False when the edge already existed (idempotent re-signal).
    pub created: bool,
    pub is_match: bool,
    /// The other party's public summary, present only on a match.
    pub counterpart: Option<CandidateSummary>,
}

/// Converts directed interest signals into detected mutual matches.
pub struct MatchDetector {
    store: Arc<dyn CandidateStore>,
    ledger: Arc<dyn InterestLedger>,
    dispatcher: Arc<NotificationDispatcher>,
    simulator: Arc<ReciprocitySimulator>,
    locks: Arc<PairLocks>,
    clock: Arc<dyn Clock>,
}

impl MatchDetector {
    pub fn new(
        store: Arc<dyn CandidateStore>,
        ledger: Arc<dyn InterestLedger>,
        dispatcher: Arc<NotificationDispatcher>,
        simulator: Arc<ReciprocitySimulator>,
        locks: Arc<PairLocks>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ledger,
            dispatcher,
            simulator,
            locks,
            clock,
        }
    }

    /// Upsert the (from, to) interest edge and detect a mutual match.
    ///
    /// Preconditions are checked in order, each with its own rejection:
    /// self-targeting, target existence/visibility, matching orientation
    /// pools, no block relationship. The upsert and the reverse-edge check
    /// run under the pair lock as one atomic unit.
    pub async fn signal_interest(&self, from: Uuid, to: Uuid) -> EngineResult<SignalOutcome> {
        if from == to {
            return Err(EngineError::SelfTarget);
        }

        let target = self
            .store
            .get(to)
            .await?
            .filter(|p| p.visible)
            .ok_or(EngineError::TargetNotFound(to))?;

        let source = self
            .store
            .get(from)
            .await?
            .ok_or_else(|| EngineError::storage(format!("source profile {from} missing")))?;

        let source_pool = source.orientation.ok_or(EngineError::IncompleteProfile)?;
        if target.orientation != Some(source_pool) {
            return Err(EngineError::OrientationMismatch);
        }

        if self.ledger.blocked_between(from, to).await? {
            return Err(EngineError::Blocked);
        }

        let now = self.clock.now();
        let (created, is_match) = {
            let _guard = self.locks.lock(from, to).await;
            let created = self.ledger.upsert(from, to, now).await?;
            let is_match = self.ledger.exists(to, from).await?;
            (created, is_match)
        };

        if is_match {
            self.dispatcher.notify_match(&source, &target, now);
            let distance = crate::profile::distance_between(&source, &target);
            return Ok(SignalOutcome {
                created,
                is_match: true,
                counterpart: Some(target.summary(now, distance, true)),
            });
        }

        // No match yet: tell the target someone liked them, and line up the
        // simulated reply when the target is a responsive profile.
        self.dispatcher.notify_interest_received(&target, &source, now);
        if target.responsive {
            self.simulator.schedule(to, from);
        }

        Ok(SignalOutcome {
            created,
            is_match: false,
            counterpart: None,
        })
    }

    /// Delete the (from, to) edge. Idempotent; withdrawing either edge of a
    /// matched pair ends the derived match immediately, with no explicit
    /// unmatch event.
    pub async fn withdraw_interest(&self, from: Uuid, to: Uuid) -> EngineResult<bool> {
        let _guard = self.locks.lock(from, to).await;
        self.ledger.remove(from, to).await
    }

    /// Derived mutual matches: the intersection of the viewer's outgoing
    /// and incoming edge sets. Never read from a materialized match table.
    pub async fn mutual_matches(&self, viewer: Uuid) -> EngineResult<Vec<Uuid>> {
        let outgoing = self.ledger.outgoing(viewer).await?;
        let incoming = self.ledger.incoming(viewer).await?;
        Ok(outgoing.intersection(&incoming).copied().collect())
    }

    /// Resync counter for disconnected recipients: incoming signals the
    /// viewer has not reciprocated.
    pub async fn pending_received(&self, viewer: Uuid) -> EngineResult<usize> {
        let outgoing = self.ledger.outgoing(viewer).await?;
        let incoming = self.ledger.incoming(viewer).await?;
        Ok(incoming.difference(&outgoing).count())
    }

    pub async fn already_signaled(&self, from: Uuid, to: Uuid) -> EngineResult<bool> {
        self.ledger.exists(from, to).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{EVENT_INTEREST_RECEIVED, EVENT_MATCH};
    use crate::ports::Scheduler;
    use crate::profile::Orientation;
    use crate::testing::{
        profile, ManualClock, ManualScheduler, MemoryLedger, MemoryStore, RecordingRegistry,
    };
    use chrono::Utc;
    use std::collections::HashSet;

    struct Harness {
        store: Arc<MemoryStore>,
        ledger: Arc<MemoryLedger>,
        registry: Arc<RecordingRegistry>,
        scheduler: Arc<ManualScheduler>,
        clock: Arc<ManualClock>,
        detector: Arc<MatchDetector>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::default());
        let ledger = Arc::new(MemoryLedger::default());
        let registry = Arc::new(RecordingRegistry::default());
        let scheduler = Arc::new(ManualScheduler::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let locks = Arc::new(PairLocks::default());

        let dispatcher = Arc::new(NotificationDispatcher::new(registry.clone()));
        let simulator = Arc::new(ReciprocitySimulator::new(
            store.clone() as Arc<dyn CandidateStore>,
            ledger.clone() as Arc<dyn InterestLedger>,
            dispatcher.clone(),
            scheduler.clone() as Arc<dyn Scheduler>,
            locks.clone(),
            clock.clone() as Arc<dyn Clock>,
        ));
        let detector = Arc::new(MatchDetector::new(
            store.clone(),
            ledger.clone(),
            dispatcher,
            simulator,
            locks,
            clock.clone(),
        ));

        Harness {
            store,
            ledger,
            registry,
            scheduler,
            clock,
            detector,
        }
    }

    #[tokio::test]
    async fn precondition_order_and_codes() {
        let h = harness();
        let a = profile("a");
        let mut hidden = profile("hidden");
        hidden.visible = false;
        let mut other = profile("other");
        other.orientation = Some(Orientation::Gay);
        let blocked = profile("blocked");

        h.store.insert(a.clone());
        h.store.insert(hidden.clone());
        h.store.insert(other.clone());
        h.store.insert(blocked.clone());
        h.ledger.block(blocked.id, a.id).await;

        assert!(matches!(
            h.detector.signal_interest(a.id, a.id).await.unwrap_err(),
            EngineError::SelfTarget
        ));
        assert!(matches!(
            h.detector.signal_interest(a.id, Uuid::new_v4()).await.unwrap_err(),
            EngineError::TargetNotFound(_)
        ));
        assert!(matches!(
            h.detector.signal_interest(a.id, hidden.id).await.unwrap_err(),
            EngineError::TargetNotFound(_)
        ));
        assert!(matches!(
            h.detector.signal_interest(a.id, other.id).await.unwrap_err(),
            EngineError::OrientationMismatch
        ));
        assert!(matches!(
            h.detector.signal_interest(a.id, blocked.id).await.unwrap_err(),
            EngineError::Blocked
        ));
    }

    #[tokio::test]
    async fn mutual_signal_is_order_independent() {
        let h = harness();
        let a = profile("a");
        let b = profile("b");
        h.store.insert(a.clone());
        h.store.insert(b.clone());

        let first = h.detector.signal_interest(a.id, b.id).await.unwrap();
        assert!(first.created);
        assert!(!first.is_match);

        let second = h.detector.signal_interest(b.id, a.id).await.unwrap();
        assert!(second.created);
        assert!(second.is_match);
        assert_eq!(second.counterpart.as_ref().unwrap().id, a.id);

        // Reverse order on a fresh pair behaves identically.
        let c = profile("c");
        let d = profile("d");
        h.store.insert(c.clone());
        h.store.insert(d.clone());
        h.detector.signal_interest(d.id, c.id).await.unwrap();
        let second = h.detector.signal_interest(c.id, d.id).await.unwrap();
        assert!(second.is_match);
    }

    #[tokio::test]
    async fn re_signal_is_idempotent_and_keeps_timestamp() {
        let h = harness();
        let a = profile("a");
        let b = profile("b");
        h.store.insert(a.clone());
        h.store.insert(b.clone());

        let t0 = h.clock.now();
        let first = h.detector.signal_interest(a.id, b.id).await.unwrap();
        assert!(first.created);

        h.clock.advance(chrono::Duration::seconds(30));
        let again = h.detector.signal_interest(a.id, b.id).await.unwrap();
        assert!(!again.created);
        assert_eq!(h.ledger.created_at(a.id, b.id).await, Some(t0));
        assert_eq!(h.ledger.edge_count().await, 1);
    }

    #[tokio::test]
    async fn withdrawal_ends_match_and_resignal_restores_it() {
        let h = harness();
        let a = profile("a");
        let b = profile("b");
        h.store.insert(a.clone());
        h.store.insert(b.clone());

        h.detector.signal_interest(a.id, b.id).await.unwrap();
        h.detector.signal_interest(b.id, a.id).await.unwrap();
        assert_eq!(h.detector.mutual_matches(a.id).await.unwrap(), vec![b.id]);

        assert!(h.detector.withdraw_interest(a.id, b.id).await.unwrap());
        assert!(h.detector.mutual_matches(a.id).await.unwrap().is_empty());
        assert!(h.detector.mutual_matches(b.id).await.unwrap().is_empty());

        // Idempotent no-op on absent edge.
        assert!(!h.detector.withdraw_interest(a.id, b.id).await.unwrap());

        let restored = h.detector.signal_interest(a.id, b.id).await.unwrap();
        assert!(restored.is_match);
        assert_eq!(h.ledger.edge_count().await, 2);
    }

    #[tokio::test]
    async fn concurrent_mutual_signals_never_miss_the_match() {
        for _ in 0..20 {
            let h = harness();
            let a = profile("a");
            let b = profile("b");
            h.store.insert(a.clone());
            h.store.insert(b.clone());
            let (a_id, b_id) = (a.id, b.id);

            let d1 = h.detector.clone();
            let d2 = h.detector.clone();
            let (ab, ba) = tokio::join!(
                tokio::spawn(async move { d1.signal_interest(a_id, b_id).await }),
                tokio::spawn(async move { d2.signal_interest(b_id, a_id).await }),
            );
            let ab = ab.unwrap().unwrap();
            let ba = ba.unwrap().unwrap();

            // The pair lock serializes the two upsert-then-check units, so
            // whichever call runs second observes the other edge. A missed
            // match (both false) is the one forbidden outcome; a doubled
            // one would be fine.
            assert!(ab.is_match || ba.is_match, "both calls missed the match");
            assert_eq!(h.ledger.edge_count().await, 2);

            // Both parties hear about it regardless of which call won.
            let match_recipients: HashSet<Uuid> = h
                .registry
                .events()
                .iter()
                .filter(|e| e.event == EVENT_MATCH)
                .map(|e| e.profile_id)
                .collect();
            assert!(match_recipients.contains(&a_id));
            assert!(match_recipients.contains(&b_id));
        }
    }

    #[tokio::test]
    async fn interest_received_is_suppressed_on_immediate_match() {
        let h = harness();
        let a = profile("a");
        let b = profile("b");
        h.store.insert(a.clone());
        h.store.insert(b.clone());

        h.detector.signal_interest(a.id, b.id).await.unwrap();
        let events = h.registry.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, EVENT_INTEREST_RECEIVED);
        assert_eq!(events[0].profile_id, b.id);

        h.registry.clear();
        h.detector.signal_interest(b.id, a.id).await.unwrap();
        let events = h.registry.events();
        // Match only: no interest.received alongside it.
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.event == EVENT_MATCH));
    }

    #[tokio::test]
    async fn responsive_target_gets_a_scheduled_reply() {
        let h = harness();
        let viewer = profile("viewer");
        let mut synth = profile("synth");
        synth.responsive = true;
        h.store.insert(viewer.clone());
        h.store.insert(synth.clone());

        let outcome = h.detector.signal_interest(viewer.id, synth.id).await.unwrap();
        assert!(!outcome.is_match);
        assert_eq!(h.scheduler.pending_count(), 1);

        // A real (non-responsive) target schedules nothing.
        let plain = profile("plain");
        h.store.insert(plain.clone());
        h.detector.signal_interest(viewer.id, plain.id).await.unwrap();
        assert_eq!(h.scheduler.pending_count(), 1);
    }

    #[tokio::test]
    async fn pending_received_counts_unreciprocated_incoming() {
        let h = harness();
        let me = profile("me");
        let fan1 = profile("fan1");
        let fan2 = profile("fan2");
        h.store.insert(me.clone());
        h.store.insert(fan1.clone());
        h.store.insert(fan2.clone());

        h.detector.signal_interest(fan1.id, me.id).await.unwrap();
        h.detector.signal_interest(fan2.id, me.id).await.unwrap();
        assert_eq!(h.detector.pending_received(me.id).await.unwrap(), 2);

        h.detector.signal_interest(me.id, fan1.id).await.unwrap();
        assert_eq!(h.detector.pending_received(me.id).await.unwrap(), 1);
    }
}
