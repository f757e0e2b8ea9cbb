use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use uuid::Uuid;

use crate::detector::PairLocks;
use crate::dispatcher::NotificationDispatcher;
use crate::ports::{CandidateStore, Clock, InterestLedger, Scheduler};

/// Delay window for a simulated reply, in seconds.
const MIN_REPLY_DELAY_SECS: u64 = 60;
const MAX_REPLY_DELAY_SECS: u64 = 120;

/// Makes responsive (synthetic) profiles reciprocate interest after a
/// randomized delay.
///
/// Tasks are cancelled by revalidation, never by interrupt: a fired task
/// that finds the forward edge withdrawn, or the reverse edge already
/// present, is a silent no-op. Duplicate scheduling for the same
/// (candidate, viewer) pair collapses into one pending task.
pub struct ReciprocitySimulator {
    store: Arc<dyn CandidateStore>,
    ledger: Arc<dyn InterestLedger>,
    dispatcher: Arc<NotificationDispatcher>,
    scheduler: Arc<dyn Scheduler>,
    locks: Arc<PairLocks>,
    clock: Arc<dyn Clock>,
    pending: Arc<Mutex<HashSet<(Uuid, Uuid)>>>,
}

impl ReciprocitySimulator {
    pub fn new(
        store: Arc<dyn CandidateStore>,
        ledger: Arc<dyn InterestLedger>,
        dispatcher: Arc<NotificationDispatcher>,
        scheduler: Arc<dyn Scheduler>,
        locks: Arc<PairLocks>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ledger,
            dispatcher,
            scheduler,
            locks,
            clock,
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Schedule a one-shot reciprocal signal from `candidate` back to
    /// `viewer`. A pair with a task already pending is not scheduled again.
    pub fn schedule(&self, candidate: Uuid, viewer: Uuid) {
        {
            let mut pending = self.pending.lock().expect("pending set poisoned");
            if !pending.insert((candidate, viewer)) {
                tracing::debug!(candidate = %candidate, viewer = %viewer, "reply already pending");
                return;
            }
        }

        let delay = Duration::from_secs(
            rand::thread_rng().gen_range(MIN_REPLY_DELAY_SECS..=MAX_REPLY_DELAY_SECS),
        );

        let store = self.store.clone();
        let ledger = self.ledger.clone();
        let dispatcher = self.dispatcher.clone();
        let locks = self.locks.clone();
        let clock = self.clock.clone();
        let pending = self.pending.clone();

        tracing::debug!(
            candidate = %candidate,
            viewer = %viewer,
            delay_secs = delay.as_secs(),
            "reciprocal reply scheduled"
        );

        self.scheduler.schedule(
            delay,
            Box::pin(async move {
                fire(store, ledger, dispatcher, locks, clock, pending, candidate, viewer).await;
            }),
        );
    }
}

/// Runs detached from the originating request, holding nothing from it.
#[allow(clippy::too_many_arguments)]
async fn fire(
    store: Arc<dyn CandidateStore>,
    ledger: Arc<dyn InterestLedger>,
    dispatcher: Arc<NotificationDispatcher>,
    locks: Arc<PairLocks>,
    clock: Arc<dyn Clock>,
    pending: Arc<Mutex<HashSet<(Uuid, Uuid)>>>,
    candidate: Uuid,
    viewer: Uuid,
) {
    pending
        .lock()
        .expect("pending set poisoned")
        .remove(&(candidate, viewer));

    let now = clock.now();
    {
        let _guard = locks.lock(candidate, viewer).await;

        // Revalidate under the pair lock. Either miss is an expected
        // outcome, not a failure.
        match ledger.exists(viewer, candidate).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(candidate = %candidate, viewer = %viewer, "forward edge withdrawn, reply dropped");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "ledger read failed during reply revalidation");
                return;
            }
        }
        match ledger.exists(candidate, viewer).await {
            Ok(false) => {}
            Ok(true) => {
                tracing::debug!(candidate = %candidate, viewer = %viewer, "reverse edge already present, reply dropped");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "ledger read failed during reply revalidation");
                return;
            }
        }

        // The responsive profile is a controlled synthetic actor: the
        // orientation/self/block preconditions of a real signal do not
        // apply here.
        if let Err(e) = ledger.upsert(candidate, viewer, now).await {
            tracing::error!(error = %e, "reciprocal upsert failed");
            return;
        }
    }

    let (candidate_profile, viewer_profile) = match (store.get(candidate).await, store.get(viewer).await) {
        (Ok(Some(c)), Ok(Some(v))) => (c, v),
        _ => {
            tracing::warn!(candidate = %candidate, viewer = %viewer, "profile lookup failed after reciprocal upsert");
            return;
        }
    };

    dispatcher.notify_match(&candidate_profile, &viewer_profile, now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::EVENT_MATCH;
    use crate::testing::{profile, ManualClock, ManualScheduler, MemoryLedger, MemoryStore, RecordingRegistry};
    use chrono::Utc;

    struct Harness {
        store: Arc<MemoryStore>,
        ledger: Arc<MemoryLedger>,
        registry: Arc<RecordingRegistry>,
        scheduler: Arc<ManualScheduler>,
        simulator: ReciprocitySimulator,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::default());
        let ledger = Arc::new(MemoryLedger::default());
        let registry = Arc::new(RecordingRegistry::default());
        let scheduler = Arc::new(ManualScheduler::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let dispatcher = Arc::new(NotificationDispatcher::new(registry.clone()));

        let simulator = ReciprocitySimulator::new(
            store.clone(),
            ledger.clone(),
            dispatcher,
            scheduler.clone(),
            Arc::new(PairLocks::default()),
            clock,
        );

        Harness {
            store,
            ledger,
            registry,
            scheduler,
            simulator,
        }
    }

    #[tokio::test]
    async fn delay_stays_inside_the_window() {
        let h = harness();
        let synth = profile("synth");
        let viewer = profile("viewer");
        h.store.insert(synth.clone());
        h.store.insert(viewer.clone());

        h.simulator.schedule(synth.id, viewer.id);
        let delays = h.scheduler.delays();
        assert_eq!(delays.len(), 1);
        assert!(
            (MIN_REPLY_DELAY_SECS..=MAX_REPLY_DELAY_SECS).contains(&delays[0].as_secs()),
            "delay {:?} out of window",
            delays[0]
        );
    }

    #[tokio::test]
    async fn duplicate_scheduling_collapses() {
        let h = harness();
        let synth = profile("synth");
        let viewer = profile("viewer");
        h.store.insert(synth.clone());
        h.store.insert(viewer.clone());

        h.simulator.schedule(synth.id, viewer.id);
        h.simulator.schedule(synth.id, viewer.id);
        assert_eq!(h.scheduler.pending_count(), 1);

        // A different viewer is its own task.
        let other = profile("other");
        h.store.insert(other.clone());
        h.simulator.schedule(synth.id, other.id);
        assert_eq!(h.scheduler.pending_count(), 2);
    }

    #[tokio::test]
    async fn fire_creates_reverse_edge_and_notifies_both() {
        let h = harness();
        let synth = profile("synth");
        let viewer = profile("viewer");
        h.store.insert(synth.clone());
        h.store.insert(viewer.clone());

        h.ledger.upsert(viewer.id, synth.id, Utc::now()).await.unwrap();
        h.simulator.schedule(synth.id, viewer.id);
        h.scheduler.run_all().await;

        assert!(h.ledger.exists(synth.id, viewer.id).await.unwrap());

        let events = h.registry.events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.event == EVENT_MATCH));
        let to_viewer = events.iter().find(|e| e.profile_id == viewer.id).unwrap();
        assert_eq!(to_viewer.payload["counterpart"]["id"], synth.id.to_string());
    }

    #[tokio::test]
    async fn withdrawn_forward_edge_makes_fire_a_silent_noop() {
        let h = harness();
        let synth = profile("synth");
        let viewer = profile("viewer");
        h.store.insert(synth.clone());
        h.store.insert(viewer.clone());

        h.ledger.upsert(viewer.id, synth.id, Utc::now()).await.unwrap();
        h.simulator.schedule(synth.id, viewer.id);

        // Viewer changes their mind before the timer fires.
        h.ledger.remove(viewer.id, synth.id).await.unwrap();
        h.scheduler.run_all().await;

        assert!(!h.ledger.exists(synth.id, viewer.id).await.unwrap());
        assert!(h.registry.events().is_empty());
    }

    #[tokio::test]
    async fn existing_reverse_edge_makes_fire_a_noop() {
        let h = harness();
        let synth = profile("synth");
        let viewer = profile("viewer");
        h.store.insert(synth.clone());
        h.store.insert(viewer.clone());

        h.ledger.upsert(viewer.id, synth.id, Utc::now()).await.unwrap();
        h.simulator.schedule(synth.id, viewer.id);

        // Another path already completed the match.
        h.ledger.upsert(synth.id, viewer.id, Utc::now()).await.unwrap();
        h.scheduler.run_all().await;

        assert!(h.registry.events().is_empty());
        assert_eq!(h.ledger.edge_count().await, 2);
    }

    #[tokio::test]
    async fn pair_can_be_scheduled_again_after_firing() {
        let h = harness();
        let synth = profile("synth");
        let viewer = profile("viewer");
        h.store.insert(synth.clone());
        h.store.insert(viewer.clone());

        h.simulator.schedule(synth.id, viewer.id);
        h.scheduler.run_all().await; // no-op fire: no forward edge

        h.simulator.schedule(synth.id, viewer.id);
        assert_eq!(h.scheduler.pending_count(), 1);
    }
}
