use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ports::ChannelRegistry;
use crate::profile::{distance_between, CandidateSummary, ProfileRecord};

pub const EVENT_MATCH: &str = "match";
pub const EVENT_INTEREST_RECEIVED: &str = "interest.received";

/// Payload delivered to each party of a match, shaped from that party's
/// perspective: `counterpart` is the OTHER profile.
#[derive(Debug, Clone, Serialize)]
pub struct MatchPayload {
    pub counterpart: CandidateSummary,
    pub self_summary: CandidateSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterestReceivedPayload {
    pub source: CandidateSummary,
}

/// Fans match and interest events out to the two affected parties' live
/// channels. Delivery is best-effort: a party with no live connection is
/// skipped silently and picks the state up on its next resync fetch.
pub struct NotificationDispatcher {
    registry: Arc<dyn ChannelRegistry>,
}

impl NotificationDispatcher {
    pub fn new(registry: Arc<dyn ChannelRegistry>) -> Self {
        Self { registry }
    }

    /// Emit a `match` event to both parties, each payload built from the
    /// other party's summary.
    pub fn notify_match(&self, a: &ProfileRecord, b: &ProfileRecord, now: DateTime<Utc>) {
        let distance = distance_between(a, b);
        let summary_a = a.summary(now, distance, true);
        let summary_b = b.summary(now, distance, true);

        self.emit(
            a.id,
            EVENT_MATCH,
            &MatchPayload {
                counterpart: summary_b.clone(),
                self_summary: summary_a.clone(),
            },
        );
        self.emit(
            b.id,
            EVENT_MATCH,
            &MatchPayload {
                counterpart: summary_a,
                self_summary: summary_b,
            },
        );

        tracing::info!(profile_a = %a.id, profile_b = %b.id, "match notified");
    }

    /// Emit `interest.received` to the recipient only. Callers suppress this
    /// when the same signal produced a match, so a single action never
    /// yields both events.
    pub fn notify_interest_received(
        &self,
        recipient: &ProfileRecord,
        source: &ProfileRecord,
        now: DateTime<Utc>,
    ) {
        let distance = distance_between(recipient, source);
        let payload = InterestReceivedPayload {
            source: source.summary(now, distance, false),
        };
        self.emit(recipient.id, EVENT_INTEREST_RECEIVED, &payload);
    }

    fn emit<T: Serialize>(&self, profile_id: uuid::Uuid, event: &str, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(value) => self.registry.emit(profile_id, event, value),
            Err(e) => tracing::error!(error = %e, event = %event, "failed to serialize event payload"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{profile, RecordingRegistry};

    #[test]
    fn match_payload_carries_the_other_party() {
        let registry = Arc::new(RecordingRegistry::default());
        let dispatcher = NotificationDispatcher::new(registry.clone());

        let a = profile("alice");
        let b = profile("bob");
        dispatcher.notify_match(&a, &b, Utc::now());

        let events = registry.events();
        assert_eq!(events.len(), 2);

        let to_a = events.iter().find(|e| e.profile_id == a.id).unwrap();
        assert_eq!(to_a.event, EVENT_MATCH);
        assert_eq!(to_a.payload["counterpart"]["display_name"], "bob");
        assert_eq!(to_a.payload["self_summary"]["display_name"], "alice");

        let to_b = events.iter().find(|e| e.profile_id == b.id).unwrap();
        assert_eq!(to_b.payload["counterpart"]["display_name"], "alice");
    }

    #[test]
    fn interest_received_goes_only_to_recipient() {
        let registry = Arc::new(RecordingRegistry::default());
        let dispatcher = NotificationDispatcher::new(registry.clone());

        let recipient = profile("rina");
        let source = profile("sam");
        dispatcher.notify_interest_received(&recipient, &source, Utc::now());

        let events = registry.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].profile_id, recipient.id);
        assert_eq!(events[0].event, EVENT_INTEREST_RECEIVED);
        assert_eq!(events[0].payload["source"]["display_name"], "sam");
    }
}
