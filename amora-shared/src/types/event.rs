use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ event envelope wrapping all domain events.
///
/// Routing key format: `amora.{domain}.{entity}.{action}`
/// Example: `amora.discovery.match.created`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    pub const DISCOVERY_INTEREST_SIGNALED: &str = "amora.discovery.interest.signaled";
    pub const DISCOVERY_INTEREST_WITHDRAWN: &str = "amora.discovery.interest.withdrawn";
    pub const DISCOVERY_MATCH_CREATED: &str = "amora.discovery.match.created";
}

/// Common event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct InterestSignaled {
        pub from_profile_id: Uuid,
        pub to_profile_id: Uuid,
        pub is_match: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct InterestWithdrawn {
        pub from_profile_id: Uuid,
        pub to_profile_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MatchCreated {
        pub profile_a_id: Uuid,
        pub profile_b_id: Uuid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_json_shape() {
        let evt = Event::new(
            "amora-discovery",
            routing_keys::DISCOVERY_MATCH_CREATED,
            payloads::MatchCreated {
                profile_a_id: Uuid::nil(),
                profile_b_id: Uuid::nil(),
            },
        );
        let json = serde_json::to_string(&evt).unwrap();
        assert!(json.contains("\"event_type\":\"amora.discovery.match.created\""));
        assert!(json.contains("\"source\":\"amora-discovery\""));
    }
}
