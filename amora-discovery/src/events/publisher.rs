use uuid::Uuid;

use amora_shared::clients::rabbitmq::RabbitMQClient;
use amora_shared::types::event::{payloads, routing_keys, Event};

pub async fn publish_interest_signaled(
    rabbitmq: &RabbitMQClient,
    from_profile_id: Uuid,
    to_profile_id: Uuid,
    is_match: bool,
) {
    let event = Event::new(
        "amora-discovery",
        routing_keys::DISCOVERY_INTEREST_SIGNALED,
        payloads::InterestSignaled {
            from_profile_id,
            to_profile_id,
            is_match,
        },
    )
    .with_user(from_profile_id);

    if let Err(e) = rabbitmq.publish(routing_keys::DISCOVERY_INTEREST_SIGNALED, &event).await {
        tracing::error!(error = %e, "failed to publish interest.signaled event");
    }
}

pub async fn publish_interest_withdrawn(
    rabbitmq: &RabbitMQClient,
    from_profile_id: Uuid,
    to_profile_id: Uuid,
) {
    let event = Event::new(
        "amora-discovery",
        routing_keys::DISCOVERY_INTEREST_WITHDRAWN,
        payloads::InterestWithdrawn {
            from_profile_id,
            to_profile_id,
        },
    )
    .with_user(from_profile_id);

    if let Err(e) = rabbitmq.publish(routing_keys::DISCOVERY_INTEREST_WITHDRAWN, &event).await {
        tracing::error!(error = %e, "failed to publish interest.withdrawn event");
    }
}

pub async fn publish_match_created(
    rabbitmq: &RabbitMQClient,
    profile_a_id: Uuid,
    profile_b_id: Uuid,
) {
    let event = Event::new(
        "amora-discovery",
        routing_keys::DISCOVERY_MATCH_CREATED,
        payloads::MatchCreated {
            profile_a_id,
            profile_b_id,
        },
    )
    .with_user(profile_a_id);

    if let Err(e) = rabbitmq.publish(routing_keys::DISCOVERY_MATCH_CREATED, &event).await {
        tracing::error!(error = %e, "failed to publish match.created event");
    }
}
