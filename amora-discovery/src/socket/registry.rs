use socketioxide::SocketIo;
use uuid::Uuid;

use amora_engine::ports::ChannelRegistry;

/// Adapts the Socket.IO server handle to the engine's channel registry.
/// Every live connection for a profile sits in the `user:{id}` room, so one
/// emit reaches them all; a profile with no connection drops the event.
pub struct SocketRegistry {
    io: SocketIo,
}

impl SocketRegistry {
    pub fn new(io: SocketIo) -> Self {
        Self { io }
    }

    pub fn room(profile_id: Uuid) -> String {
        format!("user:{profile_id}")
    }
}

impl ChannelRegistry for SocketRegistry {
    fn emit(&self, profile_id: Uuid, event: &str, payload: serde_json::Value) {
        let room = Self::room(profile_id);
        if let Err(e) = self.io.to(room).emit(event.to_owned(), &payload) {
            // Expected when nobody is connected; state is picked up on resync.
            tracing::debug!(profile_id = %profile_id, event = %event, error = %e, "live event dropped");
        }
    }
}
