use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Public and admin broadcast hubs.
pub struct SseState {
    public: SseHub,
    admin: SseHub,
}

impl SseState {
    pub fn new(public_capacity: usize, admin_capacity: usize) -> Self {
        Self {
            public: SseHub::new(public_capacity),
            admin: SseHub::new(admin_capacity),
        }
    }

    /// Hub for projector and dashboard clients; never carries credentials.
    pub fn public(&self) -> &SseHub {
        &self.public
    }

    /// Hub for the organiser panel.
    pub fn admin(&self) -> &SseHub {
        &self.admin
    }
}

/// Broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers; having none is not an error.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}
