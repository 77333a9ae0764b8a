use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::{
    dto::sse::{Handshake, ServerEvent},
    state::SharedState,
};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Which hub a stream is attached to.
#[derive(Debug, Clone, Copy)]
pub enum StreamKind {
    Public,
    Admin,
}

impl StreamKind {
    fn name(self) -> &'static str {
        match self {
            StreamKind::Public => "public",
            StreamKind::Admin => "admin",
        }
    }
}

/// Subscribe to a hub and build the handshake sent as the first event.
pub fn subscribe(
    state: &SharedState,
    kind: StreamKind,
) -> (broadcast::Receiver<ServerEvent>, Option<ServerEvent>) {
    let receiver = match kind {
        StreamKind::Public => state.public_sse().subscribe(),
        StreamKind::Admin => state.admin_sse().subscribe(),
    };
    let handshake = ServerEvent::json(
        Some("handshake".to_string()),
        &Handshake {
            stream: kind.name().to_string(),
            message: format!("{} stream connected", kind.name()),
            degraded: state.is_degraded(),
        },
    )
    .ok();
    (receiver, handshake)
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}

/// Convert a broadcast receiver into an SSE response, forwarding events until the client leaves.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    handshake: Option<ServerEvent>,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(handshake) = handshake {
            if tx.send(Ok(to_event(handshake))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(stream = kind.name(), skipped, "SSE subscriber lagging");
                        }
                    }
                }
            }
        }

        info!(stream = kind.name(), "SSE stream disconnected");
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}
