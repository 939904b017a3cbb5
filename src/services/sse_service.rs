use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::{
    dto::sse::{Handshake, ServerEvent},
    state::SharedState,
};

const EVENT_HANDSHAKE: &str = "handshake";

/// Subscribe to the dashboard event stream.
pub fn subscribe(state: &SharedState) -> broadcast::Receiver<ServerEvent> {
    state.events().subscribe()
}

/// Handshake event greeting a new subscriber.
pub fn handshake(state: &SharedState) -> Option<ServerEvent> {
    ServerEvent::json(
        Some(EVENT_HANDSHAKE.to_string()),
        &Handshake {
            message: "event stream connected".into(),
            degraded: state.is_degraded(),
        },
    )
    .ok()
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}

/// Convert a broadcast receiver into an SSE response, forwarding events until the client
/// disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    greeting: Option<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(greeting) = greeting
            && tx.send(Ok(to_event(greeting))).await.is_err()
        {
            return;
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
                            debug!(skipped, "SSE subscriber lagged behind");
                            continue;
                        }
                    }
                }
            }
        }

        info!("SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
