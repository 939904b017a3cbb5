//! [`ChatConnector`] reading livestream chat from a WebSocket relay.
//!
//! The relay accepts `{"action":"subscribe","channel":"…"}` and then pushes one JSON frame per
//! event; only `{"type":"chat","user":"…","comment":"…"}` frames are chat messages.

use std::sync::Arc;

use futures::{SinkExt, StreamExt, future::BoxFuture};
use serde::Deserialize;
use serde_json::json;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;

use crate::services::chat_listener::{ChatConnector, ChatError, ChatMessage, ChatStream};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RelayFrame {
    Chat { user: String, comment: String },
    #[serde(other)]
    Other,
}

/// Reads chat lines from a websocket relay.
pub struct RelayChatConnector {
    url: Arc<str>,
}

impl RelayChatConnector {
    /// Connector for the relay at `url`; the channel is sent in a subscribe frame.
    pub fn new(url: impl Into<Arc<str>>) -> Self {
        Self { url: url.into() }
    }
}

/// Decode a relay text frame; non-chat and malformed frames yield `None`.
pub fn decode_frame(text: &str) -> Option<ChatMessage> {
    match serde_json::from_str::<RelayFrame>(text) {
        Ok(RelayFrame::Chat { user, comment }) => Some(ChatMessage {
            user,
            text: comment,
        }),
        Ok(RelayFrame::Other) => None,
        Err(err) => {
            debug!(error = %err, "ignoring malformed relay frame");
            None
        }
    }
}

impl ChatConnector for RelayChatConnector {
    fn connect(&self, channel: &str) -> BoxFuture<'static, Result<ChatStream, ChatError>> {
        let url = self.url.clone();
        let channel = channel.to_owned();
        Box::pin(async move {
            let (mut socket, _response) = connect_async(url.as_ref())
                .await
                .map_err(|err| ChatError::Connect(err.to_string()))?;

            let subscribe = json!({ "action": "subscribe", "channel": channel });
            socket
                .send(Message::Text(subscribe.to_string().into()))
                .await
                .map_err(|err| ChatError::Connect(err.to_string()))?;

            let stream = socket
                .take_while(|next| {
                    let open = !matches!(next, Ok(Message::Close(_)));
                    async move { open }
                })
                .filter_map(|next| async move {
                    match next {
                        Ok(Message::Text(text)) => decode_frame(text.as_str()).map(Ok),
                        Ok(_) => None,
                        Err(err) => Some(Err(ChatError::Stream(err.to_string()))),
                    }
                });

            Ok(stream.boxed())
        })
    }
}

/// Connector used when no relay URL is configured; every attempt fails.
pub struct DisabledChatConnector;

impl ChatConnector for DisabledChatConnector {
    fn connect(&self, _channel: &str) -> BoxFuture<'static, Result<ChatStream, ChatError>> {
        Box::pin(async { Err(ChatError::Connect("no chat relay configured".into())) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_frames_become_messages() {
        let message =
            decode_frame(r#"{"type":"chat","user":"alice","comment":"!reg","nickname":"A"}"#);
        assert_eq!(
            message,
            Some(ChatMessage {
                user: "alice".into(),
                text: "!reg".into(),
            })
        );
    }

    #[test]
    fn other_frames_are_ignored() {
        assert_eq!(decode_frame(r#"{"type":"gift","user":"bob"}"#), None);
        assert_eq!(decode_frame("not json"), None);
    }
}
