//! Routing of inbound text frames to the event dispatcher.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    dispatch::{ClientEvent, EventDispatcher},
    protocol::ServerFrame,
};

/// Parses inbound text frames and forwards the dispatchable ones.
///
/// Control frames (`welcome`, `pong`, `error`) and unknown discriminators
/// are logged and swallowed; only data frames become events. Malformed
/// JSON never tears down the connection.
pub(crate) struct MessageRouter {
    dispatcher: Arc<EventDispatcher>,
}

impl MessageRouter {
    pub(crate) fn new(dispatcher: Arc<EventDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Handle one inbound text frame.
    pub(crate) fn handle(&self, raw: &str) {
        let frame: ServerFrame = match serde_json::from_str(raw) {
            Ok(frame) => frame,
            Err(error) => {
                warn!(%error, "dropping malformed server frame");
                return;
            }
        };

        match frame {
            ServerFrame::Welcome { message } => {
                debug!(?message, "received welcome");
            }
            ServerFrame::NewMessage { message } => {
                self.dispatcher.emit(&ClientEvent::NewMessage(message));
            }
            ServerFrame::ThreadUpdated { thread } => {
                self.dispatcher.emit(&ClientEvent::ThreadUpdated(thread));
            }
            ServerFrame::PresenceUpdate { presence } => {
                self.dispatcher.emit(&ClientEvent::PresenceUpdate(presence));
            }
            ServerFrame::Pong => {
                debug!("received pong");
            }
            ServerFrame::Error { error } => {
                warn!(?error, "server reported an error");
            }
            ServerFrame::Unknown => {
                debug!(raw, "ignoring frame with unknown type");
            }
        }
    }
}
