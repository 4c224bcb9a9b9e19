//! Realtime WebSocket client for the Loft messaging platform.
//!
//! Maintains a single registered connection to the Loft realtime endpoint
//! and turns its JSON frames into typed events:
//!
//! - **Connection lifecycle**: one [`connect`](RealtimeClient::connect)
//!   call per identity; automatic reconnection with exponential backoff
//!   after unexpected drops; status observable via
//!   [`EventKind::ConnectionStatus`] events.
//! - **Subscriptions**: recorded in a connection-independent set and
//!   replayed onto every (re)established socket.
//! - **Heartbeat**: application-level ping on a fixed interval while
//!   connected.
//! - **Dispatch**: inbound `new_message` / `thread_updated` /
//!   `presence_update` frames fan out to registered listeners, with
//!   per-listener panic isolation.
//!
//! # Architecture
//!
//! ```text
//! RealtimeClient (cloneable handle)
//!     │  ctrl / cmd channels
//!     ▼
//! ConnectionActor (background task)
//!     ├── heartbeat timer
//!     ├── reconnect state machine
//!     └── MessageRouter ──▶ EventDispatcher ──▶ listeners
//! ```

mod actor;
mod backoff;
mod router;

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod subscription;
pub mod types;

pub use client::RealtimeClient;
pub use config::{ClientConfig, ENDPOINT_PATH};
pub use dispatch::{ClientEvent, EventDispatcher, EventKind, ListenerId};
pub use error::{ClientError, ClientResult};
pub use protocol::{ClientFrame, Identity, ServerFrame};
pub use subscription::{SubscriptionKey, SubscriptionSet, canonical_key};
pub use types::ConnectionStatus;
