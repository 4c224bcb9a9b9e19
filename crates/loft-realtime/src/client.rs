//! Public client handle for the realtime connection.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    actor::{ConnectionActor, ControlCommand, establish},
    config::ClientConfig,
    dispatch::{ClientEvent, EventDispatcher, EventKind, ListenerId},
    error::{ClientError, ClientResult},
    protocol::{ClientFrame, Identity},
    subscription::SubscriptionSet,
    types::{ConnectionStatus, StatusCell},
};

/// Channels into the currently running connection actor.
struct SessionHandle {
    ctrl_tx: mpsc::Sender<ControlCommand>,
    cmd_tx: mpsc::Sender<ClientFrame>,
    manual_close: Arc<AtomicBool>,
}

struct ClientInner {
    config: Arc<ClientConfig>,
    dispatcher: Arc<EventDispatcher>,
    subscriptions: Arc<SubscriptionSet>,
    status: Arc<StatusCell>,
    session: Mutex<Option<SessionHandle>>,
}

/// Handle to the realtime connection.
///
/// Cheap to clone; all clones share one connection, one subscription set,
/// and one listener registry. The socket itself is owned by a background
/// [`ConnectionActor`] task, so every method here is non-blocking apart
/// from [`connect`](Self::connect), which waits for the first connection
/// attempt to resolve.
///
/// # Example
///
/// ```no_run
/// # async fn run() -> loft_realtime::ClientResult<()> {
/// use loft_realtime::{ClientConfig, EventKind, Identity, RealtimeClient};
///
/// let client = RealtimeClient::new(ClientConfig::new("chat.example.com"))?;
/// client.on(EventKind::NewMessage, |event| {
///     println!("message: {event:?}");
/// });
/// client.connect(Identity::new(1, 2)).await?;
/// client.subscribe("threads", Some(42));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<ClientInner>,
}

impl RealtimeClient {
    /// Create a new, disconnected client.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate().map_err(ClientError::config)?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                config: Arc::new(config),
                dispatcher: Arc::new(EventDispatcher::new()),
                subscriptions: Arc::new(SubscriptionSet::new()),
                status: Arc::new(StatusCell::new()),
                session: Mutex::new(None),
            }),
        })
    }

    /// Connect and register under the given identity.
    ///
    /// Only this first attempt reports failure to the caller; once it
    /// succeeds, the connection is maintained in the background and later
    /// drops surface as [`EventKind::ConnectionStatus`] events. Calling
    /// `connect` while already connected replaces the connection; recorded
    /// subscriptions carry over and are replayed onto the new socket.
    pub async fn connect(&self, identity: Identity) -> ClientResult<()> {
        // Tear down any previous session, keeping the subscription set.
        self.shutdown_session(false);

        let inner = &self.inner;
        inner.status.set(ConnectionStatus::Connecting);
        inner
            .dispatcher
            .emit(&ClientEvent::ConnectionStatus(ConnectionStatus::Connecting));

        let manual_close = Arc::new(AtomicBool::new(false));
        let established = tokio::time::timeout(
            inner.config.connect_timeout,
            establish(
                &inner.config,
                identity,
                &inner.subscriptions,
                &inner.dispatcher,
                &inner.status,
                &manual_close,
            ),
        )
        .await;

        let (read, write) = match established {
            Ok(Ok(halves)) => halves,
            Ok(Err(error)) => {
                inner.status.set(ConnectionStatus::Disconnected);
                inner
                    .dispatcher
                    .emit(&ClientEvent::ConnectionStatus(ConnectionStatus::Disconnected));
                return Err(error);
            }
            Err(_) => {
                inner.status.set(ConnectionStatus::Disconnected);
                inner
                    .dispatcher
                    .emit(&ClientEvent::ConnectionStatus(ConnectionStatus::Disconnected));
                return Err(ClientError::timeout(inner.config.connect_timeout));
            }
        };

        let (ctrl_tx, ctrl_rx) = mpsc::channel(inner.config.control_channel_capacity);
        let (cmd_tx, cmd_rx) = mpsc::channel(inner.config.command_channel_capacity);

        let actor = ConnectionActor::new(
            Arc::clone(&inner.config),
            identity,
            Arc::clone(&inner.dispatcher),
            Arc::clone(&inner.subscriptions),
            Arc::clone(&inner.status),
            Arc::clone(&manual_close),
            ctrl_rx,
            cmd_rx,
        );
        tokio::spawn(actor.run(read, write));

        *self.session_lock() = Some(SessionHandle {
            ctrl_tx,
            cmd_tx,
            manual_close,
        });
        Ok(())
    }

    /// Disconnect and clear the subscription set.
    ///
    /// Cancels any in-progress reconnection. Safe to call when already
    /// disconnected.
    pub fn disconnect(&self) {
        self.shutdown_session(true);
    }

    /// Subscribe to a topic, optionally scoped to one resource.
    ///
    /// The subscription is recorded regardless of connection state and
    /// replayed onto every future connection. Subscribing twice to the
    /// same topic/resource pair is a no-op.
    pub fn subscribe(&self, topic: &str, resource_id: Option<u64>) {
        if !self.inner.subscriptions.insert(topic, resource_id) {
            return;
        }
        self.send_if_connected(ClientFrame::Subscribe {
            subscription_type: topic.to_string(),
            resource_id,
        });
    }

    /// Unsubscribe from a topic.
    ///
    /// A no-op for a topic/resource pair that was never subscribed;
    /// nothing is sent to the server in that case.
    pub fn unsubscribe(&self, topic: &str, resource_id: Option<u64>) {
        if !self.inner.subscriptions.remove(topic, resource_id) {
            return;
        }
        self.send_if_connected(ClientFrame::Unsubscribe {
            subscription_type: topic.to_string(),
            resource_id,
        });
    }

    /// Register an event listener.
    pub fn on(
        &self,
        kind: EventKind,
        listener: impl Fn(&ClientEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        self.inner.dispatcher.on(kind, listener)
    }

    /// Remove an event listener.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.inner.dispatcher.off(kind, id)
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.inner.status.get()
    }

    /// Number of recorded subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.len()
    }

    /// Send an outbound frame only when connected; otherwise drop it with
    /// a log line. Nothing is ever queued for a future connection.
    fn send_if_connected(&self, frame: ClientFrame) {
        if !self.status().is_connected() {
            debug!(?frame, "not connected; frame not sent");
            return;
        }
        let session = self.session_lock();
        let Some(handle) = session.as_ref() else {
            return;
        };
        if let Err(error) = handle.cmd_tx.try_send(frame) {
            warn!(%error, "failed to hand frame to connection actor");
        }
    }

    /// Stop the running actor, if any. `clear` distinguishes a manual
    /// disconnect (subscriptions cleared) from a connection replacement
    /// (subscriptions kept for replay).
    fn shutdown_session(&self, clear: bool) {
        let handle = self.session_lock().take();
        if let Some(handle) = handle {
            handle.manual_close.store(true, Ordering::Release);
            let _ = handle.ctrl_tx.try_send(ControlCommand::Close);
        }
        if clear {
            self.inner.subscriptions.clear();
            if self.status() != ConnectionStatus::Disconnected {
                self.inner.status.set(ConnectionStatus::Disconnected);
                self.inner
                    .dispatcher
                    .emit(&ClientEvent::ConnectionStatus(ConnectionStatus::Disconnected));
            }
        }
    }

    fn session_lock(&self) -> std::sync::MutexGuard<'_, Option<SessionHandle>> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
