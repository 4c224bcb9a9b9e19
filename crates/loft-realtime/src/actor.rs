//! Connection actor for WebSocket lifecycle management.
//!
//! The actor runs in a background task and owns the socket for its whole
//! life: it pumps inbound frames into the router, forwards outbound frames
//! from the client handle, sends heartbeats, and drives automatic
//! reconnection with exponential backoff. The client handle talks to it
//! over two channels: a control channel for close, and a command channel
//! for outbound frames.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use futures_util::{SinkExt, Stream, StreamExt, stream::SplitSink, stream::SplitStream};
use tokio::{
    net::TcpStream,
    sync::mpsc,
    time::{Duration, MissedTickBehavior},
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        Message, Utf8Bytes,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};
use tracing::{debug, error, info, warn};

use crate::{
    backoff::calculate_backoff,
    config::ClientConfig,
    dispatch::{ClientEvent, EventDispatcher},
    error::{ClientError, ClientResult},
    protocol::{ClientFrame, Identity},
    router::MessageRouter,
    subscription::SubscriptionSet,
    types::{ConnectionStatus, StatusCell},
};

/// Commands on the control channel.
#[derive(Debug)]
pub(crate) enum ControlCommand {
    /// Close the connection and stop the actor. No reconnect follows.
    Close,
}

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
pub(crate) type WsSource = SplitStream<WsStream>;

/// Write half of a connection, abstracted so session logic can run against
/// an in-memory sink in tests.
#[async_trait]
pub(crate) trait FrameSink: Send {
    async fn send_frame(&mut self, message: Message) -> ClientResult<()>;
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_frame(&mut self, message: Message) -> ClientResult<()> {
        self.send(message).await.map_err(ClientError::from)
    }
}

/// Serialize and send one outbound frame.
pub(crate) async fn send_client_frame<W: FrameSink>(
    sink: &mut W,
    frame: &ClientFrame,
) -> ClientResult<()> {
    let text = serde_json::to_string(frame)?;
    sink.send_frame(Message::text(text)).await
}

/// Replay the full subscription set onto a freshly opened socket.
pub(crate) async fn replay_subscriptions<W: FrameSink>(
    sink: &mut W,
    subscriptions: &SubscriptionSet,
) -> ClientResult<()> {
    let keys = subscriptions.snapshot();
    if keys.is_empty() {
        return Ok(());
    }

    debug!(count = keys.len(), "replaying subscriptions");
    for key in keys {
        let frame = ClientFrame::Subscribe {
            subscription_type: key.topic,
            resource_id: key.resource_id,
        };
        send_client_frame(sink, &frame).await?;
    }
    Ok(())
}

/// Open a socket, register, and replay subscriptions.
///
/// On success the shared status is Connected and a status event has been
/// emitted; the caller receives both halves of the socket. `cancelled` is
/// the session's manual-close flag: an attempt it overtakes is abandoned
/// before the status flip becomes observable.
pub(crate) async fn establish(
    config: &ClientConfig,
    identity: Identity,
    subscriptions: &SubscriptionSet,
    dispatcher: &EventDispatcher,
    status: &StatusCell,
    cancelled: &AtomicBool,
) -> ClientResult<(WsSource, WsSink)> {
    let url = config.url();
    debug!(%url, "opening websocket");

    let (socket, _response) = connect_async(url.as_str()).await?;
    let (mut write, read) = socket.split();

    send_client_frame(&mut write, &ClientFrame::register(identity)).await?;

    if cancelled.load(Ordering::Acquire) {
        return Err(ClientError::connection_closed(Some(
            "client disconnect".to_string(),
        )));
    }

    // Connected becomes observable before replay starts.
    status.set(ConnectionStatus::Connected);
    dispatcher.emit(&ClientEvent::ConnectionStatus(ConnectionStatus::Connected));

    replay_subscriptions(&mut write, subscriptions).await?;
    info!(%url, "realtime connection established");

    Ok((read, write))
}

/// Background task driving one logical connection, across reconnects.
pub(crate) struct ConnectionActor {
    config: Arc<ClientConfig>,
    identity: Identity,
    dispatcher: Arc<EventDispatcher>,
    subscriptions: Arc<SubscriptionSet>,
    status: Arc<StatusCell>,
    /// Set by the client handle on manual disconnect; once set, the actor
    /// never reconnects and never touches the shared status again.
    manual_close: Arc<AtomicBool>,
    router: MessageRouter,
    ctrl_rx: mpsc::Receiver<ControlCommand>,
    cmd_rx: mpsc::Receiver<ClientFrame>,
    reconnect_attempt: u32,
}

impl ConnectionActor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: Arc<ClientConfig>,
        identity: Identity,
        dispatcher: Arc<EventDispatcher>,
        subscriptions: Arc<SubscriptionSet>,
        status: Arc<StatusCell>,
        manual_close: Arc<AtomicBool>,
        ctrl_rx: mpsc::Receiver<ControlCommand>,
        cmd_rx: mpsc::Receiver<ClientFrame>,
    ) -> Self {
        let router = MessageRouter::new(Arc::clone(&dispatcher));
        Self {
            config,
            identity,
            dispatcher,
            subscriptions,
            status,
            manual_close,
            router,
            ctrl_rx,
            cmd_rx,
            reconnect_attempt: 0,
        }
    }

    /// Run the actor until closed or out of reconnection attempts.
    ///
    /// Takes the already-established first connection; the initial attempt
    /// happens inline in `connect` so its outcome can be reported to the
    /// caller directly.
    pub(crate) async fn run(mut self, read: WsSource, write: WsSink) {
        let mut session = Some((read, write));

        loop {
            let (read, write) = match session.take() {
                Some(halves) => halves,
                None => match self.reconnect().await {
                    Some(halves) => halves,
                    None => break,
                },
            };

            let mut read = read.map(|result| result.map_err(ClientError::from));
            match self.run_session(&mut read, write).await {
                Ok(()) => break,
                Err(error) => {
                    if self.manual_close.load(Ordering::Acquire) {
                        break;
                    }
                    warn!(%error, "connection lost");
                    self.status.set(ConnectionStatus::Reconnecting);
                    self.dispatcher
                        .emit(&ClientEvent::ConnectionStatus(ConnectionStatus::Reconnecting));
                }
            }
        }

        debug!("connection actor stopped");
    }

    /// One session on an established socket. `Ok(())` means a deliberate
    /// close (or every client handle dropped); `Err` means the connection
    /// dropped and a reconnect may follow.
    async fn run_session<S, W>(&mut self, read: &mut S, mut write: W) -> ClientResult<()>
    where
        S: Stream<Item = ClientResult<Message>> + Unpin,
        W: FrameSink,
    {
        // interval_at skips the immediate first tick.
        let mut heartbeat = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.heartbeat_interval,
            self.config.heartbeat_interval,
        );
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                ctrl = self.ctrl_rx.recv() => {
                    // Close command, or every client handle dropped.
                    let _ = ctrl;
                    let close = Message::Close(Some(CloseFrame {
                        code: CloseCode::Normal,
                        reason: Utf8Bytes::from_static("client disconnect"),
                    }));
                    if let Err(error) = write.send_frame(close).await {
                        debug!(%error, "close frame not delivered");
                    }
                    return Ok(());
                }

                frame = self.cmd_rx.recv() => {
                    match frame {
                        Some(frame) => send_client_frame(&mut write, &frame).await?,
                        None => return Ok(()),
                    }
                }

                message = read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => self.router.handle(&text),
                        Some(Ok(Message::Ping(payload))) => {
                            write.send_frame(Message::Pong(payload)).await?;
                        }
                        Some(Ok(Message::Pong(_) | Message::Binary(_) | Message::Frame(_))) => {}
                        Some(Ok(Message::Close(frame))) => {
                            return Err(ClientError::connection_closed(
                                frame.map(|f| f.reason.to_string()),
                            ));
                        }
                        Some(Err(error)) => return Err(error),
                        None => return Err(ClientError::connection_closed(None)),
                    }
                }

                _ = heartbeat.tick() => {
                    send_client_frame(&mut write, &ClientFrame::Ping).await?;
                }
            }
        }
    }

    /// Retry until a connection is established or the attempt ceiling is
    /// reached. `None` means the actor should stop.
    async fn reconnect(&mut self) -> Option<(WsSource, WsSink)> {
        loop {
            if self.reconnect_attempt >= self.config.reconnect_max_attempts {
                error!(
                    attempts = self.reconnect_attempt,
                    "reconnection attempts exhausted"
                );
                self.status.set(ConnectionStatus::Disconnected);
                self.dispatcher
                    .emit(&ClientEvent::ConnectionStatus(ConnectionStatus::Disconnected));
                return None;
            }

            let delay = calculate_backoff(self.config.backoff(), self.reconnect_attempt);
            self.reconnect_attempt += 1;
            debug!(
                attempt = self.reconnect_attempt,
                delay_ms = delay.as_millis(),
                "waiting before reconnect"
            );

            if !self.wait_before_reconnect(delay).await {
                return None;
            }
            if self.manual_close.load(Ordering::Acquire) {
                return None;
            }

            match establish(
                &self.config,
                self.identity,
                &self.subscriptions,
                &self.dispatcher,
                &self.status,
                &self.manual_close,
            )
            .await
            {
                Ok(halves) => {
                    if self.manual_close.load(Ordering::Acquire) {
                        return None;
                    }
                    self.reconnect_attempt = 0;
                    return Some(halves);
                }
                Err(error) => {
                    // A disconnect that landed mid-attempt owns the status
                    // from here on.
                    if self.manual_close.load(Ordering::Acquire) {
                        return None;
                    }
                    warn!(%error, attempt = self.reconnect_attempt, "reconnection attempt failed");
                    // establish may have flipped the status before failing.
                    self.status.set(ConnectionStatus::Reconnecting);
                }
            }
        }
    }

    /// Sleep out the backoff delay while staying responsive to close
    /// commands. Outbound frames arriving during the wait are dropped, not
    /// queued. Returns `false` if the actor should stop.
    async fn wait_before_reconnect(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => return true,

                ctrl = self.ctrl_rx.recv() => {
                    let _ = ctrl;
                    return false;
                }

                frame = self.cmd_rx.recv() => {
                    match frame {
                        Some(frame) => warn!(?frame, "dropping outbound frame while disconnected"),
                        None => return false,
                    }
                }
            }
        }
    }
}
