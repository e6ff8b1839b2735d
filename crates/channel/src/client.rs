//! Live channel client: follows the session credential, keeps one
//! WebSocket open while a credential is present, and records every
//! inbound message.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use sa_auth::Credential;
use sa_domain::trace::TraceEvent;
use sa_protocol::{ChannelMessage, TOKEN_QUERY_PARAM};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::reconnect::ReconnectPolicy;
use crate::types::{ChannelError, ChannelState, MessageLog};

/// Buffered messages per [`LiveChannel::subscribe`] receiver.
const SUBSCRIBER_CAPACITY: usize = 256;

/// How long a deliberate close waits for the close frame to flush.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// A fully-configured channel client, ready to follow a credential.
///
/// Create via [`ChannelClientBuilder`](crate::builder::ChannelClientBuilder).
#[derive(Debug, Clone)]
pub struct ChannelClient {
    pub(crate) ws_url: String,
    pub(crate) reconnect: ReconnectPolicy,
    pub(crate) outbound_buffer: usize,
    pub(crate) max_frame_bytes: usize,
}

/// State shared between the supervisor task and the [`LiveChannel`] handle.
struct Shared {
    state: watch::Sender<ChannelState>,
    log: Mutex<MessageLog>,
    inbound: broadcast::Sender<ChannelMessage>,
    /// Writer of the current connection; `Some` only while open.
    outbound: Mutex<Option<mpsc::Sender<Message>>>,
}

impl Shared {
    fn set_state(&self, next: ChannelState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                tracing::debug!(from = %current, to = %next, "live channel state");
                *current = next;
                true
            }
        });
    }
}

/// How a single connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionEnd {
    /// Transport went away (error, server close, failed handshake).
    Dropped { opened: bool },
    /// The credential changed; the connection was closed deliberately.
    CredentialChanged,
    /// Shut down, or the credential source is gone.
    Shutdown,
}

impl ChannelClient {
    /// Start a new builder.
    pub fn builder() -> crate::builder::ChannelClientBuilder {
        crate::builder::ChannelClientBuilder::new()
    }

    /// Spawn the supervisor task and return the handle consumers use.
    ///
    /// `credentials` is usually [`SessionStore::subscribe`](sa_auth::SessionStore::subscribe).
    /// Must be called from within a tokio runtime.
    pub fn spawn(self, credentials: watch::Receiver<Option<Credential>>) -> LiveChannel {
        let (state, _) = watch::channel(ChannelState::Idle);
        let (inbound, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        let shared = Arc::new(Shared {
            state,
            log: Mutex::new(MessageLog::default()),
            inbound,
            outbound: Mutex::new(None),
        });
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(self.run(shared.clone(), credentials, shutdown.clone()));

        LiveChannel {
            shared,
            shutdown,
            task: Some(task),
        }
    }

    /// Supervisor loop: one iteration per connection.
    async fn run(
        self,
        shared: Arc<Shared>,
        mut credentials: watch::Receiver<Option<Credential>>,
        shutdown: CancellationToken,
    ) {
        let mut attempt: u32 = 0;
        let mut connection: u64 = 0;

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            // Always connect with the credential current right now.
            let current = credentials.borrow_and_update().clone();
            let token = match current {
                Some(token) => token,
                None => {
                    shared.set_state(ChannelState::Idle);
                    attempt = 0;
                    tokio::select! {
                        changed = credentials.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = shutdown.cancelled() => break,
                    }
                    continue;
                }
            };

            connection += 1;
            shared.set_state(ChannelState::Connecting);

            match self
                .connect_and_run(&shared, &token, connection, &mut credentials, &shutdown)
                .await
            {
                ConnectionEnd::Shutdown => break,
                ConnectionEnd::CredentialChanged => {
                    attempt = 0;
                    continue;
                }
                ConnectionEnd::Dropped { opened } => {
                    if opened {
                        attempt = 0;
                    }
                }
            }

            if self.reconnect.should_give_up(attempt) {
                tracing::error!(
                    attempts = attempt,
                    "max reconnect attempts exhausted, waiting for a new credential"
                );
                shared.set_state(ChannelState::Failed);
                tokio::select! {
                    changed = credentials.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        attempt = 0;
                        continue;
                    }
                    _ = shutdown.cancelled() => break,
                }
            }

            let delay = self.reconnect.delay_for_attempt(attempt);
            shared.set_state(ChannelState::Retrying);
            tracing::info!(
                delay_ms = delay.as_millis() as u64,
                attempt = attempt + 1,
                "reconnecting"
            );
            TraceEvent::ReconnectScheduled {
                attempt: attempt + 1,
                delay_ms: delay.as_millis() as u64,
            }
            .emit();

            // The pending reconnect lives only inside this select: shutdown
            // or a credential change drops it before it can fire.
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    attempt += 1;
                }
                changed = credentials.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    attempt = 0;
                }
                _ = shutdown.cancelled() => break,
            }
        }

        shared.outbound.lock().take();
        shared.set_state(ChannelState::Terminated);
        tracing::debug!("live channel terminated");
    }

    /// Single connection lifecycle: connect -> read/write loop -> close.
    async fn connect_and_run(
        &self,
        shared: &Shared,
        token: &Credential,
        connection: u64,
        credentials: &mut watch::Receiver<Option<Credential>>,
        shutdown: &CancellationToken,
    ) -> ConnectionEnd {
        let url = self.build_url(token);
        tracing::info!(ws_url = %self.ws_url, connection, "connecting live channel");

        let connected = tokio::select! {
            r = tokio_tungstenite::connect_async(url.as_str()) => r,
            changed = credentials.changed() => {
                return if changed.is_ok() {
                    ConnectionEnd::CredentialChanged
                } else {
                    ConnectionEnd::Shutdown
                };
            }
            _ = shutdown.cancelled() => return ConnectionEnd::Shutdown,
        };

        let ws = match connected {
            Ok((ws, _response)) => ws,
            Err(e) => {
                tracing::warn!(connection, error = %e, "live channel connect failed");
                return ConnectionEnd::Dropped { opened: false };
            }
        };
        let (mut sink, mut stream) = ws.split();

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(self.outbound_buffer);
        *shared.outbound.lock() = Some(outbound_tx);
        shared.set_state(ChannelState::Open);
        tracing::info!(connection, "live channel connected");
        TraceEvent::ChannelOpened { connection }.emit();

        let mut received: u64 = 0;
        let end = loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if self.accept_frame(shared, &text) {
                            received += 1;
                        }
                    }
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                        Ok(text) => {
                            if self.accept_frame(shared, &text) {
                                received += 1;
                            }
                        }
                        Err(_) => {
                            tracing::error!(bytes = data.len(), "dropping non-UTF-8 binary frame");
                            TraceEvent::FrameDropped {
                                reason: "invalid_utf8".into(),
                                bytes: data.len(),
                            }
                            .emit();
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(connection, close = ?frame, "server closed live channel");
                        break ConnectionEnd::Dropped { opened: true };
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!(connection, error = %e, "live channel error");
                        break ConnectionEnd::Dropped { opened: true };
                    }
                    None => {
                        tracing::info!(connection, "live channel stream ended");
                        break ConnectionEnd::Dropped { opened: true };
                    }
                },
                Some(msg) = outbound_rx.recv() => {
                    if let Err(e) = sink.send(msg).await {
                        tracing::error!(connection, error = %e, "live channel write failed");
                        break ConnectionEnd::Dropped { opened: true };
                    }
                }
                changed = credentials.changed() => {
                    break if changed.is_ok() {
                        ConnectionEnd::CredentialChanged
                    } else {
                        ConnectionEnd::Shutdown
                    };
                }
                _ = shutdown.cancelled() => break ConnectionEnd::Shutdown,
            }
        };

        // Stop accepting sends before anything else observes the close.
        shared.outbound.lock().take();

        let deliberate = !matches!(end, ConnectionEnd::Dropped { .. });
        if !deliberate {
            // Frames that raced the drop have nowhere to go.
            let mut discarded = 0usize;
            while outbound_rx.try_recv().is_ok() {
                discarded += 1;
            }
            if discarded > 0 {
                tracing::warn!(connection, discarded, "discarding frames queued on a dropped connection");
            }
        }
        if deliberate {
            // Frames accepted by `send` before the close still go out.
            let flush = async {
                while let Ok(msg) = outbound_rx.try_recv() {
                    if sink.send(msg).await.is_err() {
                        return;
                    }
                }
                let _ = sink.send(Message::Close(None)).await;
            };
            let _ = tokio::time::timeout(CLOSE_TIMEOUT, flush).await;
            tracing::info!(connection, "live channel closed");
        } else {
            tracing::info!(connection, "live channel disconnected");
        }
        TraceEvent::ChannelClosed {
            connection,
            deliberate,
            messages_received: received,
        }
        .emit();

        end
    }

    /// Validate one inbound text frame and append it to the log.
    ///
    /// Returns `false` when the frame was dropped.
    fn accept_frame(&self, shared: &Shared, text: &str) -> bool {
        if text.len() > self.max_frame_bytes {
            tracing::warn!(
                bytes = text.len(),
                max = self.max_frame_bytes,
                "inbound frame exceeds max_frame_bytes, dropping"
            );
            TraceEvent::FrameDropped {
                reason: "too_large".into(),
                bytes: text.len(),
            }
            .emit();
            return false;
        }

        match ChannelMessage::parse(text) {
            Ok(msg) => {
                shared.log.lock().push(msg.clone());
                // No subscribers is fine.
                let _ = shared.inbound.send(msg);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, bytes = text.len(), "failed to parse live channel frame");
                TraceEvent::FrameDropped {
                    reason: e.reason().into(),
                    bytes: text.len(),
                }
                .emit();
                false
            }
        }
    }

    /// Build the connect URL carrying the percent-encoded credential.
    fn build_url(&self, token: &Credential) -> String {
        let base = &self.ws_url;
        let sep = if base.contains('?') { "&" } else { "?" };
        let encoded = urlencoding::encode(token.expose());
        format!("{base}{sep}{TOKEN_QUERY_PARAM}={encoded}")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Consumer handle of a running live channel.
///
/// Dropping the handle shuts the channel down: the socket is closed and
/// no reconnect fires afterwards.  The message log belongs to this
/// instance; a new channel starts with an empty log.
pub struct LiveChannel {
    shared: Arc<Shared>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl LiveChannel {
    pub fn state(&self) -> ChannelState {
        *self.shared.state.borrow()
    }

    /// `true` while the connection is open.
    pub fn connected(&self) -> bool {
        self.state() == ChannelState::Open
    }

    /// Follow state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.shared.state.subscribe()
    }

    /// Snapshot of every accepted message, in arrival order.
    pub fn messages(&self) -> Vec<ChannelMessage> {
        self.shared.log.lock().entries().to_vec()
    }

    pub fn message_count(&self) -> usize {
        self.shared.log.lock().len()
    }

    pub fn last_message(&self) -> Option<ChannelMessage> {
        self.shared.log.lock().last().cloned()
    }

    /// Receive each message as it is appended to the log.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelMessage> {
        self.shared.inbound.subscribe()
    }

    /// Serialize `data` as JSON and send it on the open connection.
    ///
    /// When the channel is not open nothing is sent or queued; the
    /// failure is logged and returned as [`ChannelError::NotConnected`].
    /// `Ok` means the frame was queued on the open connection; if that
    /// connection drops before the frame is written, it is discarded and
    /// a warning is logged.
    pub fn send<T: Serialize + ?Sized>(&self, data: &T) -> Result<(), ChannelError> {
        let outbound = self.shared.outbound.lock();
        let tx = match outbound.as_ref() {
            Some(tx) if self.state() == ChannelState::Open => tx,
            _ => {
                tracing::error!(state = %self.state(), "live channel is not connected, dropping outbound frame");
                return Err(ChannelError::NotConnected);
            }
        };

        let json = serde_json::to_string(data).map_err(|e| {
            tracing::error!(error = %e, "failed to serialize outbound frame");
            ChannelError::Serialize(e)
        })?;

        tx.try_send(Message::Text(json)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                tracing::error!("live channel outbound buffer full, dropping frame");
                ChannelError::OutboundFull
            }
            mpsc::error::TrySendError::Closed(_) => {
                tracing::error!("live channel closed while sending, dropping frame");
                ChannelError::NotConnected
            }
        })
    }

    /// Wait until the channel reaches `target`, or `timeout` elapses.
    pub async fn wait_for_state(
        &self,
        target: ChannelState,
        timeout: Duration,
    ) -> Result<(), ChannelError> {
        let mut rx = self.watch_state();
        let reached = tokio::time::timeout(timeout, rx.wait_for(|s| *s == target))
            .await
            .map(|r| r.map(|_| ()));
        match reached {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(ChannelError::Shutdown),
            Err(_) => Err(ChannelError::Timeout(target)),
        }
    }

    /// Close the connection, cancel any pending reconnect, and wait for
    /// the supervisor to exit.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "live channel task ended abnormally");
            }
        }
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
