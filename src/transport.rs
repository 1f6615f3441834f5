// Live battle WebSocket link.
//
// One client connection per battle id, opened against the platform's
// `/ws/battle/{id}/` route. The connection runs in a spawned task and
// forwards inbound text frames over an mpsc channel; every forwarded event
// is tagged with the battle key and subscription generation it was opened
// under, so the owner can discard late deliveries from a superseded link.

use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Events emitted by a live subscription to the application layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// The WebSocket handshake completed and the link is open.
    Opened { key: String, generation: u64 },
    /// A text frame was received (raw JSON string).
    Frame {
        key: String,
        generation: u64,
        text: String,
    },
    /// The link closed: connect failure, read error, or a server-initiated
    /// close. Not emitted when the owner closes the handle itself.
    Closed { key: String, generation: u64 },
}

/// Handle to one live battle subscription.
///
/// Dropping the handle closes the link.
pub struct LiveLink {
    key: String,
    generation: u64,
    outbound: mpsc::Sender<String>,
    task: Option<JoinHandle<()>>,
}

impl LiveLink {
    /// Open a live subscription for `key`, forwarding events through `tx`.
    ///
    /// The connection is established asynchronously in a spawned task; the
    /// caller observes the outcome as a [`LiveEvent::Opened`] or
    /// [`LiveEvent::Closed`] on the channel. No retry is attempted here --
    /// reconnect policy belongs to the owner.
    pub fn open(
        ws_base_url: &str,
        key: &str,
        generation: u64,
        tx: mpsc::Sender<LiveEvent>,
    ) -> Self {
        let url = battle_stream_url(ws_base_url, key);
        let (out_tx, out_rx) = mpsc::channel(32);
        let key = key.to_string();
        let task = tokio::spawn(run_connection(url, key.clone(), generation, tx, out_rx));
        LiveLink {
            key,
            generation,
            outbound: out_tx,
            task: Some(task),
        }
    }

    /// The battle key this link was opened for.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The subscription generation this link was opened under.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue a text payload for delivery.
    ///
    /// Silently dropped when the link is not open -- the contract promises
    /// no error, not delivery. Callers must not assume the payload arrives.
    pub fn send(&self, payload: String) {
        if self.task.is_none() {
            return;
        }
        let _ = self.outbound.try_send(payload);
    }

    /// Close the link. Idempotent: closing an already-closed handle has no
    /// effect and raises no error.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(key = %self.key, generation = self.generation, "live link closed");
        }
    }
}

impl Drop for LiveLink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Build the stream URL for a battle: `{base}/ws/battle/{id}/`.
pub fn battle_stream_url(ws_base_url: &str, key: &str) -> String {
    format!("{}/ws/battle/{}/", ws_base_url.trim_end_matches('/'), key)
}

/// Connection task: handshake, then pump frames until the link dies.
async fn run_connection(
    url: String,
    key: String,
    generation: u64,
    tx: mpsc::Sender<LiveEvent>,
    mut out_rx: mpsc::Receiver<String>,
) {
    let ws_stream = match connect_async(url.as_str()).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            warn!(key = %key, url = %url, "failed to open live link: {e}");
            let _ = tx.send(LiveEvent::Closed { key, generation }).await;
            return;
        }
    };
    info!(key = %key, generation, "live link open");

    if tx
        .send(LiveEvent::Opened {
            key: key.clone(),
            generation,
        })
        .await
        .is_err()
    {
        return;
    }

    // Drop anything queued while the handshake was in flight; send is only
    // honored on an open link.
    while out_rx.try_recv().is_ok() {}

    let (mut write, read) = ws_stream.split();
    let writer = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if write.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let channel_open = pump_frames(read, &tx, &key, generation).await.is_ok();
    writer.abort();

    if channel_open {
        let _ = tx.send(LiveEvent::Closed { key, generation }).await;
    }
}

/// Forward text frames from a WebSocket read stream as [`LiveEvent::Frame`]s.
///
/// Returns `Ok(())` when the stream ends, the peer sends a close frame, or a
/// read error occurs; returns `Err(())` if the receiving channel is closed
/// (owner gone), signalling the caller to stop quietly.
///
/// Generic over the stream type so it can be exercised with in-memory
/// frames, without opening sockets.
pub async fn pump_frames<St>(
    mut stream: St,
    tx: &mpsc::Sender<LiveEvent>,
    key: &str,
    generation: u64,
) -> Result<(), ()>
where
    St: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let event = LiveEvent::Frame {
                    key: key.to_string(),
                    generation,
                    text: text.to_string(),
                };
                if tx.send(event).await.is_err() {
                    return Err(());
                }
            }
            Ok(Message::Close(_)) => {
                info!(key = %key, "server sent close frame");
                break;
            }
            Err(e) => {
                warn!(key = %key, "live link read error: {e}");
                break;
            }
            _ => {
                // Ignore Binary, Ping, Pong, Frame variants.
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
