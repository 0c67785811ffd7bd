//! WebSocket bridge endpoint.
//!
//! Serves the background responder to an out-of-process page or mediator.
//! Each text frame is one request envelope; replies go back on the same
//! socket in completion order.
//!
//! - Page URL from the query string (`/v1/bridge?page=...`) becomes the
//!   sender context of every call on the session
//! - Lifecycle: ping + idle timeout
//! - Frame size limit checked before decoding
//! - A dedicated writer task drains the outbound queue; the read loop never
//!   waits on it. Replies are queued with backpressure and never dropped,
//!   ping/pong are skipped while the queue is full.

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, Query, State},
    response::Response,
};
use futures_util::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::Instrument;

use mockwire_core::error::Result;
use mockwire_core::protocol::{envelope::encode_frame, Frame, Reply};

use crate::app_state::AppState;
use crate::rpc::CallCtx;
use crate::transport::codec::{decode, frame_len, Inbound};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub page: Option<String>,
}

pub async fn ws_upgrade(
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
    Query(q): Query<WsQuery>,
) -> Response {
    let max = app.cfg().bridge.max_frame_bytes;
    let span = tracing::info_span!("bridge_session", page = q.page.as_deref().unwrap_or("-"));
    ws.max_message_size(max).on_upgrade(move |socket| async move {
        let metrics = app.metrics();
        metrics.ws_sessions.inc(&[]);
        if let Err(e) = run_session(app, q, socket).instrument(span).await {
            tracing::debug!(error = %e, "bridge session ended with error");
        }
        metrics.ws_sessions.dec(&[]);
    })
}

async fn run_session(app: AppState, q: WsQuery, socket: WebSocket) -> Result<()> {
    let mut ctx = CallCtx::new();
    if let Some(page) = q.page.filter(|p| !p.is_empty()) {
        ctx = ctx.with_sender_url(page);
    }
    tracing::debug!("session opened");

    let cfg = &app.cfg().bridge;
    let (out_tx, out_rx) = mpsc::channel::<Message>(cfg.channel_capacity);
    let (ws_tx, mut ws_rx) = socket.split();
    let mut writer = spawn_writer(ws_tx, out_rx);

    let ping_every = Duration::from_millis(cfg.ping_interval_ms);
    let idle_timeout = Duration::from_millis(cfg.idle_timeout_ms);
    let max_frame = cfg.max_frame_bytes;

    let mut ping_tick = tokio::time::interval(ping_every);
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_activity = Instant::now();

    let responder = app.responder();
    let metrics = app.metrics();

    loop {
        tokio::select! {
            _ = &mut writer => {
                tracing::debug!("socket writer stopped");
                break;
            }

            incoming = ws_rx.next() => {
                let Some(Ok(msg)) = incoming else { break };
                last_activity = Instant::now();

                if frame_len(&msg) > max_frame {
                    metrics.decode_errors.inc(&[("reason", "too_large")]);
                    tracing::warn!(len = frame_len(&msg), max_frame, "frame over limit, closing");
                    break;
                }

                match decode(msg) {
                    Ok(Inbound::Frame { frame: Frame::Request(req), .. }) => {
                        let out = out_tx.clone();
                        responder.dispatch(ctx.clone(), req, move |reply| deliver_reply(out, reply));
                    }
                    Ok(Inbound::Frame { frame: Frame::Reply(reply), .. }) => {
                        // Nothing on this endpoint issues calls.
                        tracing::debug!(id = %reply.id, "unsolicited reply dropped");
                    }
                    Ok(Inbound::Ping(payload)) => {
                        enqueue_control(&out_tx, Message::Pong(payload));
                    }
                    Ok(Inbound::Pong(_)) => {}
                    Ok(Inbound::Close) => break,
                    Err(e) => {
                        metrics.decode_errors.inc(&[("reason", "malformed")]);
                        tracing::debug!(error = %e, "undecodable frame dropped");
                    }
                }
            }

            _ = ping_tick.tick() => {
                enqueue_control(&out_tx, Message::Ping(Vec::new()));
            }

            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if last_activity.elapsed() >= idle_timeout {
                    tracing::debug!("idle timeout");
                    break;
                }
            }
        }
    }

    writer.abort();
    tracing::debug!("session closed");
    Ok(())
}

/// Drain the outbound queue into the socket until the queue closes or a
/// write fails.
fn spawn_writer<W>(mut sink: W, mut out_rx: mpsc::Receiver<Message>) -> JoinHandle<()>
where
    W: Sink<Message> + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(m) = out_rx.recv().await {
            if sink.send(m).await.is_err() {
                break;
            }
        }
    })
}

/// Queue a reply, waiting for room on its own task.
fn deliver_reply(out: mpsc::Sender<Message>, reply: Reply) {
    let id = reply.id;
    let text = match encode_frame(&Frame::Reply(reply)) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(%id, error = %e, "reply encode failed");
            return;
        }
    };
    tokio::spawn(async move {
        if out.send(Message::Text(text)).await.is_err() {
            tracing::debug!(%id, "session gone before reply");
        }
    });
}

/// Queue a ping or pong without waiting. Returns false when it was skipped.
fn enqueue_control(out: &mpsc::Sender<Message>, m: Message) -> bool {
    match out.try_send(m) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::debug!("outbound queue full, control frame skipped");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use mockwire_core::protocol::RequestId;
    use serde_json::json;

    fn collecting_sink(
        tx: mpsc::UnboundedSender<Message>,
    ) -> impl Sink<Message, Error = ()> + Unpin + Send + 'static {
        Box::pin(futures_util::sink::unfold(tx, |tx, m: Message| async move {
            tx.send(m).map_err(|_| ())?;
            Ok::<_, ()>(tx)
        }))
    }

    #[tokio::test]
    async fn control_frames_are_skipped_when_queue_is_full() {
        let (out_tx, _out_rx) = mpsc::channel::<Message>(1);
        assert!(enqueue_control(&out_tx, Message::Ping(Vec::new())));
        // returns at once instead of waiting for the queue to drain
        assert!(!enqueue_control(&out_tx, Message::Pong(Vec::new())));
    }

    #[tokio::test]
    async fn replies_wait_for_room_instead_of_dropping() {
        let (out_tx, out_rx) = mpsc::channel::<Message>(1);
        assert!(enqueue_control(&out_tx, Message::Ping(Vec::new())));
        for n in 1..=3u64 {
            deliver_reply(out_tx.clone(), Reply::ok(RequestId::new(n).unwrap(), json!(n)));
        }
        drop(out_tx);

        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let writer = spawn_writer(collecting_sink(seen_tx), out_rx);
        writer.await.unwrap();

        assert!(matches!(seen_rx.recv().await, Some(Message::Ping(_))));
        let mut ids = Vec::new();
        while let Some(Message::Text(text)) = seen_rx.recv().await {
            let v: serde_json::Value = serde_json::from_str(&text).unwrap();
            ids.push(v["id"].as_u64().unwrap());
        }
        ids.sort();
        assert_eq!(ids, [1, 2, 3]);
    }
}
