//! Mediator -> background messaging.
//!
//! Each request travels as its own `RuntimeMessage` with a one-shot reply
//! slot. The port stamps the message with the URL of the page it serves; the
//! background reads the page from there, never from the payload. The
//! channel is unbounded so concurrent calls are queued, never rejected.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use mockwire_core::error::{MockWireError, Result};
use mockwire_core::protocol::{Frame, Reply, Request};

use crate::rpc::{CallCtx, Responder, Service};

use super::Outbound;

#[derive(Debug, Clone, Default)]
pub struct MessageSender {
    pub url: Option<String>,
}

#[derive(Debug)]
pub struct RuntimeMessage {
    pub sender: MessageSender,
    pub request: Request,
    pub respond: oneshot::Sender<Reply>,
}

/// Background end of the runtime channel.
pub fn channel() -> (mpsc::UnboundedSender<RuntimeMessage>, mpsc::UnboundedReceiver<RuntimeMessage>) {
    mpsc::unbounded_channel()
}

/// One mediator's connection to the background.
pub struct RuntimePort {
    tx: mpsc::UnboundedSender<RuntimeMessage>,
    sender: MessageSender,
    replies: mpsc::UnboundedSender<Reply>,
}

impl RuntimePort {
    /// Replies are delivered on `replies`; attach it to the caller using this port.
    pub fn new(
        tx: mpsc::UnboundedSender<RuntimeMessage>,
        page_url: Option<String>,
        replies: mpsc::UnboundedSender<Reply>,
    ) -> Self {
        Self { tx, sender: MessageSender { url: page_url }, replies }
    }
}

impl Outbound for RuntimePort {
    fn send(&self, frame: Frame) -> Result<()> {
        let Frame::Request(request) = frame else {
            return Err(MockWireError::Transport("runtime port only carries requests".into()));
        };
        let id = request.id;
        let (respond, answer) = oneshot::channel();
        let msg = RuntimeMessage { sender: self.sender.clone(), request, respond };
        self.tx
            .send(msg)
            .map_err(|_| MockWireError::Transport("background unreachable".into()))?;

        let replies = self.replies.clone();
        tokio::spawn(async move {
            match answer.await {
                Ok(reply) => {
                    let _ = replies.send(reply);
                }
                Err(_) => tracing::debug!(%id, "background dropped the reply slot"),
            }
        });
        Ok(())
    }
}

/// Serve runtime messages with `responder` until every port is dropped.
pub fn serve<S: Service>(
    mut rx: mpsc::UnboundedReceiver<RuntimeMessage>,
    responder: Arc<Responder<S>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let mut ctx = CallCtx::new();
            if let Some(url) = msg.sender.url {
                ctx = ctx.with_sender_url(url);
            }
            let respond = msg.respond;
            responder.dispatch(ctx, msg.request, move |reply| {
                let _ = respond.send(reply);
            });
        }
        tracing::debug!("runtime channel closed");
    })
}
