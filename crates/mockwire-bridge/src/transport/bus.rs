//! Source-tagged window bus shared by the page and its mediator.
//!
//! Each post carries the poster's `Source`; a subscriber names the source it
//! listens to and gets only those posts. Delivery is lossless and in post
//! order: every subscriber owns an unbounded queue, so a burst of in-flight
//! calls never drops a request or a reply.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use mockwire_core::error::{MockWireError, Result};
use mockwire_core::protocol::Frame;

use crate::rpc::{CallCtx, Caller, Responder, Service};

use super::Outbound;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    /// The shim running in the page.
    InterceptorScript,
    /// The mediator.
    ContentScript,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posted {
    pub source: Source,
    pub data: Frame,
}

struct Subscriber {
    from: Source,
    tx: mpsc::UnboundedSender<Posted>,
}

#[derive(Clone, Default)]
pub struct WindowBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl WindowBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Deliver to every live subscriber listening to `source`.
    pub fn post(&self, source: Source, frame: Frame) -> Result<()> {
        let mut subs = self.subscribers();
        subs.retain(|s| !s.tx.is_closed());
        if subs.is_empty() {
            return Err(MockWireError::Transport("no listener on window bus".into()));
        }
        let posted = Posted { source, data: frame };
        for sub in subs.iter().filter(|s| s.from == source) {
            // only fails if the receiver closed after the retain above
            let _ = sub.tx.send(posted.clone());
        }
        Ok(())
    }

    /// Receive frames posted by `from` only.
    pub fn subscribe(&self, from: Source) -> BusReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers().push(Subscriber { from, tx });
        BusReceiver { rx }
    }

    /// An `Outbound` that posts as `source`.
    pub fn outbound(&self, source: Source) -> BusOutbound {
        BusOutbound { bus: self.clone(), source }
    }
}

pub struct BusReceiver {
    rx: mpsc::UnboundedReceiver<Posted>,
}

impl BusReceiver {
    /// Next frame from the subscribed source. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await.map(|posted| posted.data)
    }
}

pub struct BusOutbound {
    bus: WindowBus,
    source: Source,
}

impl Outbound for BusOutbound {
    fn send(&self, frame: Frame) -> Result<()> {
        self.bus.post(self.source, frame)
    }
}

/// Serve requests posted by `peer`, answering as `me`.
pub fn serve<S: Service>(
    bus: &WindowBus,
    peer: Source,
    me: Source,
    responder: Arc<Responder<S>>,
    ctx: CallCtx,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe(peer);
    let bus = bus.clone();
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let Frame::Request(req) = frame else { continue };
            let bus = bus.clone();
            responder.dispatch(ctx.clone(), req, move |reply| {
                if let Err(e) = bus.post(me, reply.into()) {
                    tracing::debug!(error = %e, "reply not delivered");
                }
            });
        }
    })
}

/// Feed replies posted by `peer` into `caller`.
pub fn pump(bus: &WindowBus, peer: Source, caller: Arc<Caller>) -> JoinHandle<()> {
    let mut rx = bus.subscribe(peer);
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Frame::Reply(reply) = frame {
                caller.receive(reply);
            }
        }
    })
}
