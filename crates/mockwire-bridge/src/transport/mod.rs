//! Transports between contexts.
//!
//! - `bus`: page <-> mediator, a shared source-tagged lossless channel.
//! - `runtime`: mediator -> background, one message per call with a reply slot
//!   and the sender's page URL attached.
//! - `ws`: background served over WebSocket for out-of-process pages.
//!
//! A `Caller` only needs something that can push a frame toward its peer; that
//! is the `Outbound` trait. Replies come back through `Caller::receive`.

pub mod bus;
pub mod codec;
pub mod runtime;
pub mod ws;

use tokio::sync::mpsc;

use mockwire_core::error::{MockWireError, Result};
use mockwire_core::protocol::Frame;

/// Send half of a transport. Must not block.
pub trait Outbound: Send + Sync + 'static {
    fn send(&self, frame: Frame) -> Result<()>;
}

impl Outbound for mpsc::UnboundedSender<Frame> {
    fn send(&self, frame: Frame) -> Result<()> {
        mpsc::UnboundedSender::send(self, frame)
            .map_err(|_| MockWireError::Transport("peer channel closed".into()))
    }
}

impl Outbound for mpsc::Sender<Frame> {
    fn send(&self, frame: Frame) -> Result<()> {
        self.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => MockWireError::Transport("peer channel full".into()),
            mpsc::error::TrySendError::Closed(_) => MockWireError::Transport("peer channel closed".into()),
        })
    }
}
