//! Privileged context: serves the mock engine over the runtime channel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use mockwire_core::protocol::Reply;

use crate::engine::MockEngine;
use crate::rpc::Responder;
use crate::transport::runtime::{self, RuntimeMessage, RuntimePort};

pub const HOP: &str = "background";

pub struct Background {
    engine: Arc<MockEngine>,
    tx: mpsc::UnboundedSender<RuntimeMessage>,
    task: JoinHandle<()>,
}

impl Background {
    pub fn spawn(engine: Arc<MockEngine>) -> Self {
        let (tx, rx) = runtime::channel();
        let responder = Arc::new(Responder::new(HOP, Arc::clone(&engine)));
        let task = runtime::serve(rx, responder);
        Self { engine, tx, task }
    }

    pub fn engine(&self) -> &Arc<MockEngine> {
        &self.engine
    }

    /// A port stamped with `page_url`; replies arrive on the returned receiver.
    pub fn port(&self, page_url: Option<String>) -> (RuntimePort, mpsc::UnboundedReceiver<Reply>) {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        (RuntimePort::new(self.tx.clone(), page_url, reply_tx), reply_rx)
    }
}

impl Drop for Background {
    fn drop(&mut self) {
        self.task.abort();
    }
}
