//! Caller side of a bridge hop.
//!
//! A caller owns its id generator and its pending-call table. The send path
//! inserts, the receive path removes; nothing else touches the table. A reply
//! whose id is not pending (already settled, timed out, or never issued) is
//! dropped silently.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use mockwire_core::error::{MockWireError, Result};
use mockwire_core::protocol::{CallSet, IdGenerator, Reply, Request, RequestId};

use crate::obs::BridgeMetrics;
use crate::transport::Outbound;

/// Attempts to find a free id before giving up (only reachable with a tiny
/// wrap ceiling and that many calls outstanding).
const MAX_ID_PROBES: usize = 1024;

type Waiter = oneshot::Sender<Result<Value>>;

/// Removes a call's pending entry when `call_raw` returns or is dropped.
/// A no-op once the receive path has already taken the entry.
struct PendingGuard<'a> {
    caller: &'a Caller,
    id: RequestId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.caller.forget(self.id);
    }
}

pub struct Caller {
    hop: &'static str,
    ids: IdGenerator,
    pending: DashMap<RequestId, Waiter>,
    outbound: Arc<dyn Outbound>,
    timeout: Option<Duration>,
    metrics: Option<Arc<BridgeMetrics>>,
}

impl Caller {
    /// `hop` names the context issuing calls (used in logs and metrics).
    pub fn new(hop: &'static str, outbound: Arc<dyn Outbound>) -> Self {
        Self {
            hop,
            ids: IdGenerator::new(),
            pending: DashMap::new(),
            outbound,
            timeout: None,
            metrics: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_ids(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<BridgeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn hop(&self) -> &'static str {
        self.hop
    }

    /// Number of calls still waiting for a reply.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Issue a typed call and wait for its reply payload.
    pub async fn call<C: CallSet>(&self, call: C) -> Result<Value> {
        let (method, data) = call.into_parts()?;
        self.call_raw(method, data).await
    }

    /// Issue a typed call and decode the reply payload.
    pub async fn call_as<T: DeserializeOwned, C: CallSet>(&self, call: C) -> Result<T> {
        let (method, data) = call.into_parts()?;
        let value = self.call_raw(method, data).await?;
        serde_json::from_value(value)
            .map_err(|e| MockWireError::BadRequest(format!("{method} invalid reply: {e}")))
    }

    /// Issue a call by method name.
    ///
    /// Dropping the returned future before it settles releases the pending
    /// entry, so a cancelled call never waits on the table for a reply.
    pub async fn call_raw(&self, method: &str, data: Value) -> Result<Value> {
        let started = Instant::now();
        let (tx, rx) = oneshot::channel();
        let id = self.register(tx)?;
        self.track_pending(1);
        let _pending = PendingGuard { caller: self, id };

        let request = Request { id, method: method.to_string(), data };
        tracing::debug!(hop = self.hop, %id, method, "call sent");
        if let Err(e) = self.outbound.send(request.into()) {
            self.record(method, "transport", started);
            return Err(e);
        }

        let settled = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(r) => r,
                Err(_) => {
                    self.record(method, "timeout", started);
                    tracing::warn!(hop = self.hop, %id, method, "call timed out");
                    return Err(MockWireError::Timeout(limit.as_millis() as u64));
                }
            },
            None => rx.await,
        };

        let result = settled
            .unwrap_or_else(|_| Err(MockWireError::Transport("caller closed".into())));
        self.record(method, if result.is_ok() { "ok" } else { "rejected" }, started);
        result
    }

    /// Receive path: settle the pending call carrying `reply.id`, exactly once.
    pub fn receive(&self, reply: Reply) {
        let Some((id, waiter)) = self.pending.remove(&reply.id) else {
            tracing::debug!(hop = self.hop, id = %reply.id, "reply for unknown id dropped");
            if let Some(m) = &self.metrics {
                m.late_replies.inc(&[("hop", self.hop)]);
            }
            return;
        };
        self.track_pending(-1);
        if waiter.send(reply.into_result()).is_err() {
            tracing::debug!(hop = self.hop, %id, "caller stopped waiting before reply");
        }
    }

    /// Pump replies from a channel into `receive` until the channel closes.
    pub fn attach(self: &Arc<Self>, mut replies: mpsc::UnboundedReceiver<Reply>) -> JoinHandle<()> {
        let me = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(reply) = replies.recv().await {
                me.receive(reply);
            }
            tracing::debug!(hop = me.hop, "reply channel closed");
        })
    }

    fn register(&self, waiter: Waiter) -> Result<RequestId> {
        for _ in 0..MAX_ID_PROBES {
            let id = self.ids.next_id();
            if let Entry::Vacant(slot) = self.pending.entry(id) {
                slot.insert(waiter);
                return Ok(id);
            }
        }
        Err(MockWireError::Internal("no free request id".into()))
    }

    fn forget(&self, id: RequestId) {
        if self.pending.remove(&id).is_some() {
            self.track_pending(-1);
        }
    }

    fn track_pending(&self, delta: i64) {
        if let Some(m) = &self.metrics {
            m.pending_calls.add(&[("hop", self.hop)], delta);
        }
    }

    fn record(&self, method: &str, outcome: &str, started: Instant) {
        if let Some(m) = &self.metrics {
            m.calls.inc(&[("hop", self.hop), ("method", method), ("outcome", outcome)]);
            m.call_duration.observe(&[("hop", self.hop), ("method", method)], started.elapsed());
        }
    }
}
