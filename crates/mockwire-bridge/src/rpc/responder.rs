use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;

use mockwire_core::error::Result;
use mockwire_core::protocol::{CallSet, Reply, Request};

/// Per-call context supplied by the transport that delivered the request.
#[derive(Debug, Clone, Default)]
pub struct CallCtx {
    sender_url: Option<Arc<str>>,
}

impl CallCtx {
    pub fn new() -> Self {
        Self::default()
    }

    /// URL of the page that (transitively) issued the call.
    pub fn with_sender_url(mut self, url: impl Into<Arc<str>>) -> Self {
        self.sender_url = Some(url.into());
        self
    }

    pub fn sender_url(&self) -> Option<&str> {
        self.sender_url.as_deref()
    }
}

/// Methods served by one responder. The call enum is the method table:
/// anything it cannot decode is answered with "not method <name> found".
#[async_trait]
pub trait Service: Send + Sync + 'static {
    type Call: CallSet;

    async fn handle(&self, ctx: CallCtx, call: Self::Call) -> Result<Value>;
}

/// Responder side of a bridge hop.
pub struct Responder<S: Service> {
    hop: &'static str,
    service: Arc<S>,
}

impl<S: Service> Responder<S> {
    pub fn new(hop: &'static str, service: Arc<S>) -> Self {
        Self { hop, service }
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Serve one request on its own task and hand the reply to `reply`.
    ///
    /// Requests are independent: many may be in flight, and replies go out
    /// in completion order, correlated only by id.
    pub fn dispatch<R>(&self, ctx: CallCtx, req: Request, reply: R) -> JoinHandle<()>
    where
        R: FnOnce(Reply) + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let hop = self.hop;
        tokio::spawn(async move {
            let id = req.id;
            let method = req.method.clone();
            // A panicking handler must still produce exactly one reply.
            let answer = match tokio::spawn(async move { answer(&*service, ctx, req).await }).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(hop, %id, method = %method, error = %e, "handler aborted");
                    Reply::err(id, "invoke error")
                }
            };
            tracing::debug!(hop, %id, method = %method, success = answer.success, "reply sent");
            reply(answer);
        })
    }
}

/// Decode, run, and wrap one request. Never fails: errors become rejections.
pub async fn answer<S: Service + ?Sized>(service: &S, ctx: CallCtx, req: Request) -> Reply {
    let id = req.id;
    let call = match S::Call::from_parts(&req.method, req.data) {
        Ok(c) => c,
        Err(e) => return Reply::from_error(id, &e),
    };
    match service.handle(ctx, call).await {
        Ok(v) => Reply::ok(id, v),
        Err(e) => Reply::from_error(id, &e),
    }
}
