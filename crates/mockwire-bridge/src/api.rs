//! Typed client for the bridge methods.

use std::sync::Arc;

use async_trait::async_trait;

use mockwire_core::error::Result;
use mockwire_core::protocol::{BridgeCall, DomainToggle, InterceptedRequest, PageInfo};
use mockwire_core::rules::MockOutcome;

use crate::rpc::Caller;

/// What the page-side code can ask of the privileged context.
#[async_trait]
pub trait ExtensionApi: Send + Sync {
    async fn handle_request(&self, req: InterceptedRequest) -> Result<MockOutcome>;
    async fn set_domain_enabled(&self, toggle: DomainToggle) -> Result<bool>;
    async fn should_intercept(&self, page: PageInfo) -> Result<bool>;
}

/// `ExtensionApi` over a `Caller`.
#[derive(Clone)]
pub struct BridgeClient {
    caller: Arc<Caller>,
}

impl BridgeClient {
    pub fn new(caller: Arc<Caller>) -> Self {
        Self { caller }
    }

    pub fn caller(&self) -> &Arc<Caller> {
        &self.caller
    }
}

#[async_trait]
impl ExtensionApi for BridgeClient {
    async fn handle_request(&self, req: InterceptedRequest) -> Result<MockOutcome> {
        self.caller.call_as(BridgeCall::HandleRequest(req)).await
    }

    async fn set_domain_enabled(&self, toggle: DomainToggle) -> Result<bool> {
        self.caller.call_as(BridgeCall::SetDomainEnabled(toggle)).await
    }

    async fn should_intercept(&self, page: PageInfo) -> Result<bool> {
        self.caller.call_as(BridgeCall::ShouldIntercept(page)).await
    }
}
