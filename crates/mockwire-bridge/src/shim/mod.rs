//! Interception shim for the page context.
//!
//! Wraps the page's two network primitives. Both ask the bridge
//! (`handleRequest`) before touching the network and fall back to the
//! original primitive on pass-through or on any bridge failure.

pub mod events;
pub mod fetch;
pub mod native;
pub mod xhr;

use std::sync::Arc;

use crate::api::ExtensionApi;

pub use events::{Event, EventKind, EventTarget, Listener};
pub use fetch::{Fetch, FetchRequest, FetchResponse, InterceptingFetch, RequestInit, RequestInput};
pub use native::{NativeXhr, NativeXhrFactory, ReqwestFetch};
pub use xhr::{InterceptedXhr, InterceptingXhrFactory, ReadyState, XhrFactory, XhrHandle};

/// The replaced primitives as seen by page code.
pub struct Shim<F, X> {
    pub fetch: InterceptingFetch<F>,
    pub xhr: InterceptingXhrFactory<X>,
}

/// Replace `fetch` and `xhr` with intercepting versions.
pub fn install<F: Fetch, X: XhrFactory>(api: Arc<dyn ExtensionApi>, fetch: F, xhr: X) -> Shim<F, X> {
    tracing::info!("fetch and xhr interceptors installed");
    Shim {
        fetch: InterceptingFetch::new(fetch, Arc::clone(&api)),
        xhr: InterceptingXhrFactory::new(xhr, api),
    }
}
