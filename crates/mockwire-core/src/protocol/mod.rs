//! Bridge protocol modules.
//!
//! - `envelope`: the id-tagged request/reply frames exchanged on every hop.
//! - `id`: per-caller request id generation (never 0, wraps to 1).
//! - `call`: the typed bridge API (`BridgeCall`) carried inside envelopes.
//!
//! All decoders are panic-free: malformed input is reported as
//! `MockWireError` so a hostile or confused peer can never crash a context.

pub mod call;
pub mod envelope;
pub mod id;

pub use call::{BridgeCall, CallSet, DomainToggle, InterceptedRequest, PageInfo};
pub use envelope::{Frame, Reply, Request, RequestId};
pub use id::IdGenerator;
