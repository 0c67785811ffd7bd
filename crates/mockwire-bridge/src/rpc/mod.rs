//! Caller / Responder endpoint pair.
//!
//! Every context runs one responder and may run a caller toward the next
//! context. Ids are per caller: a context that forwards a call issues a fresh
//! id on its own caller, so hops never share an id space.

pub mod caller;
pub mod responder;

pub use caller::Caller;
pub use responder::{answer, CallCtx, Responder, Service};
