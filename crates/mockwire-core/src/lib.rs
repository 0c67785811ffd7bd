//! mockwire core: transport-agnostic bridge protocol, rule model, and matching.
//!
//! This crate defines the wire-level contracts shared by every hop of the
//! bridge (page, mediator, background), the mock rule data model, and the pure
//! matching functions that decide whether a request is mocked. It carries no
//! transport or runtime dependencies so it can be reused in every context.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `MockWireError`/`Result`: a malformed
//! rule or envelope must never take down the context that evaluates it.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;
pub mod rules;
pub mod status;

/// Shared result type.
pub use error::{Result, MockWireError};
