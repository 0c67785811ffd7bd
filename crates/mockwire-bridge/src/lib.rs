//! mockwire bridge library entry.
//!
//! Runtime half of mockwire: the Caller/Responder endpoints and their
//! transports, the background mock engine, the page-side interception shim,
//! and the wiring that chains page -> mediator -> background. Consumed by the
//! binary (`main.rs`) and by integration tests.

pub mod api;
pub mod app_state;
pub mod config;
pub mod contexts;
pub mod engine;
pub mod obs;
pub mod ops;
pub mod router;
pub mod rpc;
pub mod shim;
pub mod transport;
