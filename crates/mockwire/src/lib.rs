//! Top-level facade crate for mockwire.
//!
//! Re-exports the core protocol/matching types and the bridge runtime so users
//! can depend on a single crate.

pub mod core {
    pub use mockwire_core::*;
}

pub mod bridge {
    pub use mockwire_bridge::*;
}
