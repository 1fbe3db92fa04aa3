//! Nullable infrastructure for deterministic testing.
//!
//! [`NullHub`] is an in-memory stand-in for the draw transport: it stores
//! draws, keeps a per-draw event log and fans events out to listeners.
//! Each peer talks to it through its own [`NullCommunicator`], which records
//! what it sent and can be stalled to exercise request timeouts.
//!
//! Nothing here touches the filesystem or the network.

pub mod communicator;
pub mod hub;

pub use communicator::NullCommunicator;
pub use hub::NullHub;
