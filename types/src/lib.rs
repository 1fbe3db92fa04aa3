//! Fundamental types for the fairdraw protocol.
//!
//! This crate defines the value types shared across every other crate in the workspace:
//! user identifiers, millisecond timestamps, key and signature newtypes, the supported
//! hash functions and the draw status enum.

pub mod error;
pub mod hash_function;
pub mod keys;
pub mod status;
pub mod time;
pub mod user;

pub use error::FairdrawError;
pub use hash_function::HashFunction;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use status::DrawStatus;
pub use time::Timestamp;
pub use user::UserId;
