//! Cryptographic primitives for the fairdraw protocol.
//!
//! - **Ed25519** for signing commits and reveals and verifying peers' signatures
//! - **SHA-2** (224/256/384/512) digests, hex-encoded, for commitments
//! - Portable JSON key export so keys can cross the wire and be persisted

pub mod error;
pub mod export;
pub mod hash;
pub mod keys;
pub mod sign;

pub use error::CryptoError;
pub use export::{
    export_keypair, export_public_key, import_keypair, import_public_key, ExportedKey,
};
pub use hash::{digest_hex, digest_hex_multi, digest_length, random_bytes};
pub use keys::{generate_keypair, keypair_from_private, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
