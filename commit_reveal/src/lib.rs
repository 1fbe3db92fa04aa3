//! Commit-reveal primitives.
//!
//! A participant first publishes a [`Commit`]: a digest of
//! `data || "_" || nonce || "_" || metadata` under one of the supported SHA-2
//! functions. Once every participant has committed, each publishes the
//! matching [`Reveal`] and anyone can check it against the commit with
//! [`validate_reveal`]. Both travel inside signed envelopes
//! ([`SignedCommit`], [`SignedReveal`]) whose signature covers the canonical
//! JSON bytes of the inner payload.

pub mod commitment;
pub mod error;
pub mod payload;

pub use commitment::{
    check_commit_format, check_reveal_format, create_commit, create_reveal, digest_from_reveal,
    random_nonce, validate_reveal, DIGEST_DELIMITER,
};
pub use error::CommitRevealError;
pub use payload::{Commit, RawCommit, Reveal, SignedCommit, SignedReveal};
