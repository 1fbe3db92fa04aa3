//! SHA-2 digests for commitments.
//!
//! Digests are lowercase hex strings, so a digest's string length is twice
//! the hash output size.

use crate::CryptoError;
use fairdraw_types::HashFunction;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::sync::OnceLock;

fn hash_parts<D: Digest>(parts: &[&[u8]]) -> String {
    let mut hasher = D::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// Hash `data` with the given function and return the hex digest.
pub fn digest_hex(hash_function: HashFunction, data: &[u8]) -> String {
    digest_hex_multi(hash_function, &[data])
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn digest_hex_multi(hash_function: HashFunction, parts: &[&[u8]]) -> String {
    match hash_function {
        HashFunction::Sha224 => hash_parts::<Sha224>(parts),
        HashFunction::Sha256 => hash_parts::<Sha256>(parts),
        HashFunction::Sha384 => hash_parts::<Sha384>(parts),
        HashFunction::Sha512 => hash_parts::<Sha512>(parts),
    }
}

/// Length of a hex digest produced by `hash_function`.
///
/// Computed once per process by hashing the empty string with every function.
pub fn digest_length(hash_function: HashFunction) -> usize {
    static LENGTHS: OnceLock<[usize; 4]> = OnceLock::new();
    let lengths = LENGTHS.get_or_init(|| HashFunction::ALL.map(|hf| digest_hex(hf, b"").len()));
    let slot = HashFunction::ALL
        .iter()
        .position(|hf| *hf == hash_function)
        .unwrap_or(0);
    lengths[slot]
}

/// Fill `N` bytes from the operating system's random source.
pub fn random_bytes<const N: usize>() -> Result<[u8; N], CryptoError> {
    let mut buf = [0u8; N];
    getrandom::getrandom(&mut buf).map_err(|e| CryptoError::Randomness(e.to_string()))?;
    Ok(buf)
}
