//! Commit creation and reveal validation.

use crate::{Commit, CommitRevealError, RawCommit, Reveal};
use fairdraw_crypto::{digest_hex, digest_length, random_bytes};
use fairdraw_types::{HashFunction, Timestamp};
use serde_json::Value;

pub const DIGEST_DELIMITER: char = '_';

const NONCE_BYTES: usize = 16;

/// Hash `raw` into a commit stamped with the current time.
pub fn create_commit(raw: &RawCommit, hash_function: HashFunction) -> Result<Commit, CommitRevealError> {
    Ok(Commit {
        digest: digest(&raw.data, &raw.nonce, raw.metadata.as_ref(), hash_function)?,
        timestamp: Timestamp::now(),
        hash_function: Some(hash_function),
        user_id: raw.user_id.clone(),
    })
}

/// Wrap `raw` into a reveal stamped with the current time. No hashing happens here.
pub fn create_reveal(raw: RawCommit) -> Reveal {
    Reveal {
        data: raw.data,
        nonce: raw.nonce,
        user_id: raw.user_id,
        metadata: raw.metadata.filter(|m| !m.is_null()),
        timestamp: Timestamp::now(),
    }
}

/// The digest `reveal` produces under `commit`'s hash function.
pub fn digest_from_reveal(reveal: &Reveal, commit: &Commit) -> Result<String, CommitRevealError> {
    digest(
        &reveal.data,
        &reveal.nonce,
        reveal.metadata.as_ref(),
        commit.hash_function.unwrap_or_default(),
    )
}

/// True iff `reveal` re-hashes to `commit.digest` and both belong to the same user.
pub fn validate_reveal(reveal: &Reveal, commit: &Commit) -> bool {
    if reveal.user_id != commit.user_id {
        return false;
    }
    matches!(digest_from_reveal(reveal, commit), Ok(d) if d == commit.digest)
}

pub fn check_commit_format(commit: &Commit) -> bool {
    match commit.hash_function {
        Some(hf) => !commit.digest.is_empty() && commit.digest.len() == digest_length(hf),
        None => false,
    }
}

/// Reveal data must be a base-10 integer so it can feed the winner sum.
pub fn check_reveal_format(reveal: &Reveal) -> bool {
    !reveal.nonce.is_empty() && !reveal.user_id.is_empty() && reveal.data.trim().parse::<i128>().is_ok()
}

pub fn random_nonce() -> Result<String, CommitRevealError> {
    Ok(hex::encode(random_bytes::<NONCE_BYTES>()?))
}

fn digest(
    data: &str,
    nonce: &str,
    metadata: Option<&Value>,
    hash_function: HashFunction,
) -> Result<String, CommitRevealError> {
    let metadata = metadata_string(metadata)?;
    let preimage = format!("{data}{DIGEST_DELIMITER}{nonce}{DIGEST_DELIMITER}{metadata}");
    Ok(digest_hex(hash_function, preimage.as_bytes()))
}

/// Falsy metadata (absent, null, false, 0, "") hashes as the empty string.
fn metadata_string(metadata: Option<&Value>) -> Result<String, CommitRevealError> {
    let falsy = match metadata {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(_) => false,
    };
    if falsy {
        return Ok(String::new());
    }
    serde_json::to_string(&metadata).map_err(|e| CommitRevealError::StringifyMetadata(e.to_string()))
}
