//! Wire payloads for commits and reveals.
//!
//! Field names are camelCase on the wire. Signatures are computed over
//! [`Commit::canonical_bytes`] / [`Reveal::canonical_bytes`], which is the
//! `serde_json` encoding of the struct (fixed field order, object keys in
//! metadata sorted).

use crate::CommitRevealError;
use fairdraw_crypto::{sign_message, verify_signature};
use fairdraw_types::{HashFunction, PrivateKey, PublicKey, Signature, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A commit before hashing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCommit {
    pub data: String,
    pub nonce: String,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl RawCommit {
    pub fn new(data: impl Into<String>, nonce: impl Into<String>, user_id: UserId) -> Self {
        Self {
            data: data.into(),
            nonce: nonce.into(),
            user_id,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A hashed commitment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub digest: String,
    pub timestamp: Timestamp,
    /// Optional so that a malformed commit still decodes and can be reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_function: Option<HashFunction>,
    pub user_id: UserId,
}

impl Commit {
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CommitRevealError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// The opening of a commit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reveal {
    pub data: String,
    pub nonce: String,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub timestamp: Timestamp,
}

impl Reveal {
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CommitRevealError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCommit {
    pub commit: Commit,
    pub signature: Signature,
}

impl SignedCommit {
    pub fn sign(commit: Commit, private_key: &PrivateKey) -> Result<Self, CommitRevealError> {
        let signature = sign_message(&commit.canonical_bytes()?, private_key);
        Ok(Self { commit, signature })
    }

    /// `false` when the signature does not verify or the payload cannot be encoded.
    pub fn verify(&self, public_key: &PublicKey) -> bool {
        match self.commit.canonical_bytes() {
            Ok(bytes) => verify_signature(&bytes, &self.signature, public_key),
            Err(_) => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedReveal {
    pub reveal: Reveal,
    pub signature: Signature,
}

impl SignedReveal {
    pub fn sign(reveal: Reveal, private_key: &PrivateKey) -> Result<Self, CommitRevealError> {
        let signature = sign_message(&reveal.canonical_bytes()?, private_key);
        Ok(Self { reveal, signature })
    }

    pub fn verify(&self, public_key: &PublicKey) -> bool {
        match self.reveal.canonical_bytes() {
            Ok(bytes) => verify_signature(&bytes, &self.signature, public_key),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairdraw_crypto::keypair_from_seed;
    use serde_json::json;

    fn commit() -> Commit {
        Commit {
            digest: "ab".repeat(32),
            timestamp: Timestamp::new(1_700_000_000_000),
            hash_function: Some(HashFunction::Sha256),
            user_id: UserId::from("alice"),
        }
    }

    #[test]
    fn commit_wire_names() {
        let value = serde_json::to_value(commit()).unwrap();
        assert_eq!(value["hashFunction"], "SHA-256");
        assert_eq!(value["userId"], "alice");
        assert_eq!(value["timestamp"], 1_700_000_000_000u64);
    }

    #[test]
    fn commit_without_hash_function_still_decodes() {
        let parsed: Commit = serde_json::from_value(json!({
            "digest": "00",
            "timestamp": 1,
            "userId": "bob"
        }))
        .unwrap();
        assert_eq!(parsed.hash_function, None);
    }

    #[test]
    fn signed_commit_verifies_only_for_signer() {
        let alice = keypair_from_seed(&[1; 32]);
        let bob = keypair_from_seed(&[2; 32]);
        let signed = SignedCommit::sign(commit(), &alice.private).unwrap();
        assert!(signed.verify(&alice.public));
        assert!(!signed.verify(&bob.public));
    }

    #[test]
    fn tampered_reveal_fails_verification() {
        let kp = keypair_from_seed(&[3; 32]);
        let reveal = Reveal {
            data: "3".into(),
            nonce: "abc".into(),
            user_id: UserId::from("alice"),
            metadata: Some(json!({"b": 1, "a": 2})),
            timestamp: Timestamp::new(5),
        };
        let mut signed = SignedReveal::sign(reveal, &kp.private).unwrap();
        let wire = serde_json::to_string(&signed).unwrap();
        let received: SignedReveal = serde_json::from_str(&wire).unwrap();
        assert!(received.verify(&kp.public));

        signed.reveal.data = "4".into();
        assert!(!signed.verify(&kp.public));
    }
}
