//! Draw participants.

use fairdraw_crypto::{import_public_key, ExportedKey};
use fairdraw_types::{PublicKey, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Any party known to a draw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stakeholder {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Value>,
    #[serde(default)]
    pub eligible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<ExportedKey>,
    /// Index slots the stakeholder claims, when the draw is not uniform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexes: Option<Vec<usize>>,
}

impl Stakeholder {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            profile: None,
            eligible: false,
            public_key: None,
            indexes: None,
        }
    }

    pub fn with_public_key(mut self, key: ExportedKey) -> Self {
        self.public_key = Some(key.to_public());
        self
    }

    pub fn with_profile(mut self, profile: Value) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Just the id, for the `from` field of outbound events.
    pub fn reference(&self) -> Self {
        Self::new(self.id.clone())
    }

    /// The decoded public key, if one was announced and it parses.
    pub fn verifying_key(&self) -> Option<PublicKey> {
        self.public_key.as_ref().and_then(|k| import_public_key(k).ok())
    }
}

/// An eligible stakeholder together with the index slots it owns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Stakeholder", into = "Stakeholder")]
pub struct Candidate {
    stakeholder: Stakeholder,
    indexes: Vec<usize>,
}

impl Candidate {
    pub fn new(stakeholder: Stakeholder, indexes: Vec<usize>) -> Self {
        Self {
            stakeholder,
            indexes,
        }
    }

    pub fn id(&self) -> &UserId {
        &self.stakeholder.id
    }

    pub fn stakeholder(&self) -> &Stakeholder {
        &self.stakeholder
    }

    pub fn indexes(&self) -> &[usize] {
        &self.indexes
    }

    pub fn is_at_index(&self, index: usize) -> bool {
        self.indexes.contains(&index)
    }

    pub fn verifying_key(&self) -> Option<PublicKey> {
        self.stakeholder.verifying_key()
    }
}

impl From<Stakeholder> for Candidate {
    fn from(stakeholder: Stakeholder) -> Self {
        let indexes = stakeholder.indexes.clone().unwrap_or_default();
        Self {
            stakeholder,
            indexes,
        }
    }
}

impl From<Candidate> for Stakeholder {
    fn from(candidate: Candidate) -> Self {
        Stakeholder {
            indexes: Some(candidate.indexes),
            eligible: true,
            ..candidate.stakeholder
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairdraw_crypto::{export_keypair, keypair_from_seed};

    #[test]
    fn announced_key_is_stripped_of_private_part() {
        let kp = keypair_from_seed(&[9; 32]);
        let s = Stakeholder::new("alice").with_public_key(export_keypair(&kp));
        assert_eq!(s.public_key.as_ref().and_then(|k| k.d.clone()), None);
        assert_eq!(s.verifying_key(), Some(kp.public));
    }

    #[test]
    fn candidate_serializes_as_stakeholder_with_indexes() {
        let c = Candidate::new(Stakeholder::new("bob"), vec![1, 3]);
        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(value["id"], "bob");
        assert_eq!(value["eligible"], true);
        assert_eq!(value["indexes"], serde_json::json!([1, 3]));

        let back: Candidate = serde_json::from_value(value).unwrap();
        assert!(back.is_at_index(3));
        assert!(!back.is_at_index(0));
    }
}
