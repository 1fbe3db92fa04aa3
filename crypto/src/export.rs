//! Portable key export.
//!
//! Keys are exchanged in a JWK-shaped JSON object so they can be attached to
//! a stakeholder announcement and stored by whatever persistence the host
//! application uses:
//!
//! ```json
//! { "kty": "OKP", "crv": "Ed25519", "x": "<hex public>", "d": "<hex private>" }
//! ```
//!
//! `d` is only present for private exports.

use crate::{keys::public_from_private, CryptoError};
use fairdraw_types::{KeyPair, PrivateKey, PublicKey};
use serde::{Deserialize, Serialize};

const KEY_TYPE: &str = "OKP";
const CURVE: &str = "Ed25519";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedKey {
    pub kty: String,
    pub crv: String,
    pub x: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

impl ExportedKey {
    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    /// Drop the private component, if any.
    pub fn to_public(&self) -> ExportedKey {
        ExportedKey {
            d: None,
            ..self.clone()
        }
    }

    fn check_algorithm(&self) -> Result<(), CryptoError> {
        if self.kty != KEY_TYPE || self.crv != CURVE {
            return Err(CryptoError::KeyFormat(format!(
                "expected {KEY_TYPE}/{CURVE}, got {}/{}",
                self.kty, self.crv
            )));
        }
        Ok(())
    }
}

pub fn export_public_key(public: &PublicKey) -> ExportedKey {
    ExportedKey {
        kty: KEY_TYPE.to_string(),
        crv: CURVE.to_string(),
        x: public.to_hex(),
        d: None,
    }
}

pub fn export_keypair(keypair: &KeyPair) -> ExportedKey {
    ExportedKey {
        d: Some(keypair.private.to_hex()),
        ..export_public_key(&keypair.public)
    }
}

pub fn import_public_key(key: &ExportedKey) -> Result<PublicKey, CryptoError> {
    key.check_algorithm()?;
    PublicKey::from_hex(&key.x).map_err(|e| CryptoError::KeyFormat(e.to_string()))
}

/// Import a private export, checking that `x` belongs to `d`.
pub fn import_keypair(key: &ExportedKey) -> Result<KeyPair, CryptoError> {
    let public = import_public_key(key)?;
    let d = key
        .d
        .as_deref()
        .ok_or_else(|| CryptoError::KeyFormat("missing private component".into()))?;
    let private = PrivateKey::from_hex(d).map_err(|e| CryptoError::KeyFormat(e.to_string()))?;
    if public_from_private(&private) != public {
        return Err(CryptoError::KeyMismatch);
    }
    Ok(KeyPair { public, private })
}
