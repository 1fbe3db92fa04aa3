//! Hash functions a commit may declare.

use crate::FairdrawError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The SHA-2 variants supported for commit digests.
///
/// Two families (SHA-256 and SHA-512 cores) at two output sizes each.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashFunction {
    #[serde(rename = "SHA-224")]
    Sha224,
    #[default]
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "SHA-384")]
    Sha384,
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl HashFunction {
    pub const ALL: [HashFunction; 4] = [Self::Sha224, Self::Sha256, Self::Sha384, Self::Sha512];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }
}

impl fmt::Display for HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashFunction {
    type Err = FairdrawError;

    /// Accepts the wire names plus the common unhyphenated spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('_', "-").as_str() {
            "SHA-224" | "SHA224" => Ok(Self::Sha224),
            "SHA-256" | "SHA256" => Ok(Self::Sha256),
            "SHA-384" | "SHA384" => Ok(Self::Sha384),
            "SHA-512" | "SHA512" => Ok(Self::Sha512),
            _ => Err(FairdrawError::UnsupportedHashFunction(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_and_loose_names() {
        assert_eq!("SHA-384".parse::<HashFunction>().unwrap(), HashFunction::Sha384);
        assert_eq!("sha_224".parse::<HashFunction>().unwrap(), HashFunction::Sha224);
        assert_eq!("sha512".parse::<HashFunction>().unwrap(), HashFunction::Sha512);
    }

    #[test]
    fn unsupported_name_is_an_error() {
        assert_eq!(
            "MD5".parse::<HashFunction>(),
            Err(FairdrawError::UnsupportedHashFunction("MD5".into()))
        );
    }

    #[test]
    fn wire_name_matches_display() {
        for hf in HashFunction::ALL {
            let json = serde_json::to_string(&hf).unwrap();
            assert_eq!(json, format!("\"{hf}\""));
        }
    }
}
