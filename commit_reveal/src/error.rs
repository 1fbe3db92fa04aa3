use fairdraw_crypto::CryptoError;
use fairdraw_types::FairdrawError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommitRevealError {
    #[error("ERR_STRINGIFY_METADATA: could not format metadata as a string: {0}")]
    StringifyMetadata(String),

    #[error("could not encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Types(#[from] FairdrawError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
