use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("operating system randomness unavailable: {0}")]
    Randomness(String),

    #[error("invalid key format: {0}")]
    KeyFormat(String),

    #[error("exported public key does not match the private key")]
    KeyMismatch,
}
