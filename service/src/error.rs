use fairdraw_commit_reveal::CommitRevealError;
use fairdraw_crypto::CryptoError;
use fairdraw_draw::DrawError;
use fairdraw_network::CommunicatorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: &'static str, after_ms: u64 },

    #[error("transport error: {0}")]
    Communicator(CommunicatorError),

    #[error(transparent)]
    Draw(#[from] DrawError),

    #[error(transparent)]
    CommitReveal(#[from] CommitRevealError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("config error: {0}")]
    Config(String),
}

impl From<CommunicatorError> for ServiceError {
    fn from(err: CommunicatorError) -> Self {
        match err {
            CommunicatorError::Timeout { operation, after_ms } => Self::Timeout { operation, after_ms },
            other => Self::Communicator(other),
        }
    }
}
