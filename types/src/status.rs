//! Draw lifecycle status.

use crate::FairdrawError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The phase a draw is in.
///
/// `Finished` and `Invalidated` are terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrawStatus {
    /// Waiting for every spot to be filled and acknowledged.
    #[default]
    Pending,
    /// Candidates must send their commit.
    Commit,
    /// Candidates must send their reveal.
    Reveal,
    /// A winner has been drawn.
    Finished,
    /// Cancelled: a departure, an invalid submission or a detected cheat.
    Invalidated,
}

impl DrawStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Invalidated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Commit => "COMMIT",
            Self::Reveal => "REVEAL",
            Self::Finished => "FINISHED",
            Self::Invalidated => "INVALIDATED",
        }
    }
}

impl fmt::Display for DrawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrawStatus {
    type Err = FairdrawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "COMMIT" => Ok(Self::Commit),
            "REVEAL" => Ok(Self::Reveal),
            "FINISHED" => Ok(Self::Finished),
            "INVALIDATED" => Ok(Self::Invalidated),
            other => Err(FairdrawError::UnknownStatus(other.to_string())),
        }
    }
}
