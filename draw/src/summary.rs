//! Per-candidate progress view of a draw.

use crate::{Candidate, Draw};
use fairdraw_commit_reveal::{SignedCommit, SignedReveal};
use fairdraw_types::DrawStatus;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateProgress {
    /// Nothing expected from the candidate yet.
    Absent,
    PendingCommit,
    PendingReveal,
    RevealSent,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSummary {
    pub candidate: Candidate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_commit: Option<SignedCommit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_reveal: Option<SignedReveal>,
    pub status: CandidateProgress,
    pub winner: bool,
}

impl Draw {
    pub fn candidate_summaries(&self) -> Vec<CandidateSummary> {
        let winner_id = self.winner().map(|w| w.id().clone());
        self.candidates()
            .into_iter()
            .map(|candidate| {
                let signed_commit = self.commit_by_user(candidate.id()).map(|c| c.signed.clone());
                let signed_reveal = self.reveal_by_user(candidate.id()).map(|r| r.signed.clone());
                let status = match (&signed_commit, &signed_reveal) {
                    (_, Some(_)) => CandidateProgress::RevealSent,
                    (Some(_), None) => CandidateProgress::PendingReveal,
                    (None, None) if self.status() == DrawStatus::Pending => CandidateProgress::Absent,
                    (None, None) => CandidateProgress::PendingCommit,
                };
                let winner = winner_id.as_ref() == Some(candidate.id());
                CandidateSummary {
                    candidate,
                    signed_commit,
                    signed_reveal,
                    status,
                    winner,
                }
            })
            .collect()
    }
}
