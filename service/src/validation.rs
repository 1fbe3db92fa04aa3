//! Admission checks for commits, reveals and acks.
//!
//! Checks run in a fixed order and stop at the first failure, so every peer
//! reports the same violation for the same evidence.

use fairdraw_commit_reveal::{check_commit_format, check_reveal_format, validate_reveal, SignedCommit, SignedReveal};
use fairdraw_draw::{AckCheck, Draw, DrawAck, DrawEventKind};
use std::fmt;

/// Why a commit or reveal was not admitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolViolation {
    InvalidCommitFormat,
    InvalidRevealFormat,
    ForbiddenCommitUserId,
    ForbiddenRevealUserId,
    DuplicateCommit,
    DuplicateReveal,
    UnauthorizedCommitSignature,
    UnauthorizedRevealSignature,
    /// The reveal does not re-hash to its commit: attributable cheating.
    InvalidRevealMask,
}

impl ProtocolViolation {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateCommit | Self::DuplicateReveal)
    }

    /// Evidence from non-candidates is reported but not stored.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::ForbiddenCommitUserId | Self::ForbiddenRevealUserId)
    }

    pub fn commit_event(self, signed: SignedCommit) -> DrawEventKind {
        match self {
            Self::ForbiddenCommitUserId => DrawEventKind::ForbiddenCommitUserId(signed),
            Self::DuplicateCommit => DrawEventKind::DuplicateCommit(signed),
            Self::UnauthorizedCommitSignature => DrawEventKind::UnauthorizedCommitSignature(signed),
            _ => DrawEventKind::InvalidCommitFormat(signed),
        }
    }

    pub fn reveal_event(self, signed: SignedReveal) -> DrawEventKind {
        match self {
            Self::ForbiddenRevealUserId => DrawEventKind::ForbiddenRevealUserId(signed),
            Self::DuplicateReveal => DrawEventKind::DuplicateReveal(signed),
            Self::UnauthorizedRevealSignature => DrawEventKind::UnauthorizedRevealSignature(signed),
            Self::InvalidRevealMask => DrawEventKind::InvalidRevealMask(signed),
            _ => DrawEventKind::InvalidRevealFormat(signed),
        }
    }
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidCommitFormat => "INVALID_COMMIT_FORMAT",
            Self::InvalidRevealFormat => "INVALID_REVEAL_FORMAT",
            Self::ForbiddenCommitUserId => "FORBIDDEN_COMMIT_USER_ID",
            Self::ForbiddenRevealUserId => "FORBIDDEN_REVEAL_USER_ID",
            Self::DuplicateCommit => "DUPLICATE_COMMIT",
            Self::DuplicateReveal => "DUPLICATE_REVEAL",
            Self::UnauthorizedCommitSignature => "UNAUTHORIZED_COMMIT_SIGNATURE",
            Self::UnauthorizedRevealSignature => "UNAUTHORIZED_REVEAL_SIGNATURE",
            Self::InvalidRevealMask => "INVALID_REVEAL_MASK",
        };
        f.write_str(name)
    }
}

/// format → eligible candidate → not yet committed → public key on file → signature.
pub fn check_commit(draw: &Draw, signed: &SignedCommit) -> Result<(), ProtocolViolation> {
    if !check_commit_format(&signed.commit) {
        return Err(ProtocolViolation::InvalidCommitFormat);
    }
    let candidate = draw
        .candidate_by_user_id(&signed.commit.user_id)
        .ok_or(ProtocolViolation::ForbiddenCommitUserId)?;
    if draw.commit_by_user(candidate.id()).is_some() {
        return Err(ProtocolViolation::DuplicateCommit);
    }
    let key = candidate
        .verifying_key()
        .ok_or(ProtocolViolation::UnauthorizedCommitSignature)?;
    if !signed.verify(&key) {
        return Err(ProtocolViolation::UnauthorizedCommitSignature);
    }
    Ok(())
}

/// eligible → not yet revealed → public key → signature → commit on file →
/// re-hash matches → data is numeric.
pub fn check_reveal(draw: &Draw, signed: &SignedReveal) -> Result<(), ProtocolViolation> {
    let candidate = draw
        .candidate_by_user_id(&signed.reveal.user_id)
        .ok_or(ProtocolViolation::ForbiddenRevealUserId)?;
    if draw.reveal_by_user(candidate.id()).is_some() {
        return Err(ProtocolViolation::DuplicateReveal);
    }
    let key = candidate
        .verifying_key()
        .ok_or(ProtocolViolation::UnauthorizedRevealSignature)?;
    if !signed.verify(&key) {
        return Err(ProtocolViolation::UnauthorizedRevealSignature);
    }
    let commit = draw
        .commit_by_user(candidate.id())
        .ok_or(ProtocolViolation::ForbiddenRevealUserId)?;
    if !validate_reveal(&signed.reveal, &commit.signed.commit) {
        return Err(ProtocolViolation::InvalidRevealMask);
    }
    if !check_reveal_format(&signed.reveal) {
        return Err(ProtocolViolation::InvalidRevealFormat);
    }
    Ok(())
}

/// True iff the ack's claimed collection equals the local one, order aside.
pub fn validate_ack(draw: &Draw, ack: &DrawAck) -> bool {
    draw.check_ack(ack) == AckCheck::Matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairdraw_commit_reveal::{create_commit, create_reveal, RawCommit};
    use fairdraw_crypto::{export_keypair, keypair_from_seed};
    use fairdraw_draw::Stakeholder;
    use fairdraw_types::{DrawStatus, HashFunction, KeyPair, UserId};

    fn key(seed: u8) -> KeyPair {
        keypair_from_seed(&[seed; 32])
    }

    fn commit_by(user: &str, seed: u8, data: &str, nonce: &str) -> SignedCommit {
        let raw = RawCommit::new(data, nonce, UserId::from(user));
        SignedCommit::sign(create_commit(&raw, HashFunction::Sha256).unwrap(), &key(seed).private).unwrap()
    }

    fn reveal_by(user: &str, seed: u8, data: &str, nonce: &str) -> SignedReveal {
        let reveal = create_reveal(RawCommit::new(data, nonce, UserId::from(user)));
        SignedReveal::sign(reveal, &key(seed).private).unwrap()
    }

    /// A and B with keys 1 and 2, already in the commit phase.
    fn draw_in_commit() -> Draw {
        let mut draw = Draw::new(2, UserId::from("a"), None);
        draw.add_stakeholder(Stakeholder::new("a").with_public_key(export_keypair(&key(1))), true);
        draw.add_stakeholder(Stakeholder::new("b").with_public_key(export_keypair(&key(2))), true);
        let ack = DrawAck::AllJoined { candidates: draw.candidates() };
        for u in ["a", "b"] {
            draw.set_ack(ack.clone(), UserId::from(u)).unwrap();
        }
        assert_eq!(draw.update_status().unwrap(), Some(DrawStatus::Commit));
        draw
    }

    fn draw_in_reveal() -> Draw {
        let mut draw = draw_in_commit();
        draw.register_commit(commit_by("a", 1, "3", "abc"), true).unwrap();
        draw.register_commit(commit_by("b", 2, "5", "xyz"), true).unwrap();
        let ack = DrawAck::AllCommited { commits: draw.commit_list() };
        for u in ["a", "b"] {
            draw.set_ack(ack.clone(), UserId::from(u)).unwrap();
        }
        assert_eq!(draw.update_status().unwrap(), Some(DrawStatus::Reveal));
        draw
    }

    #[test]
    fn honest_commit_passes() {
        let draw = draw_in_commit();
        assert_eq!(check_commit(&draw, &commit_by("a", 1, "3", "abc")), Ok(()));
    }

    #[test]
    fn commit_checks_run_in_order() {
        let mut draw = draw_in_commit();

        let mut malformed = commit_by("zed", 9, "1", "n");
        malformed.commit.digest.pop();
        assert_eq!(check_commit(&draw, &malformed), Err(ProtocolViolation::InvalidCommitFormat));

        assert_eq!(
            check_commit(&draw, &commit_by("zed", 9, "1", "n")),
            Err(ProtocolViolation::ForbiddenCommitUserId)
        );

        assert_eq!(
            check_commit(&draw, &commit_by("a", 2, "3", "abc")),
            Err(ProtocolViolation::UnauthorizedCommitSignature)
        );

        draw.register_commit(commit_by("a", 1, "3", "abc"), true).unwrap();
        assert_eq!(
            check_commit(&draw, &commit_by("a", 1, "4", "other")),
            Err(ProtocolViolation::DuplicateCommit)
        );
    }

    #[test]
    fn candidate_without_key_cannot_commit() {
        let mut draw = Draw::new(1, UserId::from("a"), None);
        draw.add_stakeholder(Stakeholder::new("a"), true);
        assert_eq!(
            check_commit(&draw, &commit_by("a", 1, "3", "abc")),
            Err(ProtocolViolation::UnauthorizedCommitSignature)
        );
    }

    #[test]
    fn wrong_nonce_is_a_mask_violation() {
        let draw = draw_in_reveal();
        assert_eq!(check_reveal(&draw, &reveal_by("b", 2, "5", "xyz")), Ok(()));
        assert_eq!(
            check_reveal(&draw, &reveal_by("b", 2, "5", "wrong-nonce")),
            Err(ProtocolViolation::InvalidRevealMask)
        );
    }

    #[test]
    fn reveal_checks_sender_before_content() {
        let mut draw = draw_in_reveal();
        assert_eq!(
            check_reveal(&draw, &reveal_by("zed", 9, "5", "xyz")),
            Err(ProtocolViolation::ForbiddenRevealUserId)
        );
        assert_eq!(
            check_reveal(&draw, &reveal_by("b", 1, "5", "xyz")),
            Err(ProtocolViolation::UnauthorizedRevealSignature)
        );
        draw.register_reveal(reveal_by("b", 2, "5", "xyz"), true).unwrap();
        assert_eq!(
            check_reveal(&draw, &reveal_by("b", 2, "5", "xyz")),
            Err(ProtocolViolation::DuplicateReveal)
        );
    }

    #[test]
    fn non_numeric_reveal_is_a_format_violation() {
        let mut draw = draw_in_commit();
        draw.register_commit(commit_by("a", 1, "three", "abc"), true).unwrap();
        draw.register_commit(commit_by("b", 2, "5", "xyz"), true).unwrap();
        let ack = DrawAck::AllCommited { commits: draw.commit_list() };
        for u in ["a", "b"] {
            draw.set_ack(ack.clone(), UserId::from(u)).unwrap();
        }
        draw.update_status().unwrap();
        assert_eq!(
            check_reveal(&draw, &reveal_by("a", 1, "three", "abc")),
            Err(ProtocolViolation::InvalidRevealFormat)
        );
    }

    #[test]
    fn ack_validation_is_order_insensitive() {
        let draw = draw_in_reveal();
        let mut commits = draw.commit_list();
        commits.reverse();
        assert!(validate_ack(&draw, &DrawAck::AllCommited { commits: commits.clone() }));
        commits.pop();
        assert!(!validate_ack(&draw, &DrawAck::AllCommited { commits }));
    }

    #[test]
    fn violations_map_to_wire_events() {
        let signed = reveal_by("b", 2, "5", "wrong-nonce");
        let kind = ProtocolViolation::InvalidRevealMask.reveal_event(signed);
        assert_eq!(kind.event_type().as_str(), "INVALID_REVEAL_MASK");
        assert_eq!(kind.offender().map(|u| u.as_str()), Some("b"));
    }
}
