//! Draw events as exchanged between peers.
//!
//! On the wire an event is `{drawUuid, timestamp, from, eventId, type, data}`
//! where the shape of `data` depends on `type`.

use crate::{DrawAck, DrawSnapshot, Stakeholder};
use fairdraw_commit_reveal::{Commit, Reveal, SignedCommit, SignedReveal};
use fairdraw_types::{DrawStatus, FairdrawError, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawEvent {
    pub draw_uuid: String,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Stakeholder>,
    pub event_id: String,
    #[serde(flatten)]
    pub kind: DrawEventKind,
}

impl DrawEvent {
    /// A new event with a fresh id, stamped now.
    pub fn new(draw_uuid: impl Into<String>, from: Option<Stakeholder>, kind: DrawEventKind) -> Self {
        Self {
            draw_uuid: draw_uuid.into(),
            timestamp: Timestamp::now(),
            from,
            event_id: Uuid::new_v4().to_string(),
            kind,
        }
    }

    pub fn event_type(&self) -> DrawEventType {
        self.kind.event_type()
    }

    pub fn sender(&self) -> Option<&UserId> {
        self.from.as_ref().map(|s| &s.id)
    }

    /// Decode an event, returning `Ok(None)` for a `type` this peer does not know.
    pub fn from_json(json: &str) -> Result<Option<Self>, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let known = value
            .get("type")
            .and_then(|t| t.as_str())
            .is_some_and(|t| t.parse::<DrawEventType>().is_ok());
        if !known {
            return Ok(None);
        }
        serde_json::from_value(value).map(Some)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Reported when a peer's ack contradicts the reporter's local state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckMismatchReport {
    pub user_id: UserId,
    pub ack: DrawAck,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrawEventKind {
    DrawCreated(DrawSnapshot),
    DrawDeleted(DrawSnapshot),
    StakeholderSubscribed(Stakeholder),
    StakeholderUnsubscribed(Stakeholder),
    CandidateSubscribed(Stakeholder),
    CandidateUnsubscribed(Stakeholder),
    CommitReceived(SignedCommit),
    RevealReceived(SignedReveal),
    AllCommitsReceived(Vec<Commit>),
    AllRevealsReceived(Vec<Reveal>),
    StatusChanged(DrawStatus),
    InvalidCommitFormat(SignedCommit),
    InvalidRevealFormat(SignedReveal),
    InvalidRevealMask(SignedReveal),
    ForbiddenCommitUserId(SignedCommit),
    ForbiddenRevealUserId(SignedReveal),
    UnauthorizedCommitSignature(SignedCommit),
    UnauthorizedRevealSignature(SignedReveal),
    DuplicateCommit(SignedCommit),
    DuplicateReveal(SignedReveal),
    AckMismatch(AckMismatchReport),
    Ack(DrawAck),
}

impl DrawEventKind {
    pub fn event_type(&self) -> DrawEventType {
        use DrawEventType as T;
        match self {
            Self::DrawCreated(_) => T::DrawCreated,
            Self::DrawDeleted(_) => T::DrawDeleted,
            Self::StakeholderSubscribed(_) => T::StakeholderSubscribed,
            Self::StakeholderUnsubscribed(_) => T::StakeholderUnsubscribed,
            Self::CandidateSubscribed(_) => T::CandidateSubscribed,
            Self::CandidateUnsubscribed(_) => T::CandidateUnsubscribed,
            Self::CommitReceived(_) => T::CommitReceived,
            Self::RevealReceived(_) => T::RevealReceived,
            Self::AllCommitsReceived(_) => T::AllCommitsReceived,
            Self::AllRevealsReceived(_) => T::AllRevealsReceived,
            Self::StatusChanged(_) => T::StatusChanged,
            Self::InvalidCommitFormat(_) => T::InvalidCommitFormat,
            Self::InvalidRevealFormat(_) => T::InvalidRevealFormat,
            Self::InvalidRevealMask(_) => T::InvalidRevealMask,
            Self::ForbiddenCommitUserId(_) => T::ForbiddenCommitUserId,
            Self::ForbiddenRevealUserId(_) => T::ForbiddenRevealUserId,
            Self::UnauthorizedCommitSignature(_) => T::UnauthorizedCommitSignature,
            Self::UnauthorizedRevealSignature(_) => T::UnauthorizedRevealSignature,
            Self::DuplicateCommit(_) => T::DuplicateCommit,
            Self::DuplicateReveal(_) => T::DuplicateReveal,
            Self::AckMismatch(_) => T::AckMismatch,
            Self::Ack(_) => T::Ack,
        }
    }

    /// The user an error event blames, if this is an error event.
    pub fn offender(&self) -> Option<&UserId> {
        match self {
            Self::CandidateUnsubscribed(s) => Some(&s.id),
            Self::InvalidCommitFormat(c)
            | Self::ForbiddenCommitUserId(c)
            | Self::UnauthorizedCommitSignature(c)
            | Self::DuplicateCommit(c) => Some(&c.commit.user_id),
            Self::InvalidRevealFormat(r)
            | Self::InvalidRevealMask(r)
            | Self::ForbiddenRevealUserId(r)
            | Self::UnauthorizedRevealSignature(r)
            | Self::DuplicateReveal(r) => Some(&r.reveal.user_id),
            Self::AckMismatch(report) => Some(&report.user_id),
            _ => None,
        }
    }
}

/// The `type` discriminant of a [`DrawEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawEventType {
    DrawCreated,
    DrawDeleted,
    StakeholderSubscribed,
    StakeholderUnsubscribed,
    CandidateSubscribed,
    CandidateUnsubscribed,
    CommitReceived,
    RevealReceived,
    AllCommitsReceived,
    AllRevealsReceived,
    StatusChanged,
    InvalidCommitFormat,
    InvalidRevealFormat,
    InvalidRevealMask,
    ForbiddenCommitUserId,
    ForbiddenRevealUserId,
    UnauthorizedCommitSignature,
    UnauthorizedRevealSignature,
    DuplicateCommit,
    DuplicateReveal,
    AckMismatch,
    Ack,
}

impl DrawEventType {
    pub const ALL: [DrawEventType; 22] = [
        Self::DrawCreated,
        Self::DrawDeleted,
        Self::StakeholderSubscribed,
        Self::StakeholderUnsubscribed,
        Self::CandidateSubscribed,
        Self::CandidateUnsubscribed,
        Self::CommitReceived,
        Self::RevealReceived,
        Self::AllCommitsReceived,
        Self::AllRevealsReceived,
        Self::StatusChanged,
        Self::InvalidCommitFormat,
        Self::InvalidRevealFormat,
        Self::InvalidRevealMask,
        Self::ForbiddenCommitUserId,
        Self::ForbiddenRevealUserId,
        Self::UnauthorizedCommitSignature,
        Self::UnauthorizedRevealSignature,
        Self::DuplicateCommit,
        Self::DuplicateReveal,
        Self::AckMismatch,
        Self::Ack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DrawCreated => "DRAW_CREATED",
            Self::DrawDeleted => "DRAW_DELETED",
            Self::StakeholderSubscribed => "STAKEHOLDER_SUBSCRIBED",
            Self::StakeholderUnsubscribed => "STAKEHOLDER_UNSUBSCRIBED",
            Self::CandidateSubscribed => "CANDIDATE_SUBSCRIBED",
            Self::CandidateUnsubscribed => "CANDIDATE_UNSUBSCRIBED",
            Self::CommitReceived => "COMMIT_RECEIVED",
            Self::RevealReceived => "REVEAL_RECEIVED",
            Self::AllCommitsReceived => "ALL_COMMITS_RECEIVED",
            Self::AllRevealsReceived => "ALL_REVEALS_RECEIVED",
            Self::StatusChanged => "STATUS_CHANGED",
            Self::InvalidCommitFormat => "INVALID_COMMIT_FORMAT",
            Self::InvalidRevealFormat => "INVALID_REVEAL_FORMAT",
            Self::InvalidRevealMask => "INVALID_REVEAL_MASK",
            Self::ForbiddenCommitUserId => "FORBIDDEN_COMMIT_USER_ID",
            Self::ForbiddenRevealUserId => "FORBIDDEN_REVEAL_USER_ID",
            Self::UnauthorizedCommitSignature => "UNAUTHORIZED_COMMIT_SIGNATURE",
            Self::UnauthorizedRevealSignature => "UNAUTHORIZED_REVEAL_SIGNATURE",
            Self::DuplicateCommit => "DUPLICATE_COMMIT",
            Self::DuplicateReveal => "DUPLICATE_REVEAL",
            Self::AckMismatch => "ACK_MISMATCH",
            Self::Ack => "ACK",
        }
    }

    /// Error variants invalidate the draw once recorded.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::CandidateUnsubscribed
                | Self::InvalidCommitFormat
                | Self::InvalidRevealFormat
                | Self::InvalidRevealMask
                | Self::ForbiddenCommitUserId
                | Self::ForbiddenRevealUserId
                | Self::UnauthorizedCommitSignature
                | Self::UnauthorizedRevealSignature
                | Self::DuplicateCommit
                | Self::DuplicateReveal
                | Self::AckMismatch
        )
    }
}

impl fmt::Display for DrawEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrawEventType {
    type Err = FairdrawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FairdrawError::Other(format!("unknown event type: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shape_is_flat() {
        let event = DrawEvent::new(
            "draw-1",
            Some(Stakeholder::new("alice")),
            DrawEventKind::StatusChanged(DrawStatus::Reveal),
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["drawUuid"], "draw-1");
        assert_eq!(value["type"], "STATUS_CHANGED");
        assert_eq!(value["data"], "REVEAL");
        assert_eq!(value["from"]["id"], "alice");
        assert!(value["eventId"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[test]
    fn decodes_ack_event() {
        let raw = json!({
            "drawUuid": "d",
            "timestamp": 10,
            "from": {"id": "bob"},
            "eventId": "e-1",
            "type": "ACK",
            "data": {"type": "ALL_COMMITED", "commits": []}
        })
        .to_string();
        let event = DrawEvent::from_json(&raw).unwrap().unwrap();
        assert_eq!(event.event_type(), DrawEventType::Ack);
        assert_eq!(event.sender(), Some(&UserId::from("bob")));
    }

    #[test]
    fn unknown_type_is_ignored() {
        let raw = json!({
            "drawUuid": "d",
            "timestamp": 10,
            "eventId": "e-2",
            "type": "SOMETHING_NEW",
            "data": {}
        })
        .to_string();
        assert_eq!(DrawEvent::from_json(&raw).unwrap(), None);
    }

    #[test]
    fn type_names_roundtrip() {
        for t in DrawEventType::ALL {
            assert_eq!(t.as_str().parse::<DrawEventType>().unwrap(), t);
        }
        assert!(DrawEventType::InvalidRevealMask.is_error());
        assert!(!DrawEventType::Ack.is_error());
    }
}
