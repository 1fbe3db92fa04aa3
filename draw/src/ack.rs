//! Phase acknowledgements.
//!
//! An ack is a peer's claim that it has observed all evidence for a phase.
//! Acks are checked against local state before they count. Arrival order
//! does not matter: an ack that is consistent with local state but ahead of
//! it is held back and re-checked on every status evaluation.

use fairdraw_commit_reveal::{Commit, Reveal};
use fairdraw_types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::Candidate;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AckType {
    AllJoined,
    AllCommited,
    AllRevealed,
    Finished,
}

impl AckType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllJoined => "ALL_JOINED",
            Self::AllCommited => "ALL_COMMITED",
            Self::AllRevealed => "ALL_REVEALED",
            Self::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for AckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The payload of an `ACK` event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrawAck {
    AllJoined { candidates: Vec<Candidate> },
    AllCommited { commits: Vec<Commit> },
    AllRevealed { reveals: Vec<Reveal> },
    Finished { winner: Candidate },
}

impl DrawAck {
    pub fn ack_type(&self) -> AckType {
        match self {
            Self::AllJoined { .. } => AckType::AllJoined,
            Self::AllCommited { .. } => AckType::AllCommited,
            Self::AllRevealed { .. } => AckType::AllRevealed,
            Self::Finished { .. } => AckType::Finished,
        }
    }
}

/// How an ack relates to the local view of the draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckCheck {
    /// Claimed collection equals the local one.
    Matches,
    /// Consistent so far, but local state has not caught up yet.
    Pending,
    /// Contradicts something already observed locally.
    Conflicts,
}

/// Compare a claimed collection with the local one, keyed by user id.
///
/// Order is irrelevant. A claimed item from a user with nothing on file
/// locally is `Pending`; a differing item, a duplicate user in the claim,
/// or a local item missing from the claim is a `Conflicts`.
pub(crate) fn compare_by_user<T, F>(claimed: &[T], local: &[T], user_of: F) -> AckCheck
where
    T: PartialEq,
    F: Fn(&T) -> &UserId,
{
    let mut claimed_by_user: HashMap<&UserId, &T> = HashMap::with_capacity(claimed.len());
    for item in claimed {
        if claimed_by_user.insert(user_of(item), item).is_some() {
            return AckCheck::Conflicts;
        }
    }

    for item in local {
        match claimed_by_user.get(user_of(item)) {
            Some(claimed_item) if *claimed_item == item => {}
            _ => return AckCheck::Conflicts,
        }
    }

    if claimed_by_user.len() == local.len() {
        AckCheck::Matches
    } else {
        AckCheck::Pending
    }
}

/// Compare claimed and local candidate sets by id only.
pub(crate) fn compare_candidates(claimed: &[Candidate], local: &[Candidate], spots: usize) -> AckCheck {
    let claimed_ids: BTreeSet<&UserId> = claimed.iter().map(Candidate::id).collect();
    let local_ids: BTreeSet<&UserId> = local.iter().map(Candidate::id).collect();

    if claimed_ids.len() != claimed.len() || claimed_ids.len() > spots {
        return AckCheck::Conflicts;
    }
    if claimed_ids == local_ids {
        AckCheck::Matches
    } else if local_ids.is_subset(&claimed_ids) {
        AckCheck::Pending
    } else {
        AckCheck::Conflicts
    }
}

/// Per-type record of which users have sent a validated ack, plus the acks
/// still waiting for local state to catch up.
#[derive(Clone, Debug, Default)]
pub struct AckTable {
    received: BTreeMap<AckType, BTreeSet<UserId>>,
    pending: Vec<(UserId, DrawAck)>,
}

impl AckTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, ack_type: AckType, user: UserId) {
        self.received.entry(ack_type).or_default().insert(user);
    }

    pub fn has(&self, ack_type: AckType, user: &UserId) -> bool {
        self.received
            .get(&ack_type)
            .is_some_and(|users| users.contains(user))
    }

    /// Users that have sent a validated ack of this type.
    pub fn users(&self, ack_type: AckType) -> impl Iterator<Item = &UserId> {
        self.received.get(&ack_type).into_iter().flatten()
    }

    /// Hold an ack until it can be re-checked. A newer ack of the same type
    /// from the same user replaces the older one.
    pub fn park(&mut self, user: UserId, ack: DrawAck) {
        let ack_type = ack.ack_type();
        self.pending
            .retain(|(u, a)| !(u == &user && a.ack_type() == ack_type));
        self.pending.push((user, ack));
    }

    pub fn take_pending(&mut self) -> Vec<(UserId, DrawAck)> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stakeholder;

    #[derive(PartialEq, Debug)]
    struct Item(UserId, u8);

    fn item(user: &str, v: u8) -> Item {
        Item(UserId::from(user), v)
    }

    #[test]
    fn identical_sets_match_regardless_of_order() {
        let local = [item("a", 1), item("b", 2)];
        let claimed = [item("b", 2), item("a", 1)];
        assert_eq!(compare_by_user(&claimed, &local, |i| &i.0), AckCheck::Matches);
    }

    #[test]
    fn claim_ahead_of_local_is_pending() {
        let local = [item("a", 1)];
        let claimed = [item("a", 1), item("b", 2)];
        assert_eq!(compare_by_user(&claimed, &local, |i| &i.0), AckCheck::Pending);
    }

    #[test]
    fn differing_or_missing_items_conflict() {
        let local = [item("a", 1), item("b", 2)];
        assert_eq!(
            compare_by_user(&[item("a", 1), item("b", 9)], &local, |i| &i.0),
            AckCheck::Conflicts
        );
        assert_eq!(compare_by_user(&[item("a", 1)], &local, |i| &i.0), AckCheck::Conflicts);
        assert_eq!(
            compare_by_user(&[item("a", 1), item("a", 1)], &local[..1], |i| &i.0),
            AckCheck::Conflicts
        );
    }

    #[test]
    fn candidate_sets_compare_by_id() {
        let c = |id: &str| Candidate::new(Stakeholder::new(id), vec![]);
        let local = vec![c("a")];
        assert_eq!(compare_candidates(&[c("a"), c("b")], &local, 2), AckCheck::Pending);
        assert_eq!(compare_candidates(&[c("b"), c("a")], &[c("a"), c("b")], 2), AckCheck::Matches);
        assert_eq!(compare_candidates(&[c("b"), c("z")], &local, 2), AckCheck::Conflicts);
        assert_eq!(compare_candidates(&[c("a"), c("b"), c("c")], &local, 2), AckCheck::Conflicts);
    }

    #[test]
    fn parking_replaces_same_type_from_same_user() {
        let mut table = AckTable::new();
        let user = UserId::from("a");
        table.park(user.clone(), DrawAck::AllCommited { commits: vec![] });
        table.park(user.clone(), DrawAck::AllCommited { commits: vec![] });
        table.park(user, DrawAck::AllRevealed { reveals: vec![] });
        assert_eq!(table.pending_len(), 2);
    }

    #[test]
    fn ack_wire_format() {
        let ack = DrawAck::AllCommited { commits: vec![] };
        let value = serde_json::to_value(&ack).unwrap();
        assert_eq!(value, serde_json::json!({"type": "ALL_COMMITED", "commits": []}));
    }
}
