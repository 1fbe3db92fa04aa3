//! The draw aggregate and its phase state machine.
//!
//! ```text
//!  PENDING ──(all spots filled + ALL_JOINED)──▶ COMMIT
//!  COMMIT  ──(all commits    + ALL_COMMITED)──▶ REVEAL
//!  REVEAL  ──(all reveals    + ALL_REVEALED)──▶ FINISHED
//!  any     ──(error recorded)──────────────────▶ INVALIDATED
//! ```
//!
//! `FINISHED` and `INVALIDATED` are absorbing.

use crate::ack::{compare_by_user, compare_candidates};
use crate::{AckCheck, AckTable, AckType, Candidate, DrawAck, DrawError, DrawEvent, EventHistory, Stakeholder};
use fairdraw_commit_reveal::{Commit, Reveal, SignedCommit, SignedReveal};
use fairdraw_types::{DrawStatus, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;
use uuid::Uuid;

/// Public state of a draw as served by the transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawSnapshot {
    pub uuid: String,
    pub spots: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<UserId>,
    #[serde(default)]
    pub status: DrawStatus,
    #[serde(default)]
    pub stakeholders: Vec<Stakeholder>,
}

/// A commit on file, with the validity decided when it was received.
#[derive(Clone, Debug, PartialEq)]
pub struct RegisteredCommit {
    pub signed: SignedCommit,
    pub valid: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RegisteredReveal {
    pub signed: SignedReveal,
    pub valid: bool,
}

#[derive(Clone, Debug)]
pub struct Draw {
    uuid: String,
    data: Option<Value>,
    spots: usize,
    creator_id: Option<UserId>,
    status: DrawStatus,
    status_hint: DrawStatus,
    stakeholders: Vec<Stakeholder>,
    commits: Vec<RegisteredCommit>,
    reveals: Vec<RegisteredReveal>,
    acks: AckTable,
    rejected_acks: Vec<(UserId, DrawAck)>,
    sent_acks: BTreeSet<AckType>,
    errors: Vec<DrawEvent>,
    history: EventHistory,
    parked: Vec<DrawEvent>,
    winner: Option<Candidate>,
}

impl Draw {
    /// A fresh draw with a random v4 uuid.
    pub fn new(spots: usize, creator_id: UserId, data: Option<Value>) -> Self {
        let mut draw = Self::empty(Uuid::new_v4().to_string(), spots, data);
        draw.creator_id = Some(creator_id);
        draw
    }

    /// Rebuild from public state. The served status is kept as a hint only.
    pub fn from_snapshot(snapshot: DrawSnapshot) -> Self {
        let mut draw = Self::empty(snapshot.uuid, snapshot.spots, snapshot.data);
        draw.creator_id = snapshot.creator_id;
        draw.status_hint = snapshot.status;
        for stakeholder in snapshot.stakeholders {
            let eligible = stakeholder.eligible;
            draw.add_stakeholder(stakeholder, eligible);
        }
        draw
    }

    fn empty(uuid: String, spots: usize, data: Option<Value>) -> Self {
        Self {
            uuid,
            data,
            spots,
            creator_id: None,
            status: DrawStatus::Pending,
            status_hint: DrawStatus::Pending,
            stakeholders: Vec::new(),
            commits: Vec::new(),
            reveals: Vec::new(),
            acks: AckTable::new(),
            rejected_acks: Vec::new(),
            sent_acks: BTreeSet::new(),
            errors: Vec::new(),
            history: EventHistory::new(),
            parked: Vec::new(),
            winner: None,
        }
    }

    pub fn snapshot(&self) -> DrawSnapshot {
        DrawSnapshot {
            uuid: self.uuid.clone(),
            spots: self.spots,
            data: self.data.clone(),
            creator_id: self.creator_id.clone(),
            status: self.status,
            stakeholders: self.stakeholders.clone(),
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn spots(&self) -> usize {
        self.spots
    }

    pub fn creator_id(&self) -> Option<&UserId> {
        self.creator_id.as_ref()
    }

    pub fn status(&self) -> DrawStatus {
        self.status
    }

    pub fn status_hint(&self) -> DrawStatus {
        self.status_hint
    }

    pub fn winner(&self) -> Option<&Candidate> {
        self.winner.as_ref()
    }

    pub fn stakeholders(&self) -> &[Stakeholder] {
        &self.stakeholders
    }

    pub fn commits(&self) -> &[RegisteredCommit] {
        &self.commits
    }

    pub fn reveals(&self) -> &[RegisteredReveal] {
        &self.reveals
    }

    pub fn history(&self) -> &EventHistory {
        &self.history
    }

    // ── stakeholders ────────────────────────────────────────────────────

    /// Insert or update by id. Announced fields overwrite stored ones.
    pub fn add_stakeholder(&mut self, mut stakeholder: Stakeholder, eligible: bool) {
        stakeholder.eligible = eligible;
        match self.stakeholders.iter_mut().find(|s| s.id == stakeholder.id) {
            Some(existing) => {
                existing.eligible = stakeholder.eligible;
                if stakeholder.profile.is_some() {
                    existing.profile = stakeholder.profile;
                }
                if stakeholder.public_key.is_some() {
                    existing.public_key = stakeholder.public_key;
                }
                if stakeholder.indexes.is_some() {
                    existing.indexes = stakeholder.indexes;
                }
            }
            None => self.stakeholders.push(stakeholder),
        }
    }

    pub fn remove_stakeholder(&mut self, id: &UserId) -> Result<Stakeholder, DrawError> {
        let position = self
            .stakeholders
            .iter()
            .position(|s| &s.id == id)
            .ok_or_else(|| DrawError::NotFound(id.clone()))?;
        Ok(self.stakeholders.remove(position))
    }

    pub fn stakeholder(&self, id: &UserId) -> Option<&Stakeholder> {
        self.stakeholders.iter().find(|s| &s.id == id)
    }

    /// Eligible stakeholders with their index slots.
    ///
    /// Announced indexes are used when together they partition `[0, n)`.
    /// Otherwise candidates are ordered by id and candidate `i` owns index `i`,
    /// which every peer derives identically whatever the arrival order.
    pub fn candidates(&self) -> Vec<Candidate> {
        let mut eligible: Vec<&Stakeholder> = self.stakeholders.iter().filter(|s| s.eligible).collect();
        eligible.sort_by(|a, b| a.id.cmp(&b.id));

        if announced_indexes_partition(&eligible) {
            return eligible
                .into_iter()
                .map(|s| {
                    let indexes = s.indexes.clone().unwrap_or_default();
                    Candidate::new(s.clone(), indexes)
                })
                .collect();
        }

        eligible
            .into_iter()
            .enumerate()
            .map(|(i, s)| Candidate::new(s.clone(), vec![i]))
            .collect()
    }

    pub fn candidates_count(&self) -> usize {
        self.stakeholders.iter().filter(|s| s.eligible).count()
    }

    pub fn is_candidate(&self, id: &UserId) -> bool {
        self.stakeholders.iter().any(|s| s.eligible && &s.id == id)
    }

    pub fn candidate_by_user_id(&self, id: &UserId) -> Option<Candidate> {
        self.candidates().into_iter().find(|c| c.id() == id)
    }

    pub fn candidate_with_index(&self, index: usize) -> Option<Candidate> {
        self.candidates().into_iter().find(|c| c.is_at_index(index))
    }

    // ── commits and reveals ─────────────────────────────────────────────

    pub fn commit_by_user(&self, id: &UserId) -> Option<&RegisteredCommit> {
        self.commits.iter().find(|c| &c.signed.commit.user_id == id)
    }

    pub fn reveal_by_user(&self, id: &UserId) -> Option<&RegisteredReveal> {
        self.reveals.iter().find(|r| &r.signed.reveal.user_id == id)
    }

    /// Store a commit. Validity is decided by the caller.
    pub fn register_commit(&mut self, signed: SignedCommit, valid: bool) -> Result<(), DrawError> {
        self.require_phase(DrawStatus::Commit)?;
        self.commits.push(RegisteredCommit { signed, valid });
        Ok(())
    }

    pub fn register_reveal(&mut self, signed: SignedReveal, valid: bool) -> Result<(), DrawError> {
        self.require_phase(DrawStatus::Reveal)?;
        self.reveals.push(RegisteredReveal { signed, valid });
        Ok(())
    }

    pub fn all_commits_valid(&self) -> bool {
        self.commits.iter().all(|c| c.valid)
    }

    pub fn all_reveals_valid(&self) -> bool {
        self.reveals.iter().all(|r| r.valid)
    }

    /// Plain commits on file, as carried by an `ALL_COMMITED` ack.
    pub fn commit_list(&self) -> Vec<Commit> {
        self.commits.iter().map(|c| c.signed.commit.clone()).collect()
    }

    pub fn reveal_list(&self) -> Vec<Reveal> {
        self.reveals.iter().map(|r| r.signed.reveal.clone()).collect()
    }

    fn require_phase(&self, expected: DrawStatus) -> Result<(), DrawError> {
        if self.status != expected {
            return Err(DrawError::WrongPhase {
                expected,
                actual: self.status,
            });
        }
        Ok(())
    }

    // ── acks ────────────────────────────────────────────────────────────

    /// Classify an ack against local state.
    pub fn check_ack(&self, ack: &DrawAck) -> AckCheck {
        match ack {
            DrawAck::AllJoined { candidates } => {
                compare_candidates(candidates, &self.candidates(), self.spots)
            }
            DrawAck::AllCommited { commits } => {
                compare_by_user(commits, &self.commit_list(), |c: &Commit| &c.user_id)
            }
            DrawAck::AllRevealed { reveals } => {
                compare_by_user(reveals, &self.reveal_list(), |r: &Reveal| &r.user_id)
            }
            DrawAck::Finished { winner } => match &self.winner {
                None => AckCheck::Pending,
                Some(local) if local.id() == winner.id() => AckCheck::Matches,
                Some(_) => AckCheck::Conflicts,
            },
        }
    }

    /// Record `user`'s ack if it matches local state, hold it if local state is
    /// behind, reject it if it contradicts local state.
    pub fn set_ack(&mut self, ack: DrawAck, user: UserId) -> Result<AckCheck, DrawError> {
        let check = self.check_ack(&ack);
        match check {
            AckCheck::Matches => self.acks.set(ack.ack_type(), user),
            AckCheck::Pending => self.acks.park(user, ack),
            AckCheck::Conflicts => {
                return Err(DrawError::AckMismatch {
                    ack_type: ack.ack_type(),
                    user,
                })
            }
        }
        Ok(check)
    }

    pub fn check_ack_from(&self, ack_type: AckType, user: &UserId) -> bool {
        self.acks.has(ack_type, user)
    }

    /// True iff every spot is held by a candidate that sent a validated ack of this type.
    pub fn check_acks_by_type(&self, ack_type: AckType) -> bool {
        let acked = self
            .acks
            .users(ack_type)
            .filter(|user| self.is_candidate(user))
            .count();
        acked == self.spots
    }

    /// Held acks that turned out to contradict local state since they arrived.
    pub fn take_rejected_acks(&mut self) -> Vec<(UserId, DrawAck)> {
        std::mem::take(&mut self.rejected_acks)
    }

    fn revalidate_pending_acks(&mut self) {
        for (user, ack) in self.acks.take_pending() {
            match self.check_ack(&ack) {
                AckCheck::Matches => self.acks.set(ack.ack_type(), user),
                AckCheck::Pending => self.acks.park(user, ack),
                AckCheck::Conflicts => self.rejected_acks.push((user, ack)),
            }
        }
    }

    /// Mark an ack type as sent by this peer. Returns `false` if it already was.
    pub fn mark_ack_sent(&mut self, ack_type: AckType) -> bool {
        self.sent_acks.insert(ack_type)
    }

    pub fn ack_sent(&self, ack_type: AckType) -> bool {
        self.sent_acks.contains(&ack_type)
    }

    // ── errors ──────────────────────────────────────────────────────────

    /// Append to the error ledger. An event id already on file is not added twice.
    pub fn set_error(&mut self, event: DrawEvent) {
        if self.errors.iter().any(|e| e.event_id == event.event_id) {
            return;
        }
        self.errors.push(event);
    }

    pub fn errors(&self) -> &[DrawEvent] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Users blamed by recorded errors, in ledger order without repeats.
    pub fn offenders(&self) -> Vec<UserId> {
        let mut seen = BTreeSet::new();
        self.errors
            .iter()
            .filter_map(|e| e.kind.offender())
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect()
    }

    // ── event history and early evidence ────────────────────────────────

    pub fn is_new_event(&self, event: &DrawEvent) -> bool {
        self.history.is_new(event)
    }

    pub fn record_event(&mut self, event: DrawEvent) -> bool {
        self.history.record(event)
    }

    /// Hold evidence that arrived before this peer reached its phase.
    pub fn park_event(&mut self, event: DrawEvent) {
        self.parked.push(event);
    }

    pub fn take_parked_events(&mut self) -> Vec<DrawEvent> {
        std::mem::take(&mut self.parked)
    }

    pub fn parked_len(&self) -> usize {
        self.parked.len()
    }

    // ── status ──────────────────────────────────────────────────────────

    /// Re-derive the status from current evidence.
    ///
    /// Returns `Some(new)` when the status changed and `None` otherwise.
    pub fn update_status(&mut self) -> Result<Option<DrawStatus>, DrawError> {
        if self.status.is_terminal() {
            return Ok(None);
        }
        self.revalidate_pending_acks();

        let previous = self.status;
        let count = self.candidates_count();

        let next = if self.has_errors() || !self.rejected_acks.is_empty() {
            DrawStatus::Invalidated
        } else if count < self.spots {
            DrawStatus::Pending
        } else if previous == DrawStatus::Pending
            && count == self.spots
            && self.check_acks_by_type(AckType::AllJoined)
        {
            DrawStatus::Commit
        } else if previous == DrawStatus::Commit
            && self.commits.len() == count
            && self.check_acks_by_type(AckType::AllCommited)
        {
            DrawStatus::Reveal
        } else if previous == DrawStatus::Reveal
            && self.reveals.len() == count
            && self.check_acks_by_type(AckType::AllRevealed)
        {
            self.winner = Some(self.compute_winner()?);
            DrawStatus::Finished
        } else {
            previous
        };

        if next == previous {
            return Ok(None);
        }
        debug!(draw = %self.uuid, from = %previous, to = %next, "draw status changed");
        self.status = next;
        Ok(Some(next))
    }

    // ── winner ──────────────────────────────────────────────────────────

    /// Revealed values as integers, in reveal order.
    pub fn values(&self) -> Result<Vec<i128>, DrawError> {
        self.reveals
            .iter()
            .map(|r| {
                r.signed
                    .reveal
                    .data
                    .trim()
                    .parse::<i128>()
                    .map_err(|_| DrawError::InvalidRevealData(r.signed.reveal.user_id.clone()))
            })
            .collect()
    }

    /// Total number of index slots held by candidates.
    pub fn index_space_len(&self) -> usize {
        self.candidates().iter().map(|c| c.indexes().len()).sum()
    }

    /// `(Σ values) mod index_space_len`, reduced per term so it cannot overflow.
    pub fn winner_index(&self) -> Result<usize, DrawError> {
        let modulus = self.index_space_len();
        if modulus == 0 {
            return Err(DrawError::NoCandidates);
        }
        let m = modulus as i128;
        let index = self
            .values()?
            .into_iter()
            .fold(0i128, |acc, v| (acc + v.rem_euclid(m)) % m);
        Ok(index as usize)
    }

    pub fn compute_winner(&self) -> Result<Candidate, DrawError> {
        self.require_phase(DrawStatus::Reveal)?;
        if self.candidates_count() == 0 {
            return Err(DrawError::NoCandidates);
        }
        if !self.all_reveals_valid() {
            return Err(DrawError::InvalidReveals);
        }
        let index = self.winner_index()?;
        debug!(draw = %self.uuid, index, "computed winner index");
        self.candidate_with_index(index)
            .ok_or(DrawError::WinnerIndexOutOfRange(index))
    }
}

fn announced_indexes_partition(eligible: &[&Stakeholder]) -> bool {
    if eligible.is_empty() {
        return false;
    }
    let mut seen = BTreeSet::new();
    for s in eligible {
        let Some(indexes) = s.indexes.as_ref().filter(|i| !i.is_empty()) else {
            return false;
        };
        for &i in indexes {
            if !seen.insert(i) {
                return false;
            }
        }
    }
    let n = seen.len();
    seen.into_iter().eq(0..n)
}
