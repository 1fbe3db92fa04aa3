//! The draw event engine.
//!
//! Turns inbound [`DrawEvent`]s into mutations of a local [`Draw`] and
//! derives the outbound reactions: acks once a phase is complete locally,
//! error reports for rejected evidence, and status notifications.
//!
//! Evidence that arrives before this peer has reached the matching phase
//! is parked on the draw and replayed after the next status change, so the
//! outcome does not depend on the order peers see events in.
//!
//! Handling runs in two steps. All local mutation (the event, any replayed
//! evidence, status changes) completes first; only then are the reactions
//! posted. An ack is marked as sent once its post succeeds, so a transport
//! failure leaves it due and the next [`handle_event`](DrawEventEngine::handle_event)
//! or [`flush`](DrawEventEngine::flush) sends it again.

use fairdraw_commit_reveal::{SignedCommit, SignedReveal};
use fairdraw_draw::{AckCheck, AckMismatchReport, AckType, Draw, DrawAck, DrawError, DrawEvent, DrawEventKind, Stakeholder};
use fairdraw_network::Communicator;
use fairdraw_types::{DrawStatus, UserId};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::{DrawService, ServiceError};

/// Outbound events produced while mutating a draw, posted afterwards.
#[derive(Default)]
struct Reactions {
    errors: Vec<DrawEvent>,
    status_changes: Vec<DrawStatus>,
}

pub struct DrawEventEngine<C> {
    service: DrawService<C>,
}

impl<C: Communicator> DrawEventEngine<C> {
    pub fn new(service: DrawService<C>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &DrawService<C> {
        &self.service
    }

    /// Apply one event and everything it unblocks, then post the reactions.
    ///
    /// Returns the last status change it caused, if any. On a transport
    /// error the draw already holds the event's effects; acks still owed
    /// are sent by the next call.
    pub async fn handle_event(&self, draw: &mut Draw, event: DrawEvent) -> Result<Option<DrawStatus>, ServiceError> {
        let mut reactions = Reactions::default();
        self.apply(draw, event, &mut reactions)?;
        self.settle(draw, &mut reactions)?;

        let last_change = reactions.status_changes.last().copied();
        for error in reactions.errors {
            self.service.send_error(draw, error).await?;
        }
        self.flush(draw).await?;
        for status in reactions.status_changes {
            self.service.update_status(draw, status).await?;
        }
        Ok(last_change)
    }

    /// Send every ack the draw's current state calls for that has not been
    /// posted yet.
    pub async fn flush(&self, draw: &mut Draw) -> Result<(), ServiceError> {
        for ack_type in due_acks(draw) {
            if ack_type == AckType::Finished {
                self.service.send_winner(draw).await?;
            } else {
                self.service.send_ack(draw, ack_type).await?;
            }
            draw.mark_ack_sent(ack_type);
        }
        Ok(())
    }

    /// Re-derive the status until it stops changing, replaying parked
    /// evidence after each change.
    fn settle(&self, draw: &mut Draw, reactions: &mut Reactions) -> Result<(), ServiceError> {
        loop {
            let change = draw.update_status()?;

            for (user, ack) in draw.take_rejected_acks() {
                self.report_ack_mismatch(draw, user, ack, reactions);
            }

            let Some(status) = change else {
                return Ok(());
            };
            info!(draw = %draw.uuid(), status = %status, "status changed");
            if let Some(winner) = draw.winner() {
                info!(draw = %draw.uuid(), winner = %winner.id(), "winner drawn");
            }
            reactions.status_changes.push(status);

            let mut replay = VecDeque::from(draw.take_parked_events());
            while let Some(event) = replay.pop_front() {
                if let Err(err) = self.apply(draw, event, reactions) {
                    for rest in replay {
                        draw.park_event(rest);
                    }
                    return Err(err);
                }
            }
        }
    }

    fn apply(&self, draw: &mut Draw, event: DrawEvent, reactions: &mut Reactions) -> Result<(), ServiceError> {
        debug!(
            draw = %draw.uuid(),
            event_type = %event.event_type(),
            event_id = %event.event_id,
            "handling event"
        );
        match event.kind.clone() {
            DrawEventKind::CandidateSubscribed(stakeholder) => {
                self.on_candidate_subscribed(draw, stakeholder);
                Ok(())
            }
            DrawEventKind::CandidateUnsubscribed(_) => {
                draw.set_error(event);
                Ok(())
            }
            DrawEventKind::StakeholderSubscribed(stakeholder) => {
                if !draw.is_candidate(&stakeholder.id) {
                    draw.add_stakeholder(stakeholder, false);
                }
                Ok(())
            }
            DrawEventKind::StakeholderUnsubscribed(stakeholder) => {
                if draw.is_candidate(&stakeholder.id) {
                    return Ok(());
                }
                match draw.remove_stakeholder(&stakeholder.id) {
                    Ok(_) => debug!(draw = %draw.uuid(), user = %stakeholder.id, "stakeholder removed"),
                    Err(_) => debug!(draw = %draw.uuid(), user = %stakeholder.id, "unknown stakeholder left, nothing to remove"),
                }
                Ok(())
            }
            DrawEventKind::CommitReceived(signed) => self.on_commit_received(draw, event, signed, reactions),
            DrawEventKind::RevealReceived(signed) => self.on_reveal_received(draw, event, signed, reactions),
            DrawEventKind::Ack(ack) => self.on_ack(draw, event.sender().cloned(), ack, reactions),
            DrawEventKind::InvalidCommitFormat(_)
            | DrawEventKind::InvalidRevealFormat(_)
            | DrawEventKind::InvalidRevealMask(_)
            | DrawEventKind::ForbiddenCommitUserId(_)
            | DrawEventKind::ForbiddenRevealUserId(_)
            | DrawEventKind::UnauthorizedCommitSignature(_)
            | DrawEventKind::UnauthorizedRevealSignature(_)
            | DrawEventKind::DuplicateCommit(_)
            | DrawEventKind::DuplicateReveal(_)
            | DrawEventKind::AckMismatch(_) => {
                draw.set_error(event);
                Ok(())
            }
            DrawEventKind::DrawCreated(_)
            | DrawEventKind::DrawDeleted(_)
            | DrawEventKind::AllCommitsReceived(_)
            | DrawEventKind::AllRevealsReceived(_)
            | DrawEventKind::StatusChanged(_) => Ok(()),
        }
    }

    fn on_candidate_subscribed(&self, draw: &mut Draw, stakeholder: Stakeholder) {
        if draw.status() != DrawStatus::Pending {
            warn!(draw = %draw.uuid(), user = %stakeholder.id, status = %draw.status(), "draw already started, ignoring candidate");
            return;
        }
        if !draw.is_candidate(&stakeholder.id) && draw.candidates_count() >= draw.spots() {
            warn!(draw = %draw.uuid(), user = %stakeholder.id, "draw is full, ignoring candidate");
            return;
        }
        draw.add_stakeholder(stakeholder, true);
    }

    fn on_commit_received(
        &self,
        draw: &mut Draw,
        event: DrawEvent,
        signed: SignedCommit,
        reactions: &mut Reactions,
    ) -> Result<(), ServiceError> {
        let user = signed.commit.user_id.clone();
        if let Some(existing) = draw.commit_by_user(&user) {
            if existing.signed == signed {
                debug!(draw = %draw.uuid(), user = %user, "identical commit resubmitted");
            } else {
                warn!(draw = %draw.uuid(), user = %user, "conflicting duplicate commit rejected");
            }
            return Ok(());
        }
        match draw.status() {
            DrawStatus::Pending => {
                debug!(draw = %draw.uuid(), user = %user, "commit ahead of phase, parked");
                draw.park_event(event);
                return Ok(());
            }
            DrawStatus::Commit => {}
            status => {
                warn!(draw = %draw.uuid(), user = %user, status = %status, "late commit ignored");
                return Ok(());
            }
        }

        match self.service.check_commit(draw, &signed) {
            Ok(()) => draw.register_commit(signed, true)?,
            Err(violation) if violation.is_duplicate() => {}
            Err(violation) => {
                warn!(draw = %draw.uuid(), user = %user, %violation, "commit rejected");
                let error = self.service.event(draw.uuid(), violation.commit_event(signed.clone()));
                draw.set_error(error.clone());
                if !violation.is_forbidden() {
                    draw.register_commit(signed, false)?;
                }
                reactions.errors.push(error);
            }
        }
        Ok(())
    }

    fn on_reveal_received(
        &self,
        draw: &mut Draw,
        event: DrawEvent,
        signed: SignedReveal,
        reactions: &mut Reactions,
    ) -> Result<(), ServiceError> {
        let user = signed.reveal.user_id.clone();
        if let Some(existing) = draw.reveal_by_user(&user) {
            if existing.signed == signed {
                debug!(draw = %draw.uuid(), user = %user, "identical reveal resubmitted");
            } else {
                warn!(draw = %draw.uuid(), user = %user, "conflicting duplicate reveal rejected");
            }
            return Ok(());
        }
        match draw.status() {
            DrawStatus::Pending | DrawStatus::Commit => {
                debug!(draw = %draw.uuid(), user = %user, "reveal ahead of phase, parked");
                draw.park_event(event);
                return Ok(());
            }
            DrawStatus::Reveal => {}
            status => {
                warn!(draw = %draw.uuid(), user = %user, status = %status, "late reveal ignored");
                return Ok(());
            }
        }

        match self.service.check_reveal(draw, &signed) {
            Ok(()) => draw.register_reveal(signed, true)?,
            Err(violation) if violation.is_duplicate() => {}
            Err(violation) => {
                warn!(draw = %draw.uuid(), user = %user, %violation, "reveal rejected");
                let error = self.service.event(draw.uuid(), violation.reveal_event(signed.clone()));
                draw.set_error(error.clone());
                if !violation.is_forbidden() {
                    draw.register_reveal(signed, false)?;
                }
                reactions.errors.push(error);
            }
        }
        Ok(())
    }

    fn on_ack(
        &self,
        draw: &mut Draw,
        sender: Option<UserId>,
        ack: DrawAck,
        reactions: &mut Reactions,
    ) -> Result<(), ServiceError> {
        let Some(user) = sender else {
            warn!(draw = %draw.uuid(), "ack without sender ignored");
            return Ok(());
        };
        let ack_type = ack.ack_type();
        match draw.set_ack(ack.clone(), user.clone()) {
            Ok(AckCheck::Matches) => {
                debug!(draw = %draw.uuid(), user = %user, ack = %ack_type, "ack recorded");
                Ok(())
            }
            Ok(_) => {
                debug!(draw = %draw.uuid(), user = %user, ack = %ack_type, "ack ahead of local state, held");
                Ok(())
            }
            Err(DrawError::AckMismatch { .. }) => {
                self.report_ack_mismatch(draw, user, ack, reactions);
                Ok(())
            }
            Err(other) => Err(other.into()),
        }
    }

    fn report_ack_mismatch(&self, draw: &mut Draw, user: UserId, ack: DrawAck, reactions: &mut Reactions) {
        warn!(draw = %draw.uuid(), user = %user, ack = %ack.ack_type(), "ack contradicts local state");
        let error = self.service.event(
            draw.uuid(),
            DrawEventKind::AckMismatch(AckMismatchReport { user_id: user, ack }),
        );
        draw.set_error(error.clone());
        reactions.errors.push(error);
    }
}

/// Acks the draw's current state calls for that this peer has not posted.
fn due_acks(draw: &Draw) -> Vec<AckType> {
    let spots = draw.spots();
    let due = match draw.status() {
        DrawStatus::Pending if draw.candidates_count() == spots => Some(AckType::AllJoined),
        DrawStatus::Commit if draw.commits().len() == spots && draw.all_commits_valid() => Some(AckType::AllCommited),
        DrawStatus::Reveal if draw.reveals().len() == spots && draw.all_reveals_valid() => Some(AckType::AllRevealed),
        DrawStatus::Finished if draw.winner().is_some() => Some(AckType::Finished),
        _ => None,
    };
    due.into_iter().filter(|t| !draw.ack_sent(*t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceConfig;
    use fairdraw_commit_reveal::{create_commit, RawCommit};
    use fairdraw_crypto::{export_public_key, generate_keypair};
    use fairdraw_draw::DrawEventType;
    use fairdraw_nullables::{NullCommunicator, NullHub};
    use fairdraw_types::{HashFunction, KeyPair};
    use std::sync::Arc;

    fn engine(hub: &NullHub, id: &str) -> DrawEventEngine<NullCommunicator> {
        let service = DrawService::new(
            Arc::new(hub.communicator()),
            Stakeholder::new(id),
            generate_keypair().unwrap(),
            ServiceConfig {
                request_timeout_ms: 50,
                ..ServiceConfig::default()
            },
        );
        DrawEventEngine::new(service)
    }

    fn acks_posted(engine: &DrawEventEngine<NullCommunicator>, ack_type: AckType) -> usize {
        engine
            .service()
            .communicator()
            .sent()
            .iter()
            .filter(|e| matches!(&e.kind, DrawEventKind::Ack(ack) if ack.ack_type() == ack_type))
            .count()
    }

    fn candidate(id: &str, keys: &KeyPair) -> Stakeholder {
        Stakeholder::new(id).with_public_key(export_public_key(&keys.public))
    }

    async fn hosted_draw(engine: &DrawEventEngine<NullCommunicator>, spots: usize) -> Draw {
        let service = engine.service();
        service.open().await.unwrap();
        service.create_draw(spots, None).await.unwrap()
    }

    #[tokio::test]
    async fn candidate_past_the_last_spot_is_ignored() {
        let hub = NullHub::new();
        let engine = engine(&hub, "host");
        let mut draw = hosted_draw(&engine, 1).await;

        for id in ["alice", "bob"] {
            let keys = generate_keypair().unwrap();
            let event = engine
                .service()
                .event(draw.uuid(), DrawEventKind::CandidateSubscribed(candidate(id, &keys)));
            engine.handle_event(&mut draw, event).await.unwrap();
        }

        assert_eq!(draw.candidates_count(), 1);
        assert!(draw.is_candidate(&UserId::from("alice")));
        assert!(draw.ack_sent(AckType::AllJoined));
    }

    #[tokio::test]
    async fn early_commit_is_parked_until_the_commit_phase() {
        let hub = NullHub::new();
        let engine = engine(&hub, "host");
        let mut draw = hosted_draw(&engine, 1).await;
        let keys = generate_keypair().unwrap();
        let alice = candidate("alice", &keys);

        let raw = RawCommit::new("4", "n1", alice.id.clone());
        let signed = SignedCommit::sign(create_commit(&raw, HashFunction::default()).unwrap(), &keys.private).unwrap();
        let commit = DrawEvent::new(draw.uuid(), Some(alice.reference()), DrawEventKind::CommitReceived(signed));
        engine.handle_event(&mut draw, commit).await.unwrap();
        assert_eq!(draw.parked_len(), 1);
        assert!(draw.commits().is_empty());

        let join = DrawEvent::new(draw.uuid(), Some(alice.reference()), DrawEventKind::CandidateSubscribed(alice.clone()));
        engine.handle_event(&mut draw, join).await.unwrap();
        let ack = DrawEvent::new(
            draw.uuid(),
            Some(alice.reference()),
            DrawEventKind::Ack(DrawAck::AllJoined { candidates: draw.candidates() }),
        );
        let change = engine.handle_event(&mut draw, ack).await.unwrap();

        assert_eq!(change, Some(DrawStatus::Commit));
        assert_eq!(draw.parked_len(), 0);
        assert_eq!(draw.commits().len(), 1);
        assert!(draw.ack_sent(AckType::AllCommited));
    }

    #[tokio::test]
    async fn departing_candidate_invalidates() {
        let hub = NullHub::new();
        let engine = engine(&hub, "host");
        let mut draw = hosted_draw(&engine, 2).await;
        let alice = Stakeholder::new("alice");

        let join = engine.service().event(draw.uuid(), DrawEventKind::CandidateSubscribed(alice.clone()));
        engine.handle_event(&mut draw, join).await.unwrap();
        let leave = engine.service().event(draw.uuid(), DrawEventKind::CandidateUnsubscribed(alice));
        let change = engine.handle_event(&mut draw, leave).await.unwrap();

        assert_eq!(change, Some(DrawStatus::Invalidated));
        assert_eq!(draw.offenders(), vec![UserId::from("alice")]);
        let posted: Vec<_> = engine.service().communicator().sent().iter().map(|e| e.event_type()).collect();
        assert!(posted.contains(&DrawEventType::StatusChanged));
    }

    #[tokio::test]
    async fn ack_lost_to_a_timeout_is_posted_after_recovery() {
        let hub = NullHub::new();
        let engine = engine(&hub, "host");
        let mut draw = hosted_draw(&engine, 1).await;
        let alice = Stakeholder::new("alice");

        engine.service().communicator().stall(true);
        let join = engine
            .service()
            .event(draw.uuid(), DrawEventKind::CandidateSubscribed(alice.clone()));
        let err = engine.handle_event(&mut draw, join).await.unwrap_err();
        assert!(matches!(err, ServiceError::Timeout { operation: "post", .. }), "{err:?}");
        assert!(draw.is_candidate(&UserId::from("alice")));
        assert!(!draw.ack_sent(AckType::AllJoined));
        assert_eq!(acks_posted(&engine, AckType::AllJoined), 0);

        engine.service().communicator().stall(false);
        let redelivered = engine
            .service()
            .event(draw.uuid(), DrawEventKind::CandidateSubscribed(alice));
        engine.handle_event(&mut draw, redelivered).await.unwrap();

        assert!(draw.ack_sent(AckType::AllJoined));
        assert_eq!(acks_posted(&engine, AckType::AllJoined), 1);
    }

    #[tokio::test]
    async fn parked_commit_is_replayed_when_the_status_post_fails() {
        let hub = NullHub::new();
        let engine = engine(&hub, "host");
        let mut draw = hosted_draw(&engine, 1).await;
        let keys = generate_keypair().unwrap();
        let alice = candidate("alice", &keys);

        let raw = RawCommit::new("4", "n1", alice.id.clone());
        let signed = SignedCommit::sign(create_commit(&raw, HashFunction::default()).unwrap(), &keys.private).unwrap();
        let commit = DrawEvent::new(draw.uuid(), Some(alice.reference()), DrawEventKind::CommitReceived(signed));
        engine.handle_event(&mut draw, commit).await.unwrap();
        let join = DrawEvent::new(draw.uuid(), Some(alice.reference()), DrawEventKind::CandidateSubscribed(alice.clone()));
        engine.handle_event(&mut draw, join).await.unwrap();
        assert_eq!(draw.parked_len(), 1);

        engine.service().communicator().stall(true);
        let ack = DrawEvent::new(
            draw.uuid(),
            Some(alice.reference()),
            DrawEventKind::Ack(DrawAck::AllJoined { candidates: draw.candidates() }),
        );
        let err = engine.handle_event(&mut draw, ack).await.unwrap_err();
        assert!(matches!(err, ServiceError::Timeout { .. }), "{err:?}");

        assert_eq!(draw.status(), DrawStatus::Commit);
        assert_eq!(draw.parked_len(), 0);
        assert_eq!(draw.commits().len(), 1);
        assert!(!draw.ack_sent(AckType::AllCommited));

        engine.service().communicator().stall(false);
        engine.flush(&mut draw).await.unwrap();
        assert!(draw.ack_sent(AckType::AllCommited));
        assert_eq!(acks_posted(&engine, AckType::AllCommited), 1);
    }

    #[tokio::test]
    async fn flush_sends_nothing_when_no_ack_is_owed() {
        let hub = NullHub::new();
        let engine = engine(&hub, "host");
        let mut draw = hosted_draw(&engine, 2).await;

        engine.flush(&mut draw).await.unwrap();
        assert!(engine.service().communicator().sent().is_empty());
    }

    #[tokio::test]
    async fn stakeholder_leaving_is_removed_and_unknown_departures_are_ignored() {
        let hub = NullHub::new();
        let engine = engine(&hub, "host");
        let mut draw = hosted_draw(&engine, 2).await;
        let carol = Stakeholder::new("carol");

        let join = engine.service().event(draw.uuid(), DrawEventKind::StakeholderSubscribed(carol.clone()));
        engine.handle_event(&mut draw, join).await.unwrap();
        assert_eq!(draw.stakeholders().len(), 1);

        for _ in 0..2 {
            let leave = engine.service().event(draw.uuid(), DrawEventKind::StakeholderUnsubscribed(carol.clone()));
            assert_eq!(engine.handle_event(&mut draw, leave).await.unwrap(), None);
        }
        assert!(draw.stakeholders().is_empty());
        assert!(!draw.has_errors());
        assert_eq!(draw.status(), DrawStatus::Pending);
    }
}
