//! The draw orchestration service.
//!
//! [`DrawService`] is the façade the host application calls into. It owns
//! the transport handle, the local identity and key pair, and builds every
//! outbound event (commits, reveals, acks, errors, status notifications).

use fairdraw_commit_reveal::{create_commit, create_reveal, RawCommit, SignedCommit, SignedReveal};
use fairdraw_crypto::export_public_key;
use fairdraw_draw::{AckType, Draw, DrawAck, DrawError, DrawEvent, DrawEventKind, DrawSnapshot, Stakeholder};
use fairdraw_network::{with_timeout, Communicator, Connection, ConnectionParams, DrawsListStream, PaginationResponse};
use fairdraw_types::{DrawStatus, KeyPair};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::validation::{self, ProtocolViolation};
use crate::{DrawEventEngine, DrawSession, ServiceConfig, ServiceError};

pub struct DrawService<C> {
    communicator: Arc<C>,
    identity: Stakeholder,
    keys: Arc<KeyPair>,
    config: ServiceConfig,
}

impl<C> Clone for DrawService<C> {
    fn clone(&self) -> Self {
        Self {
            communicator: Arc::clone(&self.communicator),
            identity: self.identity.clone(),
            keys: Arc::clone(&self.keys),
            config: self.config.clone(),
        }
    }
}

impl<C: Communicator> DrawService<C> {
    /// The identity's announced public key is always taken from `keys`.
    pub fn new(communicator: Arc<C>, identity: Stakeholder, keys: KeyPair, config: ServiceConfig) -> Self {
        let identity = identity.with_public_key(export_public_key(&keys.public));
        Self {
            communicator,
            identity,
            keys: Arc::new(keys),
            config,
        }
    }

    pub fn identity(&self) -> &Stakeholder {
        &self.identity
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn communicator(&self) -> &Arc<C> {
        &self.communicator
    }

    async fn request<T, F>(&self, operation: &'static str, request: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, fairdraw_network::CommunicatorError>>,
    {
        Ok(with_timeout(operation, self.config.request_timeout(), request).await?)
    }

    /// An outbound event for `draw_uuid`, sent from this peer.
    pub fn event(&self, draw_uuid: &str, kind: DrawEventKind) -> DrawEvent {
        DrawEvent::new(draw_uuid, Some(self.identity.reference()), kind)
    }

    // ── connection and draws ────────────────────────────────────────────

    pub async fn open(&self) -> Result<Connection, ServiceError> {
        let params = ConnectionParams::new(self.identity.clone());
        let connection = self
            .request("open_connection", self.communicator.open_connection(params))
            .await?;
        info!(user = %self.identity.id, session = %connection.session_id, "connected");
        Ok(connection)
    }

    pub async fn close(&self) -> Result<(), ServiceError> {
        self.request("close_connection", self.communicator.close_connection())
            .await
    }

    pub async fn create_draw(&self, spots: usize, data: Option<Value>) -> Result<Draw, ServiceError> {
        let draw = Draw::new(spots, self.identity.id.clone(), data);
        self.request("create_draw", self.communicator.create_draw(draw.snapshot()))
            .await?;
        info!(draw = %draw.uuid(), spots, "draw created");
        Ok(draw)
    }

    pub async fn get_draws(&self, page: usize) -> Result<PaginationResponse<DrawSnapshot>, ServiceError> {
        self.request(
            "get_draws_list",
            self.communicator.get_draws_list(page, self.config.page_size),
        )
        .await
    }

    pub async fn subscribe_to_draws_list(&self) -> Result<DrawsListStream, ServiceError> {
        self.request("subscribe_to_draws_list", self.communicator.subscribe_to_draws_list())
            .await
    }

    pub async fn get_draw(&self, uuid: &str) -> Result<Draw, ServiceError> {
        let snapshot = self.request("get_draw", self.communicator.get_draw(uuid)).await?;
        Ok(Draw::from_snapshot(snapshot))
    }

    pub async fn join_draw(&self, uuid: &str) -> Result<(), ServiceError> {
        self.request("join_draw", self.communicator.join_draw(uuid)).await?;
        info!(draw = %uuid, user = %self.identity.id, "joined draw");
        Ok(())
    }

    pub async fn leave_draw(&self, uuid: &str) -> Result<(), ServiceError> {
        self.request("leave_draw", self.communicator.leave_draw(uuid)).await?;
        info!(draw = %uuid, user = %self.identity.id, "left draw");
        Ok(())
    }

    /// Fetch the draw's public state and start following its events.
    pub async fn watch_draw(&self, uuid: &str) -> Result<DrawSession<C>, ServiceError> {
        let draw = self.get_draw(uuid).await?;
        let stream = self.request("listen", self.communicator.listen(uuid)).await?;
        debug!(draw = %uuid, "watching draw");
        Ok(DrawSession::new(DrawEventEngine::new(self.clone()), draw, stream))
    }

    // ── validation ──────────────────────────────────────────────────────

    pub fn check_commit(&self, draw: &Draw, signed: &SignedCommit) -> Result<(), ProtocolViolation> {
        validation::check_commit(draw, signed)
    }

    pub fn check_reveal(&self, draw: &Draw, signed: &SignedReveal) -> Result<(), ProtocolViolation> {
        validation::check_reveal(draw, signed)
    }

    pub fn validate_ack(&self, draw: &Draw, ack: &DrawAck) -> bool {
        validation::validate_ack(draw, ack)
    }

    // ── outbound evidence ───────────────────────────────────────────────

    /// Hash, sign and post this peer's commit.
    pub async fn send_signed_commit(&self, uuid: &str, raw: RawCommit) -> Result<SignedCommit, ServiceError> {
        let commit = create_commit(&raw, self.config.default_hash_function)?;
        let signed = SignedCommit::sign(commit, &self.keys.private)?;
        let event = self.event(uuid, DrawEventKind::CommitReceived(signed.clone()));
        self.request("post", self.communicator.post(event, uuid)).await?;
        info!(draw = %uuid, user = %self.identity.id, "commit sent");
        Ok(signed)
    }

    pub async fn send_signed_reveal(&self, uuid: &str, raw: RawCommit) -> Result<SignedReveal, ServiceError> {
        let signed = SignedReveal::sign(create_reveal(raw), &self.keys.private)?;
        let event = self.event(uuid, DrawEventKind::RevealReceived(signed.clone()));
        self.request("post", self.communicator.post(event, uuid)).await?;
        info!(draw = %uuid, user = %self.identity.id, "reveal sent");
        Ok(signed)
    }

    /// Post an ack built from the draw's own current collections.
    pub async fn send_ack(&self, draw: &Draw, ack_type: AckType) -> Result<(), ServiceError> {
        let ack = match ack_type {
            AckType::AllJoined => DrawAck::AllJoined {
                candidates: draw.candidates(),
            },
            AckType::AllCommited => DrawAck::AllCommited {
                commits: draw.commit_list(),
            },
            AckType::AllRevealed => DrawAck::AllRevealed {
                reveals: draw.reveal_list(),
            },
            AckType::Finished => DrawAck::Finished {
                winner: draw.winner().cloned().ok_or(DrawError::WinnerNotFound)?,
            },
        };
        debug!(draw = %draw.uuid(), ack = %ack_type, "sending ack");
        let event = self.event(draw.uuid(), DrawEventKind::Ack(ack));
        self.request("post", self.communicator.post(event, draw.uuid()))
            .await
    }

    pub async fn send_winner(&self, draw: &Draw) -> Result<(), ServiceError> {
        if draw.winner().is_none() {
            return Err(DrawError::WinnerNotFound.into());
        }
        self.send_ack(draw, AckType::Finished).await
    }

    /// Informational only; every peer derives the status itself.
    pub async fn update_status(&self, draw: &Draw, status: DrawStatus) -> Result<(), ServiceError> {
        let event = self.event(draw.uuid(), DrawEventKind::StatusChanged(status));
        self.request("post", self.communicator.post(event, draw.uuid()))
            .await
    }

    pub async fn send_error(&self, draw: &Draw, error: DrawEvent) -> Result<(), ServiceError> {
        warn!(
            draw = %draw.uuid(),
            error = %error.event_type(),
            offender = ?error.kind.offender(),
            "reporting protocol error"
        );
        self.request("post", self.communicator.post(error, draw.uuid()))
            .await
    }
}
