//! A peer's live view of one draw.

use fairdraw_commit_reveal::{RawCommit, SignedCommit, SignedReveal};
use fairdraw_draw::{CandidateSummary, Draw, DrawEvent};
use fairdraw_network::{Communicator, DrawEventStream};
use fairdraw_types::DrawStatus;
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, trace};

use crate::{DrawEventEngine, ServiceError};

/// One processed event and the status change it caused.
#[derive(Clone, Debug)]
pub struct DrawUpdate {
    pub event: DrawEvent,
    pub status_change: Option<DrawStatus>,
}

/// Couples a local [`Draw`] with the event stream of its draw.
///
/// Events for other draws and events already seen are skipped, so a
/// transport that redelivers or broadcasts is harmless. An event is only
/// recorded as seen once it has been handled without error, so a
/// redelivery after a transport failure is handled again.
pub struct DrawSession<C> {
    engine: DrawEventEngine<C>,
    draw: Draw,
    stream: DrawEventStream,
}

impl<C: Communicator> DrawSession<C> {
    pub fn new(engine: DrawEventEngine<C>, draw: Draw, stream: DrawEventStream) -> Self {
        Self { engine, draw, stream }
    }

    pub fn draw(&self) -> &Draw {
        &self.draw
    }

    pub fn status(&self) -> DrawStatus {
        self.draw.status()
    }

    pub fn summaries(&self) -> Vec<CandidateSummary> {
        self.draw.candidate_summaries()
    }

    /// Wait for the next relevant event and apply it.
    ///
    /// Returns `Ok(None)` once the stream has ended.
    pub async fn next_update(&mut self) -> Result<Option<DrawUpdate>, ServiceError> {
        while let Some(event) = self.stream.next().await {
            if event.draw_uuid != self.draw.uuid() {
                trace!(draw = %self.draw.uuid(), other = %event.draw_uuid, "event for another draw");
                continue;
            }
            if !self.draw.is_new_event(&event) {
                debug!(draw = %self.draw.uuid(), event_id = %event.event_id, "duplicate event skipped");
                continue;
            }
            let status_change = self.engine.handle_event(&mut self.draw, event.clone()).await?;
            self.draw.record_event(event.clone());
            return Ok(Some(DrawUpdate { event, status_change }));
        }
        Ok(None)
    }

    /// Post any ack still owed after an earlier transport failure.
    pub async fn flush(&mut self) -> Result<(), ServiceError> {
        self.engine.flush(&mut self.draw).await
    }

    /// Process events until the draw reaches `target`, any later phase, or a
    /// terminal status. Returns the status reached.
    pub async fn run_until(&mut self, target: DrawStatus) -> Result<DrawStatus, ServiceError> {
        loop {
            let status = self.draw.status();
            if status.is_terminal() || phase_rank(status) >= phase_rank(target) {
                return Ok(status);
            }
            if self.next_update().await?.is_none() {
                return Ok(self.draw.status());
            }
        }
    }

    pub async fn run_until_terminal(&mut self) -> Result<DrawStatus, ServiceError> {
        self.run_until(DrawStatus::Finished).await
    }

    /// Sign and post this peer's commit of `data`.
    pub async fn commit(&self, data: &str, nonce: &str, metadata: Option<Value>) -> Result<SignedCommit, ServiceError> {
        let service = self.engine.service();
        service
            .send_signed_commit(self.draw.uuid(), self.raw(data, nonce, metadata))
            .await
    }

    /// Sign and post the reveal matching an earlier [`commit`](Self::commit).
    pub async fn reveal(&self, data: &str, nonce: &str, metadata: Option<Value>) -> Result<SignedReveal, ServiceError> {
        let service = self.engine.service();
        service
            .send_signed_reveal(self.draw.uuid(), self.raw(data, nonce, metadata))
            .await
    }

    fn raw(&self, data: &str, nonce: &str, metadata: Option<Value>) -> RawCommit {
        let raw = RawCommit::new(data, nonce, self.engine.service().identity().id.clone());
        match metadata {
            Some(metadata) => raw.with_metadata(metadata),
            None => raw,
        }
    }
}

fn phase_rank(status: DrawStatus) -> u8 {
    match status {
        DrawStatus::Pending => 0,
        DrawStatus::Commit => 1,
        DrawStatus::Reveal => 2,
        DrawStatus::Finished | DrawStatus::Invalidated => 3,
    }
}
