//! Per-peer handle onto a [`NullHub`].

use async_trait::async_trait;
use fairdraw_draw::{DrawEvent, DrawEventKind, DrawSnapshot, Stakeholder};
use fairdraw_network::{
    Communicator, CommunicatorError, Connection, ConnectionParams, DrawEventStream, DrawsListStream,
    PaginationResponse,
};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::NullHub;

/// A communicator that talks to an in-memory hub.
///
/// Every event it posts is recorded and can be inspected with [`sent`](Self::sent).
/// While [`stall`](Self::stall)ed, every request hangs forever.
pub struct NullCommunicator {
    hub: NullHub,
    connection: Mutex<Option<Connection>>,
    sent: Mutex<Vec<DrawEvent>>,
    stalled: AtomicBool,
}

impl NullCommunicator {
    pub fn new(hub: NullHub) -> Self {
        Self {
            hub,
            connection: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            stalled: AtomicBool::new(false),
        }
    }

    pub fn hub(&self) -> &NullHub {
        &self.hub
    }

    /// Make every subsequent request hang (or resume when `false`).
    pub fn stall(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    /// Events this communicator posted or broadcast, oldest first.
    pub fn sent(&self) -> Vec<DrawEvent> {
        lock(&self.sent).clone()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.connection).is_some()
    }

    async fn gate(&self) {
        if self.stalled.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
    }

    fn user(&self) -> Result<Stakeholder, CommunicatorError> {
        lock(&self.connection)
            .as_ref()
            .map(|c| c.user.clone())
            .ok_or(CommunicatorError::NotConnected)
    }

    fn record(&self, event: &DrawEvent) {
        lock(&self.sent).push(event.clone());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Communicator for NullCommunicator {
    async fn open_connection(&self, params: ConnectionParams) -> Result<Connection, CommunicatorError> {
        self.gate().await;
        let connection = Connection {
            user: params.user,
            session_id: self.hub.next_session_id(),
        };
        debug!(user = %connection.user.id, session = %connection.session_id, "null connection opened");
        *lock(&self.connection) = Some(connection.clone());
        Ok(connection)
    }

    async fn close_connection(&self) -> Result<(), CommunicatorError> {
        self.gate().await;
        lock(&self.connection)
            .take()
            .map(|_| ())
            .ok_or(CommunicatorError::NotConnected)
    }

    async fn get_draws_list(
        &self,
        page: usize,
        per_page: usize,
    ) -> Result<PaginationResponse<DrawSnapshot>, CommunicatorError> {
        self.gate().await;
        Ok(PaginationResponse::paginate(&self.hub.draws(), page, per_page))
    }

    async fn subscribe_to_draws_list(&self) -> Result<DrawsListStream, CommunicatorError> {
        self.gate().await;
        Ok(self.hub.subscribe_list().boxed())
    }

    async fn create_draw(&self, draw: DrawSnapshot) -> Result<DrawEvent, CommunicatorError> {
        self.gate().await;
        let user = self.user()?;
        let uuid = draw.uuid.clone();
        self.hub.insert_draw(draw.clone());
        let event = DrawEvent::new(uuid.clone(), Some(user.reference()), DrawEventKind::DrawCreated(draw));
        self.hub.publish(&uuid, event.clone())?;
        Ok(event)
    }

    async fn get_draw(&self, uuid: &str) -> Result<DrawSnapshot, CommunicatorError> {
        self.gate().await;
        self.hub
            .draw(uuid)
            .ok_or_else(|| CommunicatorError::DrawNotFound(uuid.to_string()))
    }

    async fn join_draw(&self, uuid: &str) -> Result<(), CommunicatorError> {
        self.gate().await;
        let user = self.user()?;
        let candidate = self.hub.add_candidate(uuid, &user)?;
        let event = DrawEvent::new(uuid, Some(user.reference()), DrawEventKind::CandidateSubscribed(candidate));
        self.hub.publish(uuid, event)
    }

    async fn leave_draw(&self, uuid: &str) -> Result<(), CommunicatorError> {
        self.gate().await;
        let user = self.user()?;
        let removed = self.hub.remove_stakeholder(uuid, &user.id)?;
        let kind = if removed.eligible {
            DrawEventKind::CandidateUnsubscribed(removed)
        } else {
            DrawEventKind::StakeholderUnsubscribed(removed)
        };
        self.hub.publish(uuid, DrawEvent::new(uuid, Some(user.reference()), kind))
    }

    async fn broadcast(&self, event: DrawEvent) -> Result<(), CommunicatorError> {
        self.gate().await;
        self.record(&event);
        self.hub.publish_all(event);
        Ok(())
    }

    async fn post(&self, event: DrawEvent, uuid: &str) -> Result<(), CommunicatorError> {
        self.gate().await;
        self.record(&event);
        self.hub.publish(uuid, event)
    }

    async fn listen(&self, uuid: &str) -> Result<DrawEventStream, CommunicatorError> {
        self.gate().await;
        Ok(self.hub.listen(uuid)?.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairdraw_draw::DrawEventType;
    use fairdraw_types::{DrawStatus, UserId};
    use std::time::Duration;

    fn snapshot(uuid: &str) -> DrawSnapshot {
        DrawSnapshot {
            uuid: uuid.to_string(),
            spots: 2,
            data: None,
            creator_id: Some(UserId::from("alice")),
            status: DrawStatus::Pending,
            stakeholders: vec![],
        }
    }

    async fn connected(hub: &NullHub, id: &str) -> NullCommunicator {
        let comm = hub.communicator();
        comm.open_connection(ConnectionParams::new(Stakeholder::new(id)))
            .await
            .unwrap();
        comm
    }

    #[tokio::test]
    async fn join_is_announced_and_replayed_to_late_listeners() {
        let hub = NullHub::new();
        let alice = connected(&hub, "alice").await;
        let bob = connected(&hub, "bob").await;
        alice.create_draw(snapshot("d1")).await.unwrap();
        bob.join_draw("d1").await.unwrap();

        let mut stream = alice.listen("d1").await.unwrap();
        let created = stream.next().await.unwrap();
        assert_eq!(created.event_type(), DrawEventType::DrawCreated);
        let joined = stream.next().await.unwrap();
        match joined.kind {
            DrawEventKind::CandidateSubscribed(s) => {
                assert_eq!(s.id.as_str(), "bob");
                assert!(s.eligible);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(hub.draw("d1").unwrap().stakeholders.len(), 1);
    }

    #[tokio::test]
    async fn posts_are_echoed_to_sender_and_recorded() {
        let hub = NullHub::new();
        let alice = connected(&hub, "alice").await;
        alice.create_draw(snapshot("d1")).await.unwrap();
        let mut stream = alice.listen("d1").await.unwrap();
        let _created = stream.next().await.unwrap();

        let event = DrawEvent::new("d1", None, DrawEventKind::StatusChanged(DrawStatus::Commit));
        alice.post(event.clone(), "d1").await.unwrap();
        assert_eq!(stream.next().await.unwrap(), event);
        assert_eq!(alice.sent(), vec![event]);
    }

    #[tokio::test]
    async fn unknown_draw_and_missing_connection_are_errors() {
        let hub = NullHub::new();
        let comm = hub.communicator();
        assert_eq!(comm.join_draw("d1").await, Err(CommunicatorError::NotConnected));
        let comm = connected(&hub, "carol").await;
        assert_eq!(
            comm.get_draw("nope").await,
            Err(CommunicatorError::DrawNotFound("nope".into()))
        );
    }

    #[tokio::test]
    async fn stalled_requests_never_complete() {
        let hub = NullHub::new();
        let comm = hub.communicator();
        comm.stall(true);
        let outcome = tokio::time::timeout(Duration::from_millis(30), comm.get_draws_list(1, 10)).await;
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn list_subscription_sees_new_draws() {
        let hub = NullHub::new();
        let alice = connected(&hub, "alice").await;
        let mut list = alice.subscribe_to_draws_list().await.unwrap();
        assert!(list.next().await.unwrap().is_empty());
        alice.create_draw(snapshot("d1")).await.unwrap();
        assert_eq!(list.next().await.unwrap().len(), 1);
    }
}
