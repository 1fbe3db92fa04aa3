//! Shared in-memory draw server.

use fairdraw_draw::{DrawEvent, DrawSnapshot, Stakeholder};
use fairdraw_network::CommunicatorError;
use fairdraw_types::UserId;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::NullCommunicator;

#[derive(Default)]
struct DrawRoom {
    snapshot: Option<DrawSnapshot>,
    log: Vec<DrawEvent>,
    listeners: Vec<UnboundedSender<DrawEvent>>,
}

impl DrawRoom {
    fn publish(&mut self, event: DrawEvent) {
        self.listeners
            .retain(|tx| tx.unbounded_send(event.clone()).is_ok());
        self.log.push(event);
    }
}

#[derive(Default)]
struct HubState {
    order: Vec<String>,
    rooms: HashMap<String, DrawRoom>,
    list_subscribers: Vec<UnboundedSender<Vec<DrawSnapshot>>>,
    next_session: u64,
}

impl HubState {
    fn snapshots(&self) -> Vec<DrawSnapshot> {
        self.order
            .iter()
            .filter_map(|uuid| self.rooms.get(uuid).and_then(|r| r.snapshot.clone()))
            .collect()
    }

    fn notify_list(&mut self) {
        let list = self.snapshots();
        self.list_subscribers
            .retain(|tx| tx.unbounded_send(list.clone()).is_ok());
    }
}

/// Shared in-memory draw server. Cloning yields another handle to the same hub.
#[derive(Clone, Default)]
pub struct NullHub {
    state: Arc<Mutex<HubState>>,
}

impl NullHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh, unconnected communicator attached to this hub.
    pub fn communicator(&self) -> NullCommunicator {
        NullCommunicator::new(self.clone())
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn next_session_id(&self) -> String {
        let mut state = self.state();
        state.next_session += 1;
        format!("null-session-{}", state.next_session)
    }

    pub(crate) fn insert_draw(&self, snapshot: DrawSnapshot) {
        let mut state = self.state();
        let uuid = snapshot.uuid.clone();
        if !state.rooms.contains_key(&uuid) {
            state.order.push(uuid.clone());
        }
        state.rooms.entry(uuid).or_default().snapshot = Some(snapshot);
        state.notify_list();
    }

    pub fn draw(&self, uuid: &str) -> Option<DrawSnapshot> {
        self.state().rooms.get(uuid).and_then(|r| r.snapshot.clone())
    }

    pub fn draws(&self) -> Vec<DrawSnapshot> {
        self.state().snapshots()
    }

    pub(crate) fn subscribe_list(&self) -> UnboundedReceiver<Vec<DrawSnapshot>> {
        let (tx, rx) = unbounded();
        let mut state = self.state();
        let _ = tx.unbounded_send(state.snapshots());
        state.list_subscribers.push(tx);
        rx
    }

    /// Mark `user` as a candidate of the stored draw.
    pub(crate) fn add_candidate(&self, uuid: &str, user: &Stakeholder) -> Result<Stakeholder, CommunicatorError> {
        let mut state = self.state();
        let snapshot = state
            .rooms
            .get_mut(uuid)
            .and_then(|r| r.snapshot.as_mut())
            .ok_or_else(|| CommunicatorError::DrawNotFound(uuid.to_string()))?;

        let mut candidate = user.clone();
        candidate.eligible = true;
        match snapshot.stakeholders.iter_mut().find(|s| s.id == candidate.id) {
            Some(existing) => *existing = candidate.clone(),
            None => snapshot.stakeholders.push(candidate.clone()),
        }
        state.notify_list();
        Ok(candidate)
    }

    pub(crate) fn remove_stakeholder(&self, uuid: &str, id: &UserId) -> Result<Stakeholder, CommunicatorError> {
        let mut state = self.state();
        let snapshot = state
            .rooms
            .get_mut(uuid)
            .and_then(|r| r.snapshot.as_mut())
            .ok_or_else(|| CommunicatorError::DrawNotFound(uuid.to_string()))?;
        let position = snapshot
            .stakeholders
            .iter()
            .position(|s| &s.id == id)
            .ok_or_else(|| CommunicatorError::Rejected(format!("{id} is not part of draw {uuid}")))?;
        let removed = snapshot.stakeholders.remove(position);
        state.notify_list();
        Ok(removed)
    }

    /// Append to the draw's log and deliver to its listeners.
    pub(crate) fn publish(&self, uuid: &str, event: DrawEvent) -> Result<(), CommunicatorError> {
        let mut state = self.state();
        let room = state
            .rooms
            .get_mut(uuid)
            .ok_or_else(|| CommunicatorError::DrawNotFound(uuid.to_string()))?;
        debug!(draw = %uuid, event_type = %event.event_type(), event_id = %event.event_id, "hub publish");
        room.publish(event);
        Ok(())
    }

    /// Deliver to every draw's listeners.
    pub(crate) fn publish_all(&self, event: DrawEvent) {
        let mut state = self.state();
        for room in state.rooms.values_mut() {
            room.publish(event.clone());
        }
    }

    /// A listener that first replays the draw's log, then receives live events.
    pub(crate) fn listen(&self, uuid: &str) -> Result<UnboundedReceiver<DrawEvent>, CommunicatorError> {
        let (tx, rx) = unbounded();
        let mut state = self.state();
        let room = state
            .rooms
            .get_mut(uuid)
            .ok_or_else(|| CommunicatorError::DrawNotFound(uuid.to_string()))?;
        for event in &room.log {
            let _ = tx.unbounded_send(event.clone());
        }
        room.listeners.push(tx);
        Ok(rx)
    }

    /// Everything published to a draw so far, oldest first.
    pub fn log(&self, uuid: &str) -> Vec<DrawEvent> {
        self.state()
            .rooms
            .get(uuid)
            .map(|r| r.log.clone())
            .unwrap_or_default()
    }
}
