//! The draw aggregate.
//!
//! A [`Draw`] collects stakeholders, commits, reveals, acknowledgements and
//! errors for one fair draw and derives its [`DrawStatus`](fairdraw_types::DrawStatus)
//! from that evidence. Every peer holds its own aggregate and re-derives the
//! status locally; status claims received from the wire are never trusted.
//!
//! Inbound messages are modelled as [`DrawEvent`]s, a closed sum type keyed
//! by the wire `type` field.

pub mod ack;
pub mod draw;
pub mod error;
pub mod event;
pub mod history;
pub mod stakeholder;
pub mod summary;

pub use ack::{AckCheck, AckTable, AckType, DrawAck};
pub use draw::{Draw, DrawSnapshot, RegisteredCommit, RegisteredReveal};
pub use error::DrawError;
pub use event::{AckMismatchReport, DrawEvent, DrawEventKind, DrawEventType};
pub use history::{EventHistory, HistoryEntry};
pub use stakeholder::{Candidate, Stakeholder};
pub use summary::{CandidateProgress, CandidateSummary};
