//! Draw orchestration.
//!
//! [`DrawService`] is the entry point a host application holds: it opens the
//! transport connection, creates and joins draws and signs this peer's
//! evidence. [`DrawSession`] follows one draw's event stream and feeds it
//! through the [`DrawEventEngine`], which validates what arrives and sends
//! the acks and error reports the protocol requires.

pub mod config;
pub mod engine;
pub mod error;
pub mod service;
pub mod session;
pub mod validation;

pub use config::ServiceConfig;
pub use engine::DrawEventEngine;
pub use error::ServiceError;
pub use service::DrawService;
pub use session::{DrawSession, DrawUpdate};
pub use validation::{check_commit, check_reveal, validate_ack, ProtocolViolation};
