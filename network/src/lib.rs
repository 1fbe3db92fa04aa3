//! Transport boundary for the fairdraw protocol.
//!
//! The protocol core never talks to sockets, push services or auth providers
//! directly. It consumes a [`Communicator`], which a host application
//! implements over whatever delivery channel it has.

pub mod communicator;
pub mod error;
pub mod timeout;

pub use communicator::{Communicator, Connection, ConnectionParams, DrawEventStream, DrawsListStream, PaginationResponse};
pub use error::CommunicatorError;
pub use timeout::with_timeout;
