//! A netcat-style TCP client whose connection enforces idle timeouts.
//!
//! The interesting part is [`TimeoutConnection`]: it bounds every read and
//! write by an idle timeout, unless the caller set an explicit deadline.

pub mod engine;
pub mod errors;
pub mod input;
pub mod networking;
pub mod output;
pub mod relay;

pub use networking::{
    connection::{Connection, Endpoint},
    deadline::DeadlineStream,
    timeout_conn::TimeoutConnection,
};
