//! Publish/subscribe message transport for the vigil pipeline.
//!
//! Messages travel as newline-delimited JSON over TCP: self-describing,
//! field-named, one object per line. Delivery is at-most-once and
//! best-effort; there is no acknowledgement, retry, or backoff. Either side
//! of a link may own the listening address (bind) while the other connects.

pub mod bus;
pub mod config;
pub mod error;

pub use bus::{MAX_MESSAGE_LEN, MessageBus};
pub use config::{BusConfig, Role};
pub use error::ComError;
