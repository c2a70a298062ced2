//! Delivery of encoded payloads to the external endpoint
//!
//! - [`transport`] - the raw request/response exchange behind a trait, with
//!   a real HTTP implementation and a scripted mock for tests
//! - [`client`] - retry/backoff and request pacing around the transport
//! - [`reply`] - interpretation of the raw reply markup

pub mod client;
pub mod reply;
pub mod transport;

pub use client::{DeliveryClient, DeliveryRecord, RecordingSleeper, Sleeper, TokioSleeper};
pub use reply::{interpret, ReplyOutcome};
pub use transport::{HttpTransport, MockTransport, Transport, TransportError};
