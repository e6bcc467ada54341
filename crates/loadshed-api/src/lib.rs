// loadshed-api: Async Rust client for the loadshedding web API

pub mod client;
pub mod error;
pub mod models;
pub mod places;
pub mod schedule;
pub mod sse;
pub mod stage;
pub mod transport;

pub use client::ApiClient;
pub use error::{Error, Operation};
pub use models::{Day, PackedTime, Schedule, Slot, StageReading, Town};
pub use sse::{DEFAULT_RETRY, EventStreamHandle, MIN_RETRY, ReconnectPolicy, ServerEvent};
pub use transport::TransportConfig;
