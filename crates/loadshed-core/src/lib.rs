//! View-state synchronization engine for the loadshed drill-down.
//!
//! - **[`Navigator`]** owns the view state and the panel state machine
//!   (provinces → towns → schedule). Loads run as spawned tasks and come
//!   back as [`Completion`]s; applying one runs the staleness guard so a
//!   result for a selection the user has left never reaches the store or
//!   the display.
//!
//! - **[`ViewStore`]** holds the cached lists and the current selection as
//!   wholesale-replaced snapshots.
//!
//! - **[`ScheduleSource`]** is the data gateway seam, implemented for
//!   [`loadshed_api::ApiClient`].
//!
//! - **[`RenderTarget`]** is the display seam. The renderer projects the
//!   store into [`Node`]s and replaces a panel's children in one call.
//!
//! - **[`StageSubscription`]** / [`StageFeed`] turn the server push
//!   channel into a stream of [`StageReading`]s.

pub mod error;
pub mod export;
pub mod format;
pub mod gateway;
pub mod navigator;
pub mod push;
pub mod render;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::CoreError;
pub use export::ExportFile;
pub use gateway::ScheduleSource;
pub use navigator::{Completion, LoadOrigin, NavEvent, Navigator, transition};
pub use push::{StageFeed, StageSubscription};
pub use render::{Intent, Node, Panel, PlaceholderKind, Readout, RenderTarget};
pub use store::ViewStore;

// Wire types the engine passes through unchanged.
pub use loadshed_api::{Day, PackedTime, Schedule, Slot, StageReading, Town};
