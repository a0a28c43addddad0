//! Common utilities and shared types for pulse-rs.
//!
//! This crate provides foundational components used across all pulse-rs crates:
//!
//! - **Configuration**: Tracker options via [`TrackerOptions`]
//! - **Error handling**: Unified error types via [`PulseError`] and [`PulseResult`]
//! - **ID Generation**: ULID/UUID identifiers via [`IdGenerator`]
//! - **Telemetry**: `tracing` subscriber setup via [`init_tracing`]
//!
//! # Example
//!
//! ```no_run
//! use pulse_common::{PulseResult, TrackerOptions};
//!
//! fn example() -> PulseResult<()> {
//!     let options = TrackerOptions::load()?;
//!     options.check_required()?;
//!     println!("Tracking page {}", options.page_id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod telemetry;

pub use config::{DEFAULT_PAGE_TYPE, DEFAULT_TRACKING_URL, TrackerOptions};
pub use error::{PulseError, PulseResult};
pub use id::IdGenerator;
pub use telemetry::{LogFormat, init_tracing};
