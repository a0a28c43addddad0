//! Activity tracker for pulse-rs.
//!
//! Ties the pieces together: options are validated, events are built by the
//! [`EventFactory`](pulse_activity::EventFactory) and delivered through an
//! identity-gated [`DeliveryQueue`](pulse_queue::DeliveryQueue).
//!
//! ```no_run
//! use pulse_common::{PulseResult, TrackerOptions};
//! use pulse_core::Tracker;
//!
//! async fn example() -> PulseResult<()> {
//!     let tracker = Tracker::new(TrackerOptions::new("sp-34534", "urn:test.no:pagetest01"))?;
//!     let event = tracker.events().track_page_load(None, None);
//!     tracker.send_event(event).await
//! }
//! ```

pub mod tracker;

pub use tracker::{Tracker, TrackerBuilder};
