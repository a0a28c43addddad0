//! Payload delivery for pulse-rs.
//!
//! This crate owns everything between a built event and the collection
//! endpoint:
//!
//! - **Delivery queue**: identity-gated queue with failure re-enqueueing
//! - **Transport**: batch delivery seam, with an HTTP implementation
//! - **User context**: one-shot user identity resolution
//!
//! There is no persistence, backoff or scheduling: failed payloads wait in
//! memory for the next `send` or `flush`.

pub mod delivery;
pub mod error;
pub mod transport;
pub mod user_context;

pub use delivery::{DeliveryQueue, Identity};
pub use error::{IdentityError, TransportError};
pub use transport::{HttpTransport, Transport};
pub use user_context::{FixedUserContext, GeneratedUserContext, UserContext};
