//! ActivityStreams event payloads for pulse-rs.
//!
//! This crate builds the payloads a tracker delivers:
//!
//! - **Model**: [`Activity`] with its [`Actor`], [`Provider`] and sub-objects
//! - **Environment**: client-observed attributes via [`PageEnvironment`]
//! - **Factory**: one constructor per interaction type on [`EventFactory`]
//! - **Events**: [`TrackedEvent`] pairs a payload with its required sub-objects
//!
//! Payload keys follow ActivityStreams JSON-LD naming (`@type`, `@id`) with
//! tracker-specific terms under the `spt:` prefix.

pub mod environment;
pub mod event;
pub mod factory;
pub mod model;

pub use environment::{Dimensions, PageEnvironment, StaticPageEnvironment};
pub use event::TrackedEvent;
pub use factory::EventFactory;
pub use model::{
    ACTIVITY_STREAMS_CONTEXT, Activity, Actor, AsObject, IDENTITY_KEY, PROVIDER_ID_PREFIX,
    Provider, SPT_NAMESPACE, SubObjectKey, default_context,
};
