//! Event construction.
//!
//! Every constructor starts from the same scaffold (context, timestamp,
//! actor, provider) and layers the type-specific sub-objects on top.

use std::sync::Arc;

use chrono::Utc;
use pulse_common::TrackerOptions;
use serde_json::{Map, Value};

use crate::environment::PageEnvironment;
use crate::event::TrackedEvent;
use crate::model::{Activity, Actor, AsObject, Provider, SubObjectKey, default_context};

const OBJECT: &[SubObjectKey] = &[SubObjectKey::Object];
const OBJECT_RESULT: &[SubObjectKey] = &[SubObjectKey::Object, SubObjectKey::Result];
const OBJECT_TARGET: &[SubObjectKey] = &[SubObjectKey::Object, SubObjectKey::Target];
const OBJECT_ORIGIN: &[SubObjectKey] = &[SubObjectKey::Object, SubObjectKey::Origin];
const OBJECT_ORIGIN_TARGET: &[SubObjectKey] = &[
    SubObjectKey::Object,
    SubObjectKey::Origin,
    SubObjectKey::Target,
];

/// Builds activity payloads for one page.
#[derive(Clone)]
pub struct EventFactory {
    client_id: String,
    page_id: String,
    page_type: String,
    provider_extensions: Map<String, Value>,
    environment: Arc<dyn PageEnvironment>,
}

impl std::fmt::Debug for EventFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFactory")
            .field("client_id", &self.client_id)
            .field("page_id", &self.page_id)
            .field("page_type", &self.page_type)
            .finish_non_exhaustive()
    }
}

impl EventFactory {
    /// Create a factory for the page described by `options`.
    #[must_use]
    pub fn new(options: &TrackerOptions, environment: Arc<dyn PageEnvironment>) -> Self {
        Self {
            client_id: options.client_id.clone(),
            page_id: options.page_id.clone(),
            page_type: options.page_type.clone(),
            provider_extensions: options.provider.clone(),
            environment,
        }
    }

    /// Page identifier from the options.
    #[must_use]
    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    /// Page object type, `Page` unless configured.
    #[must_use]
    pub fn page_type(&self) -> &str {
        &self.page_type
    }

    /// Collect actor data from the environment.
    #[must_use]
    pub fn create_actor(&self) -> Actor {
        Actor {
            kind: "Person".to_string(),
            id: None,
            user_agent: self.environment.user_agent(),
            screen_size: self.environment.screen_size().to_string(),
            viewport_size: self.environment.viewport_size().to_string(),
            accept_language: self.environment.accept_language(),
        }
    }

    /// Build the provider organisation, extension fields applied last.
    #[must_use]
    pub fn create_provider(&self) -> Provider {
        Provider::new(
            &self.client_id,
            &self.environment.page_url(),
            &self.provider_extensions,
        )
    }

    /// Envelope shared by all events. `@type` is filled in by the caller.
    #[must_use]
    pub fn create_scaffold(&self) -> Activity {
        Activity {
            context: default_context(),
            kind: String::new(),
            published: Utc::now(),
            actor: self.create_actor(),
            provider: self.create_provider(),
            object: None,
            target: None,
            origin: None,
            result: None,
        }
    }

    /// The tracked page as an object.
    #[must_use]
    pub fn page_standards(&self) -> AsObject {
        AsObject::new(self.page_type.clone(), self.page_id.clone())
            .with_url(self.environment.page_url())
            .with_display_name(self.environment.page_title())
    }

    fn scaffold_of_type(&self, activity_type: Option<&str>, default_type: &str) -> Activity {
        let mut activity = self.create_scaffold();
        activity.kind = activity_type.unwrap_or(default_type).to_string();
        activity
    }

    fn element_id(&self, element_id: &str) -> String {
        format!("{}:element:{element_id}", self.page_id)
    }

    /// A page was loaded. A missing or empty `title` falls back to the page
    /// title.
    #[must_use]
    pub fn track_page_load(&self, title: Option<&str>, activity_type: Option<&str>) -> TrackedEvent {
        let mut activity = self.scaffold_of_type(activity_type, "Read");
        let mut object = self.page_standards();
        if let Some(title) = title.filter(|t| !t.is_empty()) {
            object.display_name = Some(title.to_string());
        }
        activity.object = Some(object);

        TrackedEvent::new(activity, OBJECT)
    }

    /// A form on the page was submitted.
    #[must_use]
    pub fn track_form(
        &self,
        form_id: &str,
        content_type: &str,
        activity_type: Option<&str>,
    ) -> TrackedEvent {
        let mut activity = self.scaffold_of_type(activity_type, "Post");
        activity.object = Some(self.page_standards());
        activity.result = Some(AsObject::new(
            content_type,
            format!("{}:form:{form_id}", self.page_id),
        ));

        TrackedEvent::new(activity, OBJECT_RESULT)
    }

    /// A comment form was submitted.
    #[must_use]
    pub fn track_comment(&self, form_id: &str, activity_type: Option<&str>) -> TrackedEvent {
        self.track_form(form_id, "Note", activity_type)
    }

    /// A poll was answered.
    #[must_use]
    pub fn track_poll(&self, form_id: &str, activity_type: Option<&str>) -> TrackedEvent {
        self.track_form(form_id, "Question", activity_type)
    }

    /// An element linking to `target_id` was clicked.
    #[must_use]
    pub fn track_click(
        &self,
        element_id: &str,
        display_name: &str,
        target_type: &str,
        target_id: &str,
        activity_type: Option<&str>,
    ) -> TrackedEvent {
        let mut activity = self.scaffold_of_type(activity_type, "Accept");
        activity.object =
            Some(AsObject::new("Link", self.element_id(element_id)).with_display_name(display_name));
        activity.target = Some(AsObject::new(target_type, target_id));

        TrackedEvent::new(activity, OBJECT_TARGET)
    }

    /// The page was shared or liked on a social network.
    #[must_use]
    pub fn track_social(
        &self,
        element_id: &str,
        network_name: &str,
        activity_type: Option<&str>,
    ) -> TrackedEvent {
        let mut activity = self.scaffold_of_type(activity_type, "Like");
        activity.object = Some(self.page_standards());
        activity.origin = Some(AsObject::new("Link", self.element_id(element_id)));
        activity.target = Some(AsObject::new("Service", format!("urn:{network_name}")));

        TrackedEvent::new(activity, OBJECT_ORIGIN_TARGET)
    }

    /// Playback state of an embedded media element changed.
    #[must_use]
    pub fn track_media_state(
        &self,
        media_id: &str,
        media_type: &str,
        activity_type: Option<&str>,
    ) -> TrackedEvent {
        let mut activity = self.scaffold_of_type(activity_type, "Watch");
        activity.object = Some(AsObject::new(media_type, media_id));
        activity.origin = Some(self.page_standards());

        TrackedEvent::new(activity, OBJECT_ORIGIN)
    }

    /// The reader scrolled to `scroll_depth`.
    #[must_use]
    pub fn track_scroll(&self, scroll_depth: u32, activity_type: Option<&str>) -> TrackedEvent {
        let mut activity = self.scaffold_of_type(activity_type, "Arrive");
        activity.object = Some(self.page_standards());
        activity.result = Some(
            AsObject::new("Place", format!("{}:scroll:{scroll_depth}", self.page_id))
                .with_location(scroll_depth),
        );

        TrackedEvent::new(activity, OBJECT_RESULT)
    }

    /// The reader left the page towards `target_id`.
    #[must_use]
    pub fn track_exit(
        &self,
        target_id: &str,
        target_type: &str,
        activity_type: Option<&str>,
    ) -> TrackedEvent {
        let mut activity = self.scaffold_of_type(activity_type, "Leave");
        activity.object = Some(self.page_standards());
        activity.target = Some(AsObject::new(target_type, target_id));

        TrackedEvent::new(activity, OBJECT_TARGET)
    }
}
