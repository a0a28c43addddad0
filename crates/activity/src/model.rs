//! ActivityStreams payload model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// ActivityStreams 2.0 context IRI.
pub const ACTIVITY_STREAMS_CONTEXT: &str = "http://www.w3.org/ns/activitystreams";

/// Namespace for the `spt:` extension terms.
pub const SPT_NAMESPACE: &str = "http://spt.no";

/// Key under which the resolved user identity is written into the actor.
pub const IDENTITY_KEY: &str = "@id";

/// Prefix of the provider organisation id; the client id is appended.
pub const PROVIDER_ID_PREFIX: &str = "urn:spid.no:";

/// The `@context` value shared by every payload.
#[must_use]
pub fn default_context() -> Value {
    json!([ACTIVITY_STREAMS_CONTEXT, { "spt": SPT_NAMESPACE }])
}

/// One tracked activity, as delivered to the collection endpoint.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Activity {
    /// JSON-LD context (`@context`).
    #[serde(rename = "@context")]
    pub context: Value,

    /// Activity type (`@type`), e.g. `Read` or `Leave`.
    #[serde(rename = "@type")]
    pub kind: String,

    /// Creation time.
    pub published: DateTime<Utc>,
    /// Who performed the activity.
    pub actor: Actor,
    /// Organisation owning the page.
    pub provider: Provider,

    /// What the activity acts on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<AsObject>,

    /// Where the object ends up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<AsObject>,

    /// Where the activity started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<AsObject>,

    /// What the activity produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AsObject>,
}

impl Activity {
    /// Write the resolved user identity into the actor.
    pub fn inject_identity(&mut self, identity: &str) {
        self.actor.id = Some(identity.to_string());
    }

    /// The user identity currently carried by the actor, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.actor.id.as_deref()
    }

    /// Look up a sub-object by its payload key.
    #[must_use]
    pub const fn sub_object(&self, key: SubObjectKey) -> Option<&AsObject> {
        match key {
            SubObjectKey::Object => self.object.as_ref(),
            SubObjectKey::Target => self.target.as_ref(),
            SubObjectKey::Origin => self.origin.as_ref(),
            SubObjectKey::Result => self.result.as_ref(),
        }
    }
}

/// Keys of the type-specific sub-objects layered onto the scaffold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubObjectKey {
    /// `object`: what the activity acts on.
    Object,
    /// `target`: where the object ends up.
    Target,
    /// `origin`: where the activity started.
    Origin,
    /// `result`: what the activity produced.
    Result,
}

impl SubObjectKey {
    /// The key as it appears in the serialized payload.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Target => "target",
            Self::Origin => "origin",
            Self::Result => "result",
        }
    }
}

impl std::fmt::Display for SubObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The person performing the activity.
///
/// Environment attributes are observed on the client; `@id` is left empty
/// until the delivery queue injects the resolved identity.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Actor {
    /// Always `Person`.
    #[serde(rename = "@type")]
    pub kind: String,

    /// Resolved user identity.
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Client user agent.
    #[serde(rename = "spt:userAgent")]
    pub user_agent: String,

    /// Screen size as `WxH`.
    #[serde(rename = "spt:screenSize")]
    pub screen_size: String,

    /// Viewport size as `WxH`.
    #[serde(rename = "spt:viewportSize")]
    pub viewport_size: String,

    /// Preferred language.
    #[serde(rename = "spt:acceptLanguage")]
    pub accept_language: String,
}

/// The organisation the tracked page belongs to.
///
/// Stored as an open JSON object so caller-supplied extension fields can
/// override the defaults key by key.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Provider(Map<String, Value>);

impl Provider {
    /// Build the provider object for a client.
    #[must_use]
    pub fn new(client_id: &str, page_url: &str, extensions: &Map<String, Value>) -> Self {
        let mut fields = Map::new();
        fields.insert("@type".into(), Value::from("Organization"));
        fields.insert("@id".into(), Value::from(format!("{PROVIDER_ID_PREFIX}{client_id}")));
        fields.insert("url".into(), Value::from(page_url));

        for (key, value) in extensions {
            fields.insert(key.clone(), value.clone());
        }

        Self(fields)
    }

    /// Get a provider field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The organisation id (`@id`).
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.get("@id").and_then(Value::as_str)
    }
}

/// A generic ActivityStreams object (page, link, form result, place, ...).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsObject {
    /// Object type (`@type`).
    #[serde(rename = "@type")]
    pub kind: String,

    /// Object id (`@id`).
    #[serde(rename = "@id")]
    pub id: String,

    /// Link to the object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Human readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Scroll depth, for scroll results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<u32>,
}

impl AsObject {
    /// Create an object with only a type and an id.
    #[must_use]
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            url: None,
            display_name: None,
            location: None,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set the url.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the location.
    #[must_use]
    pub const fn with_location(mut self, location: u32) -> Self {
        self.location = Some(location);
        self
    }

    /// Whether both `@type` and `@id` carry a value.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        !self.kind.trim().is_empty() && !self.id.trim().is_empty()
    }
}
