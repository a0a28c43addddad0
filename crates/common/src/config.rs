//! Tracker configuration.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use validator::Validate;

use crate::error::{PulseError, PulseResult};

/// Collection endpoint used when no `url` option is given.
pub const DEFAULT_TRACKING_URL: &str = "http://127.0.0.1:8002/api/v1/track";

/// Page entity type used when no `pageType` option is given.
pub const DEFAULT_PAGE_TYPE: &str = "Page";

/// Options recognised by the tracker.
///
/// Keys use the same camelCase names in files and JSON as in the browser
/// snippet (`clientId`, `pageId`, ...). Lowercased and snake_case spellings
/// are accepted too, since layered config sources may fold key case. The
/// transport override is not part of this struct; it is passed to the
/// tracker builder.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TrackerOptions {
    /// Client identifier, used to derive the provider organisation id.
    #[serde(default, alias = "clientid", alias = "client_id")]
    #[validate(length(min = 1, message = "clientId is required"))]
    pub client_id: String,

    /// Identifier of the tracked page.
    #[serde(default, alias = "pageid", alias = "page_id")]
    #[validate(length(min = 1, message = "pageId is required"))]
    pub page_id: String,

    /// Collection endpoint.
    #[serde(default = "default_url")]
    pub url: String,

    /// Entity type of the tracked page.
    #[serde(default = "default_page_type", alias = "pagetype", alias = "page_type")]
    pub page_type: String,

    /// Extension fields merged into every provider object.
    #[serde(default)]
    pub provider: Map<String, Value>,

    /// Pre-resolved user identity. Skips user context resolution.
    #[serde(default, alias = "userid", alias = "user_id")]
    pub user_id: Option<String>,
}

fn default_url() -> String {
    DEFAULT_TRACKING_URL.to_string()
}

fn default_page_type() -> String {
    DEFAULT_PAGE_TYPE.to_string()
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self::new(String::new(), String::new())
    }
}

impl TrackerOptions {
    /// Create options for a client and page, everything else defaulted.
    #[must_use]
    pub fn new(client_id: impl Into<String>, page_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            page_id: page_id.into(),
            url: default_url(),
            page_type: default_page_type(),
            provider: Map::new(),
            user_id: None,
        }
    }

    /// Override the collection endpoint.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Override the page entity type.
    #[must_use]
    pub fn with_page_type(mut self, page_type: impl Into<String>) -> Self {
        self.page_type = page_type.into();
        self
    }

    /// Add an extension field to the provider object.
    #[must_use]
    pub fn with_provider_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.provider.insert(key.into(), value.into());
        self
    }

    /// Use a known user identity instead of resolving one.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Check that the required identifiers are present.
    ///
    /// `clientId` is checked before `pageId`; the first missing one is
    /// reported.
    pub fn check_required(&self) -> PulseResult<()> {
        if let Err(errors) = self.validate() {
            let field_errors = errors.field_errors();
            for field in ["client_id", "page_id"] {
                if let Some(error) = field_errors.get(field).and_then(|errs| errs.first()) {
                    let message = error
                        .message
                        .as_ref()
                        .map_or_else(|| format!("{field} is required"), ToString::to_string);
                    return Err(PulseError::Configuration(message));
                }
            }
            return Err(PulseError::Configuration(errors.to_string()));
        }

        Ok(())
    }

    /// Load options from files and environment variables.
    ///
    /// Sources are layered in the following order:
    /// 1. `.env` (via dotenvy, if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `PULSE_ENV`)
    /// 4. Environment variables with `PULSE_` prefix
    pub fn load() -> PulseResult<Self> {
        dotenvy::dotenv().ok();
        let env = std::env::var("PULSE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PULSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Load options from a specific file, with environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PulseResult<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("PULSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
