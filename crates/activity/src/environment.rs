//! Client-observed page and device attributes.
//!
//! In a browser these come from `navigator`, `window.screen` and `document`;
//! other hosts supply them through [`PageEnvironment`].

use std::fmt;

/// Width and height in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Source of the environment attributes recorded on every event.
///
/// Values are read each time an event is built, so implementations may
/// return live values (a page title that changes, a resized viewport).
pub trait PageEnvironment: Send + Sync {
    /// User agent string of the client.
    fn user_agent(&self) -> String;

    /// Physical screen size.
    fn screen_size(&self) -> Dimensions;

    /// Visible viewport size.
    fn viewport_size(&self) -> Dimensions;

    /// Preferred language of the client.
    fn accept_language(&self) -> String;

    /// URL of the current page.
    fn page_url(&self) -> String;

    /// Title of the current page.
    fn page_title(&self) -> String;
}

/// Fixed environment values, for hosts without a DOM and for tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticPageEnvironment {
    /// See [`PageEnvironment::user_agent`].
    pub user_agent: String,
    /// See [`PageEnvironment::screen_size`].
    pub screen_size: Dimensions,
    /// See [`PageEnvironment::viewport_size`].
    pub viewport_size: Dimensions,
    /// See [`PageEnvironment::accept_language`].
    pub accept_language: String,
    /// See [`PageEnvironment::page_url`].
    pub page_url: String,
    /// See [`PageEnvironment::page_title`].
    pub page_title: String,
}

impl Default for StaticPageEnvironment {
    fn default() -> Self {
        Self {
            user_agent: concat!("pulse-rs/", env!("CARGO_PKG_VERSION")).to_string(),
            screen_size: Dimensions::default(),
            viewport_size: Dimensions::default(),
            accept_language: "en".to_string(),
            page_url: "about:blank".to_string(),
            page_title: String::new(),
        }
    }
}

impl StaticPageEnvironment {
    /// Environment for a page at `url` titled `title`.
    #[must_use]
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            page_url: url.into(),
            page_title: title.into(),
            ..Default::default()
        }
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the screen size.
    #[must_use]
    pub const fn with_screen_size(mut self, width: u32, height: u32) -> Self {
        self.screen_size = Dimensions::new(width, height);
        self
    }

    /// Set the viewport size.
    #[must_use]
    pub const fn with_viewport_size(mut self, width: u32, height: u32) -> Self {
        self.viewport_size = Dimensions::new(width, height);
        self
    }

    /// Set the preferred language.
    #[must_use]
    pub fn with_accept_language(mut self, language: impl Into<String>) -> Self {
        self.accept_language = language.into();
        self
    }
}

impl PageEnvironment for StaticPageEnvironment {
    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn screen_size(&self) -> Dimensions {
        self.screen_size
    }

    fn viewport_size(&self) -> Dimensions {
        self.viewport_size
    }

    fn accept_language(&self) -> String {
        self.accept_language.clone()
    }

    fn page_url(&self) -> String {
        self.page_url.clone()
    }

    fn page_title(&self) -> String {
        self.page_title.clone()
    }
}
