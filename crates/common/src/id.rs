//! ID generation utilities.

use ulid::Ulid;
use uuid::Uuid;

/// ID generator for anonymous visitors and tracker instances.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// Used to tag a tracker instance in log output.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate an anonymous visitor identity.
    ///
    /// Random UUID v4 in URN form, so no time component leaks into the id.
    #[must_use]
    pub fn generate_anonymous_id(&self) -> String {
        format!("urn:uuid:{}", Uuid::new_v4())
    }
}
