//! A constructed event awaiting delivery.

use pulse_common::{PulseError, PulseResult};

use crate::model::{Activity, SubObjectKey};

/// An activity together with the sub-objects it must carry.
///
/// A required sub-object is valid when it is present and both its `@type`
/// and `@id` are non-empty.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedEvent {
    activity: Activity,
    required: &'static [SubObjectKey],
}

impl TrackedEvent {
    /// Wrap `activity`, requiring the given sub-objects.
    #[must_use]
    pub const fn new(activity: Activity, required: &'static [SubObjectKey]) -> Self {
        Self { activity, required }
    }

    /// The wrapped activity.
    #[must_use]
    pub const fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Mutable access, for callers adding fields before sending.
    pub fn activity_mut(&mut self) -> &mut Activity {
        &mut self.activity
    }

    /// Sub-objects this event must carry.
    #[must_use]
    pub const fn required_keys(&self) -> &'static [SubObjectKey] {
        self.required
    }

    /// Check every required sub-object. Reports the first failing key.
    pub fn validate(&self) -> PulseResult<()> {
        for &key in self.required {
            match self.activity.sub_object(key) {
                None => {
                    return Err(PulseError::InvalidEvent(format!("{key} is required")));
                }
                Some(object) if !object.is_filled() => {
                    return Err(PulseError::InvalidEvent(format!(
                        "{key} must have a non-empty @type and @id"
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Validate and hand over the payload.
    pub fn into_activity(self) -> PulseResult<Activity> {
        self.validate()?;
        Ok(self.activity)
    }
}
