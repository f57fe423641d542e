//! Coordinates mapping a local property to a diagram element

use crate::{StateAssociation, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Placeholder used in canonical strings for an absent part
pub(crate) const NOT_APPLICABLE: &str = "N/A";

/// How two coordinates are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// Compare state associations by their sets of states
    Structural,
    /// Compare state associations by their canonical string form
    ///
    /// Used against coordinates read back from the cache, where state names
    /// may not round-trip identically.
    Canonical,
}

/// Identifies which diagram element a property (and state combination) maps to
///
/// Equality and hashing only look at `object_name`, `property_name` and the
/// state association. The remote id and the carried values are payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coordinate {
    /// Owning object type, `None` for shared objects
    #[serde(default)]
    object_name: Option<String>,
    property_name: String,
    #[serde(default)]
    state_association: Option<StateAssociation>,
    /// Backend-assigned element id
    remote_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cached_value: Option<Value>,
}

impl Coordinate {
    pub fn new(
        object_name: Option<String>,
        property_name: impl Into<String>,
        state_association: Option<StateAssociation>,
        remote_id: i64,
    ) -> Self {
        Self {
            object_name,
            property_name: property_name.into(),
            state_association,
            remote_id,
            default_value: None,
            cached_value: None,
        }
    }

    /// Attach a static default used when nothing else is available
    pub fn with_default(mut self, value: Option<Value>) -> Self {
        self.default_value = value;
        self
    }

    /// Attach the last value seen from the backend
    pub fn with_cached_value(mut self, value: Value) -> Self {
        self.cached_value = Some(value);
        self
    }

    pub fn object_name(&self) -> Option<&str> {
        self.object_name.as_deref()
    }

    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    pub fn state_association(&self) -> Option<&StateAssociation> {
        self.state_association.as_ref()
    }

    pub fn remote_id(&self) -> i64 {
        self.remote_id
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    pub fn cached_value(&self) -> Option<&Value> {
        self.cached_value.as_ref()
    }

    /// Record the latest value received for this coordinate
    pub fn set_cached_value(&mut self, value: Value) {
        self.cached_value = Some(value);
    }

    /// Check whether this coordinate addresses the given target
    pub fn matches_target(
        &self,
        object_name: Option<&str>,
        property_name: &str,
        state_association: Option<&StateAssociation>,
        mode: MatchMode,
    ) -> bool {
        if self.object_name.as_deref() != object_name || self.property_name != property_name {
            return false;
        }
        match mode {
            MatchMode::Structural => self.state_association.as_ref() == state_association,
            MatchMode::Canonical => {
                canonical_association(self.state_association.as_ref())
                    == canonical_association(state_association)
            }
        }
    }

    /// Compare two coordinates using the given mode
    pub fn matches(&self, other: &Coordinate, mode: MatchMode) -> bool {
        self.matches_target(
            other.object_name(),
            other.property_name(),
            other.state_association(),
            mode,
        )
    }

    /// Canonical string form: `object.property.association`
    pub fn canonical(&self) -> String {
        format!(
            "{}.{}.{}",
            self.object_name.as_deref().unwrap_or(NOT_APPLICABLE),
            self.property_name,
            canonical_association(self.state_association.as_ref())
        )
    }
}

fn canonical_association(sa: Option<&StateAssociation>) -> String {
    sa.map(StateAssociation::canonical)
        .unwrap_or_else(|| NOT_APPLICABLE.to_string())
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other, MatchMode::Structural)
    }
}

impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.object_name.hash(state);
        self.property_name.hash(state);
        self.state_association.hash(state);
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.canonical(), self.remote_id)
    }
}
