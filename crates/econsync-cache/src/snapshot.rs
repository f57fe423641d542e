//! In-memory form of the cache file

use econsync_core::{Coordinate, MatchMode, StateAssociation, Value};
use serde::{Deserialize, Serialize};

/// Version written into every snapshot
pub const CACHE_VERSION: u32 = 1;

/// Ordered list of coordinates, each carrying its last-known value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    version: u32,
    entries: Vec<Coordinate>,
}

impl CacheSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self {
            version: CACHE_VERSION,
            entries: Vec::new(),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn entries(&self) -> &[Coordinate] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record the latest value for a coordinate
    ///
    /// An existing entry for the same coordinate is updated in place, so
    /// insertion order is preserved.
    pub fn record(&mut self, coordinate: &Coordinate, value: &Value) {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.matches(coordinate, MatchMode::Canonical))
        {
            Some(entry) => entry.set_cached_value(value.clone()),
            None => {
                let entry = Coordinate::new(
                    coordinate.object_name().map(str::to_string),
                    coordinate.property_name(),
                    coordinate.state_association().cloned(),
                    coordinate.remote_id(),
                )
                .with_cached_value(value.clone());
                self.entries.push(entry);
            }
        }
    }

    /// Find the cached value for a target, matching by canonical form
    pub fn find(
        &self,
        object_name: Option<&str>,
        property_name: &str,
        state_association: Option<&StateAssociation>,
    ) -> Option<&Value> {
        self.entries
            .iter()
            .find(|entry| {
                entry.matches_target(
                    object_name,
                    property_name,
                    state_association,
                    MatchMode::Canonical,
                )
            })
            .and_then(Coordinate::cached_value)
    }

    /// Human-readable listing, one entry per line
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("=== Cache v{} ({} entries) ===\n", self.version, self.len()));
        for entry in &self.entries {
            let value = entry
                .cached_value()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string());
            output.push_str(&format!("  {} = {}\n", entry, value));
        }
        output
    }
}

impl Default for CacheSnapshot {
    fn default() -> Self {
        Self::new()
    }
}
