//! Source table of declared coordinates and their values
//!
//! The registry is the single source of truth binders pull from. It is
//! filled from manifests at startup, then from backend responses, the
//! cache, or declared defaults.

use crate::{Error, Result, SyncConfig};
use econsync_cache::{CacheSnapshot, CacheStore};
use econsync_core::{
    Coordinate, Error as CoreError, GameRng, Manifest, MatchMode, StateAssociation, Value,
    ValueSource, UNBOUNDED,
};
use econsync_netcode::DiagramElement;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Coordinate → value table plus the cache it is mirrored into
#[derive(Debug)]
pub struct Registry {
    /// `None` means declared but not yet resolved
    sources: IndexMap<Coordinate, Option<Value>>,
    cache: CacheSnapshot,
    store: CacheStore,
    strict_offline: bool,
    offline: bool,
    /// Seeds derived values built from element labels
    rng: GameRng,
}

impl Registry {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            sources: IndexMap::new(),
            cache: CacheSnapshot::new(),
            store: config.cache_store(),
            strict_offline: config.strict_offline,
            offline: false,
            rng: GameRng::new(config.rng_seed),
        }
    }

    /// Add every target of a manifest; returns how many were new
    pub fn declare(&mut self, manifest: &Manifest) -> Result<usize> {
        let added = self.add_targets(manifest.targets()?);
        tracing::debug!(
            object = manifest.object_name().unwrap_or("N/A"),
            added,
            "declared manifest"
        );
        Ok(added)
    }

    /// Add coordinates to the table; the first declaration of a coordinate wins
    pub fn add_targets(&mut self, targets: impl IntoIterator<Item = Coordinate>) -> usize {
        let mut added = 0;
        for target in targets {
            if !self.sources.contains_key(&target) {
                self.sources.insert(target, None);
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Number of coordinates holding a value
    pub fn resolved_count(&self) -> usize {
        self.sources.values().filter(|v| v.is_some()).count()
    }

    /// Iterate the table in declaration order
    pub fn entries(&self) -> impl Iterator<Item = (&Coordinate, Option<&Value>)> {
        self.sources.iter().map(|(c, v)| (c, v.as_ref()))
    }

    /// The stored value for a coordinate
    pub fn get(&self, coordinate: &Coordinate) -> Option<&Value> {
        self.sources.get(coordinate).and_then(Option::as_ref)
    }

    /// Distinct remote ids, in declaration order
    pub fn remote_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = Vec::new();
        for coordinate in self.sources.keys() {
            if !ids.contains(&coordinate.remote_id()) {
                ids.push(coordinate.remote_id());
            }
        }
        ids
    }

    /// First coordinate mapped to a remote id
    pub fn coordinate_for_id(&self, remote_id: i64) -> Result<&Coordinate> {
        self.sources
            .keys()
            .find(|c| c.remote_id() == remote_id)
            .ok_or(Error::UnknownElement(remote_id))
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn cache(&self) -> &CacheSnapshot {
        &self.cache
    }

    /// Fresh value for a coordinate, falling back to its declared default
    pub fn source_value(&self, coordinate: &Coordinate) -> Result<Value> {
        self.find_source_value(
            coordinate.object_name(),
            coordinate.property_name(),
            coordinate.state_association(),
        )?
        .ok_or_else(|| CoreError::Unresolved(coordinate.canonical()).into())
    }

    /// Build a value from an element's properties
    ///
    /// An integer `resources` gives a plain value, capped by `capacity`
    /// unless that is -1 or 0. Otherwise the `label` is read as a formula.
    pub fn element_value(&mut self, element: &DiagramElement) -> Result<Value> {
        if let Some(resources) = element.resources() {
            let mut value = Value::new(resources);
            if let Some(capacity) = element
                .capacity()
                .filter(|c| *c != UNBOUNDED && *c != 0)
            {
                value = value.with_max(capacity);
            }
            return Ok(value);
        }

        match element.label() {
            Some(label) => Ok(Value::derived(label, false, true, self.rng.next_u64())?),
            None => Err(Error::InvalidElement {
                id: element.id,
                reason: "neither integer resources nor a label".to_string(),
            }),
        }
    }

    /// Store values from backend elements
    ///
    /// Every element must map to at least one declared coordinate. Without
    /// `overwrite`, writing over an already resolved value is a protocol
    /// error. The batch is checked as a whole before anything is written, so
    /// a rejected batch leaves the table untouched. Returns the coordinates
    /// that changed, with their new values.
    pub fn apply_elements(
        &mut self,
        elements: &[DiagramElement],
        overwrite: bool,
    ) -> Result<Vec<(Coordinate, Value)>> {
        let mut staged: Vec<(Vec<Coordinate>, Value)> = Vec::with_capacity(elements.len());
        let mut seen = HashSet::new();
        for element in elements {
            let targets: Vec<Coordinate> = self
                .sources
                .iter()
                .filter(|(c, _)| c.remote_id() == element.id)
                .map(|(c, slot)| {
                    if slot.is_some() && !overwrite {
                        Err(Error::AlreadyResolved(c.canonical()))
                    } else {
                        Ok(c.clone())
                    }
                })
                .collect::<Result<_>>()?;
            if targets.is_empty() {
                return Err(Error::UnknownElement(element.id));
            }
            if !seen.insert(element.id) && !overwrite {
                return Err(Error::AlreadyResolved(targets[0].canonical()));
            }
            staged.push((targets, self.element_value(element)?));
        }

        let mut changed = Vec::new();
        for (targets, value) in staged {
            for coordinate in targets {
                if let Some(slot) = self.sources.get_mut(&coordinate) {
                    *slot = Some(value.clone());
                }
                tracing::debug!(
                    coordinate = %coordinate,
                    value = %value,
                    overwrite,
                    "applied element"
                );

                if self.store.is_enabled() {
                    self.cache.record(&coordinate, &value);
                }
                changed.push((coordinate, value.clone()));
            }
        }

        if !changed.is_empty() && self.store.is_enabled() {
            self.save_cache()?;
        }
        Ok(changed)
    }

    /// Read the snapshot and copy its values over matching coordinates
    ///
    /// Entries match by canonical form. Returns how many coordinates were
    /// filled.
    pub fn load_cache(&mut self) -> Result<usize> {
        self.cache = self.store.load()?;
        let mut applied = 0;
        for entry in self.cache.entries() {
            let Some(value) = entry.cached_value() else {
                continue;
            };
            for (coordinate, slot) in self.sources.iter_mut() {
                if coordinate.matches(entry, MatchMode::Canonical) {
                    *slot = Some(value.clone());
                    applied += 1;
                }
            }
        }
        tracing::info!(entries = self.cache.len(), applied, "applied cache");
        Ok(applied)
    }

    /// Write the snapshot, replacing the previous one
    pub fn save_cache(&self) -> Result<()> {
        self.store.save(&self.cache)?;
        Ok(())
    }
}

impl ValueSource for Registry {
    fn find_source_value(
        &self,
        object_name: Option<&str>,
        property_name: &str,
        state_association: Option<&StateAssociation>,
    ) -> econsync_core::Result<Option<Value>> {
        let (coordinate, value) = self
            .sources
            .iter()
            .find(|(c, _)| {
                c.matches_target(object_name, property_name, state_association, MatchMode::Structural)
            })
            .ok_or_else(|| {
                CoreError::CoordinateNotDeclared(describe(object_name, property_name, state_association))
            })?;

        if let Some(value) = value {
            return Ok(Some(value.clone()));
        }
        if !self.offline {
            return Err(CoreError::NotInitialized(coordinate.canonical()));
        }
        if let Some(cached) = self
            .cache
            .find(object_name, property_name, state_association)
        {
            return Ok(Some(cached.clone()));
        }
        if let Some(default) = coordinate.default_value() {
            tracing::debug!(coordinate = %coordinate, "offline, using declared default");
            return Ok(Some(default.clone()));
        }
        if self.strict_offline {
            return Err(CoreError::StrictOffline(coordinate.canonical()));
        }
        tracing::warn!(coordinate = %coordinate, "offline with no cached value or default");
        Ok(None)
    }
}

fn describe(
    object_name: Option<&str>,
    property_name: &str,
    state_association: Option<&StateAssociation>,
) -> String {
    format!(
        "{}.{}.{}",
        object_name.unwrap_or("N/A"),
        property_name,
        state_association
            .map(StateAssociation::canonical)
            .unwrap_or_else(|| "N/A".to_string())
    )
}
