//! Ready-made consumer owning one binder per manifest property

use crate::{Result, SyncConsumer, SyncContext};
use econsync_core::{
    Binder, Coordinate, Error as CoreError, GameState, Manifest, ObjectState, Value,
};
use indexmap::IndexMap;
use std::fmt;

/// How a [`SyncedObject`] reacts to game state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Ignores game and object state changes
    Plain,
    /// Starts in the hub's game state and follows game/object state changes
    GameAware,
    /// Not tied to an object instance (manifest without object name)
    Shared,
}

/// Called after an object's binders were (re)resolved
pub type BindersUpdated = Box<dyn FnMut(&SyncedObject, &mut SyncContext<'_>) -> Result<()>>;

/// A game object whose properties are bound to diagram values
///
/// Binders are created when the hub becomes ready (or offline): one per
/// property, with one slot per applicable state association.
pub struct SyncedObject {
    manifest: Manifest,
    kind: ObjectKind,
    binders: IndexMap<String, Binder>,
    object_state: ObjectState,
    ready: bool,
    on_binders_updated: Option<BindersUpdated>,
}

impl SyncedObject {
    pub fn new(manifest: Manifest) -> Self {
        let kind = if manifest.object_name().is_none() {
            ObjectKind::Shared
        } else {
            ObjectKind::Plain
        };
        Self {
            manifest,
            kind,
            binders: IndexMap::new(),
            object_state: ObjectState::default(),
            ready: false,
            on_binders_updated: None,
        }
    }

    /// An object that follows game and object state
    pub fn game_aware(manifest: Manifest) -> Self {
        let mut object = Self::new(manifest);
        object.kind = ObjectKind::GameAware;
        object
    }

    /// Run `hook` whenever binders are (re)resolved
    pub fn with_hook(
        mut self,
        hook: impl FnMut(&SyncedObject, &mut SyncContext<'_>) -> Result<()> + 'static,
    ) -> Self {
        self.on_binders_updated = Some(Box::new(hook));
        self
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn object_state(&self) -> &ObjectState {
        &self.object_state
    }

    pub fn binder(&self, property: &str) -> Option<&Binder> {
        self.binders.get(property)
    }

    pub fn binder_mut(&mut self, property: &str) -> Option<&mut Binder> {
        self.binders.get_mut(property)
    }

    pub fn binders(&self) -> impl Iterator<Item = (&str, &Binder)> {
        self.binders.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Current amount of a property
    pub fn current_value(&mut self, property: &str) -> Result<i64> {
        Ok(self.require_binder(property)?.current_value()?)
    }

    pub fn base_value(&self, property: &str) -> Result<i64> {
        let binder = self
            .binders
            .get(property)
            .ok_or_else(|| CoreError::UnknownProperty(property.to_string()))?;
        Ok(binder.base_value()?)
    }

    pub fn change_by(&mut self, property: &str, delta: i64) -> Result<()> {
        Ok(self.require_binder(property)?.change_by(delta)?)
    }

    pub fn change_to(&mut self, property: &str, value: i64) -> Result<()> {
        Ok(self.require_binder(property)?.change_to(value)?)
    }

    /// Change this instance's object state
    pub fn set_object_state(&mut self, state: ObjectState) -> Result<()> {
        if self.kind != ObjectKind::GameAware || self.object_state == state {
            return Ok(());
        }
        self.object_state = state;
        for binder in self.binders.values_mut() {
            binder.update_object_state(self.object_state.clone())?;
        }
        Ok(())
    }

    fn require_binder(&mut self, property: &str) -> Result<&mut Binder> {
        Ok(self
            .binders
            .get_mut(property)
            .ok_or_else(|| CoreError::UnknownProperty(property.to_string()))?)
    }

    fn run_hook(&mut self, ctx: &mut SyncContext<'_>) -> Result<()> {
        if let Some(mut hook) = self.on_binders_updated.take() {
            let result = hook(self, ctx);
            self.on_binders_updated = Some(hook);
            result?;
        }
        Ok(())
    }
}

impl SyncConsumer for SyncedObject {
    fn object_name(&self) -> Option<&str> {
        self.manifest.object_name()
    }

    fn manifest(&self) -> Option<&Manifest> {
        Some(&self.manifest)
    }

    fn on_ready(&mut self, ctx: &mut SyncContext<'_>) -> Result<()> {
        let offline = ctx.is_offline();
        for property in &self.manifest.properties {
            let mut binder = Binder::new(
                self.manifest.object_name.clone(),
                property.name.clone(),
                property.default.clone(),
            );
            let states = self.manifest.states_for_property(&property.name);
            if states.is_empty() {
                binder.resolve_slot(ctx.registry(), None, false, offline)?;
            } else {
                for sa in &states {
                    binder.resolve_slot(ctx.registry(), Some(sa), false, offline)?;
                }
            }
            if self.kind == ObjectKind::GameAware {
                binder.update_states(ctx.game_state().clone(), self.object_state.clone())?;
            }
            self.binders.insert(property.name.clone(), binder);
        }
        self.ready = true;
        tracing::debug!(
            object = self.manifest.object_name().unwrap_or("N/A"),
            binders = self.binders.len(),
            offline,
            "object ready"
        );
        self.run_hook(ctx)
    }

    fn on_update(
        &mut self,
        coordinate: &Coordinate,
        _value: &Value,
        ctx: &mut SyncContext<'_>,
    ) -> Result<()> {
        let offline = ctx.is_offline();
        if let Some(binder) = self.binders.get_mut(coordinate.property_name()) {
            binder.resolve_slot(ctx.registry(), coordinate.state_association(), true, offline)?;
        }
        self.run_hook(ctx)
    }

    fn binds(&self, coordinate: &Coordinate) -> bool {
        coordinate.object_name() == self.manifest.object_name()
            && self.binders.contains_key(coordinate.property_name())
    }

    fn on_game_state_changed(&mut self, state: &GameState) -> Result<()> {
        if self.kind != ObjectKind::GameAware {
            return Ok(());
        }
        for binder in self.binders.values_mut() {
            binder.update_game_state(state.clone())?;
        }
        Ok(())
    }

    fn on_object_state_changed(&mut self, state: &ObjectState) -> Result<()> {
        self.set_object_state(state.clone())
    }
}

impl fmt::Debug for SyncedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncedObject")
            .field("object", &self.manifest.object_name())
            .field("kind", &self.kind)
            .field("binders", &self.binders.len())
            .field("ready", &self.ready)
            .finish()
    }
}
