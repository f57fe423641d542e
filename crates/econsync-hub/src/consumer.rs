//! Consumers notified by the hub, and the context they are notified with

use crate::{Registry, Result};
use econsync_core::{Coordinate, GameState, Manifest, ObjectState, Value};
use std::any::Any;
use std::fmt;

/// Identifier handed out on enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(pub u64);

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer#{}", self.0)
    }
}

/// Upcast to `Any` so enrolled consumers can be handed back as their
/// concrete type
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Something that wants values from the hub
///
/// Implemented by [`crate::SyncedObject`] and by host glue. All callbacks
/// run on the hub's execution context, one at a time.
pub trait SyncConsumer: AsAny {
    /// Object type this consumer belongs to, `None` for shared objects
    fn object_name(&self) -> Option<&str>;

    /// Manifest declared into the registry on enrollment
    fn manifest(&self) -> Option<&Manifest> {
        None
    }

    /// The hub reached `Ready` or `Offline`; called exactly once
    fn on_ready(&mut self, ctx: &mut SyncContext<'_>) -> Result<()>;

    /// A coordinate this consumer binds received a live update
    fn on_update(
        &mut self,
        coordinate: &Coordinate,
        value: &Value,
        ctx: &mut SyncContext<'_>,
    ) -> Result<()>;

    /// Whether updates to `coordinate` concern this consumer
    fn binds(&self, coordinate: &Coordinate) -> bool;

    fn on_game_state_changed(&mut self, _state: &GameState) -> Result<()> {
        Ok(())
    }

    fn on_object_state_changed(&mut self, _state: &ObjectState) -> Result<()> {
        Ok(())
    }
}

/// Downcast a consumer to its concrete type
pub fn downcast_ref<T: SyncConsumer>(consumer: &dyn SyncConsumer) -> Option<&T> {
    consumer.as_any().downcast_ref::<T>()
}

/// Mutable form of [`downcast_ref`]
pub fn downcast_mut<T: SyncConsumer>(consumer: &mut dyn SyncConsumer) -> Option<&mut T> {
    consumer.as_any_mut().downcast_mut::<T>()
}

/// What a consumer sees while being notified
///
/// Gives read access to the registry and lets the consumer enroll further
/// consumers; those are admitted and notified before the current
/// notification pass ends.
pub struct SyncContext<'a> {
    registry: &'a Registry,
    game_state: &'a GameState,
    enrolled: &'a mut Vec<(ConsumerId, Box<dyn SyncConsumer>)>,
    next_id: &'a mut u64,
}

impl<'a> SyncContext<'a> {
    pub(crate) fn new(
        registry: &'a Registry,
        game_state: &'a GameState,
        enrolled: &'a mut Vec<(ConsumerId, Box<dyn SyncConsumer>)>,
        next_id: &'a mut u64,
    ) -> Self {
        Self {
            registry,
            game_state,
            enrolled,
            next_id,
        }
    }

    /// The source table
    pub fn registry(&self) -> &Registry {
        self.registry
    }

    pub fn is_offline(&self) -> bool {
        self.registry.is_offline()
    }

    /// Current game state as last set on the hub
    pub fn game_state(&self) -> &GameState {
        self.game_state
    }

    /// Enroll a consumer created during this callback
    pub fn enroll(&mut self, consumer: impl SyncConsumer) -> ConsumerId {
        let id = ConsumerId(*self.next_id);
        *self.next_id += 1;
        self.enrolled.push((id, Box::new(consumer)));
        id
    }
}
