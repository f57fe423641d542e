//! Host game lifecycle hooks

use econsync_core::GameState;

/// Capability the host game exposes to the hub
///
/// The hub calls `on_sync_start` when startup begins (e.g. to pause the
/// game) and `on_sync_complete` once every consumer has been notified,
/// whether the hub ended up `Ready` or `Offline`.
pub trait GameLifecycleProvider {
    /// The game state game-aware objects start in
    fn get_game_state(&self) -> GameState;

    fn on_sync_start(&mut self) {}

    fn on_sync_complete(&mut self) {}
}

/// Lifecycle provider reporting a fixed game state
#[derive(Debug, Clone, Default)]
pub struct FixedLifecycle {
    state: GameState,
}

impl FixedLifecycle {
    pub fn new(state: GameState) -> Self {
        Self { state }
    }
}

impl GameLifecycleProvider for FixedLifecycle {
    fn get_game_state(&self) -> GameState {
        self.state.clone()
    }
}
