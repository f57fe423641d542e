//! Per-property runtime that picks the value applying right now

use crate::{Error, GameState, ObjectState, Result, StateAssociation, Value, ValueSource};

/// Holds one value per state association for one property of one object
///
/// The binder keeps the current game state and object state as inputs and
/// re-selects its active slot whenever either changes. At most one slot is
/// active at a time.
#[derive(Debug, Clone)]
pub struct Binder {
    object_name: Option<String>,
    property_name: String,
    default_value: Option<Value>,
    /// Working copy of the default, used while no slot is active
    fallback: Option<Value>,
    /// Slots in registration order; `None` is the stateless slot
    slots: Vec<(Option<StateAssociation>, Value)>,
    active: Option<usize>,
    game_state: GameState,
    object_state: ObjectState,
    offline: bool,
}

impl Binder {
    /// Create an empty binder
    pub fn new(
        object_name: Option<String>,
        property_name: impl Into<String>,
        default_value: Option<Value>,
    ) -> Self {
        Self {
            object_name,
            property_name: property_name.into(),
            default_value,
            fallback: None,
            slots: Vec::new(),
            active: None,
            game_state: GameState::default(),
            object_state: ObjectState::default(),
            offline: false,
        }
    }

    pub fn object_name(&self) -> Option<&str> {
        self.object_name.as_deref()
    }

    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    pub fn object_state(&self) -> &ObjectState {
        &self.object_state
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Whether this binder serves `(object_name, property_name)`
    pub fn binds(&self, object_name: Option<&str>, property_name: &str) -> bool {
        self.object_name.as_deref() == object_name && self.property_name == property_name
    }

    /// The association of the active slot
    ///
    /// `None` both when nothing is active and when the stateless slot is.
    pub fn active_association(&self) -> Option<&StateAssociation> {
        self.active.and_then(|i| self.slots[i].0.as_ref())
    }

    /// The active value, if any
    pub fn value(&self) -> Option<&Value> {
        self.active.map(|i| &self.slots[i].1)
    }

    /// Tolerate missing slots (offline) or treat them as errors
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Pull the value for `state_association` from `source` into a slot
    ///
    /// Returns whether a slot was written.
    pub fn resolve_slot(
        &mut self,
        source: &impl ValueSource,
        state_association: Option<&StateAssociation>,
        overwrite: bool,
        offline: bool,
    ) -> Result<bool> {
        self.offline = offline;
        let value = match source.find_source_value(
            self.object_name.as_deref(),
            &self.property_name,
            state_association,
        )? {
            Some(value) => value,
            None if offline => {
                tracing::debug!(binder = %self.describe(), "no value while offline, skipping slot");
                return Ok(false);
            }
            None => return Err(Error::Unresolved(self.describe_with(state_association))),
        };

        let existing = self
            .slots
            .iter()
            .position(|(sa, _)| sa.as_ref() == state_association);

        match (state_association, existing) {
            // The stateless slot is always written and becomes active
            (None, Some(i)) => {
                self.slots[i].1 = value;
                self.active = Some(i);
            }
            (None, None) => {
                self.slots.push((None, value));
                self.active = Some(self.slots.len() - 1);
            }
            (Some(sa), None) => {
                self.slots.push((Some(sa.clone()), value));
                self.select_matching();
            }
            (Some(_), Some(i)) if overwrite => {
                self.slots[i].1 = value;
                self.select_active()?;
            }
            (Some(_), Some(_)) => {
                return Err(Error::SlotCollision(self.describe_with(state_association)));
            }
        }
        Ok(true)
    }

    /// Re-run slot selection against the current states
    ///
    /// Every matching slot is visited and the last one wins. Having no
    /// matching slot is an error unless the binder is offline, in which
    /// case the previous selection is kept.
    pub fn select_active(&mut self) -> Result<()> {
        if self.slots.is_empty() || self.select_matching() {
            return Ok(());
        }
        if self.offline {
            tracing::debug!(
                binder = %self.describe(),
                game_state = %self.game_state,
                object_state = %self.object_state,
                "no slot matches, keeping previous selection"
            );
            Ok(())
        } else {
            Err(Error::NoActiveValue(format!(
                "{} in {}/{}",
                self.describe(),
                self.game_state,
                self.object_state
            )))
        }
    }

    fn select_matching(&mut self) -> bool {
        let found = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, (sa, _))| match sa {
                Some(sa) => sa.applies_to(&self.game_state, &self.object_state),
                None => true,
            })
            .map(|(i, _)| i)
            .last();
        if found.is_some() {
            self.active = found;
        }
        found.is_some()
    }

    /// Change the game state; no-op when unchanged
    pub fn update_game_state(&mut self, state: GameState) -> Result<()> {
        if self.game_state == state {
            return Ok(());
        }
        self.game_state = state;
        self.select_active()
    }

    /// Change the object state; no-op when unchanged
    pub fn update_object_state(&mut self, state: ObjectState) -> Result<()> {
        if self.object_state == state {
            return Ok(());
        }
        self.object_state = state;
        self.select_active()
    }

    /// Change both states at once, selecting only once
    pub fn update_states(&mut self, game_state: GameState, object_state: ObjectState) -> Result<()> {
        if self.game_state == game_state && self.object_state == object_state {
            return Ok(());
        }
        self.game_state = game_state;
        self.object_state = object_state;
        self.select_active()
    }

    /// Read the current amount of the active value, or of the default
    pub fn current_value(&mut self) -> Result<i64> {
        if self.active.is_none() && self.fallback.is_none() && self.default_value.is_none() {
            return Err(Error::NoValueAndNoDefault(self.describe()));
        }
        Ok(self.active_value_mut()?.current())
    }

    /// Read the base amount of the active value, or of the default
    pub fn base_value(&self) -> Result<i64> {
        self.value()
            .or(self.fallback.as_ref())
            .or(self.default_value.as_ref())
            .map(Value::base)
            .ok_or_else(|| Error::NoValueAndNoDefault(self.describe()))
    }

    pub fn change_by(&mut self, delta: i64) -> Result<()> {
        self.active_value_mut()?.change_by(delta);
        Ok(())
    }

    pub fn change_to(&mut self, value: i64) -> Result<()> {
        self.active_value_mut()?.change_to(value);
        Ok(())
    }

    /// The active slot's value, else a working copy of the default
    ///
    /// The copy is made on first use and kept until a slot becomes active.
    fn active_value_mut(&mut self) -> Result<&mut Value> {
        if let Some(i) = self.active {
            return Ok(&mut self.slots[i].1);
        }
        if self.fallback.is_none() {
            self.fallback = self.default_value.clone();
        }
        let described = self.describe();
        self.fallback.as_mut().ok_or(Error::NoActiveValue(described))
    }

    fn describe(&self) -> String {
        format!(
            "{}.{}",
            self.object_name.as_deref().unwrap_or("N/A"),
            self.property_name
        )
    }

    fn describe_with(&self, sa: Option<&StateAssociation>) -> String {
        format!(
            "{}.{}",
            self.describe(),
            sa.map(StateAssociation::canonical).unwrap_or_else(|| "N/A".to_string())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Source backed by a map keyed on association canonical form
    #[derive(Default)]
    struct MapSource {
        values: HashMap<String, Option<Value>>,
    }

    impl MapSource {
        fn with(mut self, sa: Option<&StateAssociation>, value: Option<i64>) -> Self {
            self.values.insert(key(sa), value.map(Value::new));
            self
        }
    }

    fn key(sa: Option<&StateAssociation>) -> String {
        sa.map(StateAssociation::canonical).unwrap_or_default()
    }

    impl ValueSource for MapSource {
        fn find_source_value(
            &self,
            object_name: Option<&str>,
            property_name: &str,
            sa: Option<&StateAssociation>,
        ) -> Result<Option<Value>> {
            self.values
                .get(&key(sa))
                .cloned()
                .ok_or_else(|| {
                    Error::CoordinateNotDeclared(format!("{:?}.{}", object_name, property_name))
                })
        }
    }

    fn a() -> StateAssociation {
        StateAssociation::new("A").with_game_states(["A"])
    }

    fn b() -> StateAssociation {
        StateAssociation::new("B").with_game_states(["B"])
    }

    fn hero_health() -> Binder {
        Binder::new(Some("hero".into()), "health", None)
    }

    #[test]
    fn test_state_selects_slot() {
        let source = MapSource::default().with(Some(&a()), Some(10)).with(Some(&b()), Some(20));
        let mut binder = hero_health();
        binder.resolve_slot(&source, Some(&a()), false, false).unwrap();
        binder.resolve_slot(&source, Some(&b()), false, false).unwrap();

        binder.update_game_state(GameState::new("A")).unwrap();
        assert_eq!(binder.current_value().unwrap(), 10);
        assert_eq!(binder.active_association(), Some(&a()));

        binder.update_game_state(GameState::new("B")).unwrap();
        assert_eq!(binder.current_value().unwrap(), 20);
    }

    #[test]
    fn test_unmatched_state_offline_vs_online() {
        let source = MapSource::default().with(Some(&a()), Some(10)).with(Some(&b()), Some(20));

        let mut online = hero_health();
        online.resolve_slot(&source, Some(&a()), false, false).unwrap();
        online.resolve_slot(&source, Some(&b()), false, false).unwrap();
        assert!(matches!(
            online.update_game_state(GameState::new("C")),
            Err(Error::NoActiveValue(_))
        ));

        let mut offline = hero_health();
        offline.resolve_slot(&source, Some(&a()), false, true).unwrap();
        offline.resolve_slot(&source, Some(&b()), false, true).unwrap();
        offline.update_game_state(GameState::new("A")).unwrap();
        assert!(offline.update_game_state(GameState::new("C")).is_ok());
        assert_eq!(offline.current_value().unwrap(), 10);
    }

    #[test]
    fn test_last_match_wins() {
        let both = StateAssociation::new("Both").with_game_states(["A", "B"]);
        let source = MapSource::default().with(Some(&a()), Some(1)).with(Some(&both), Some(2));
        let mut binder = hero_health();
        binder.resolve_slot(&source, Some(&a()), false, false).unwrap();
        binder.resolve_slot(&source, Some(&both), false, false).unwrap();
        binder.update_game_state(GameState::new("A")).unwrap();
        assert_eq!(binder.current_value().unwrap(), 2);
    }

    #[test]
    fn test_collision_without_overwrite() {
        let source = MapSource::default().with(Some(&a()), Some(10));
        let mut binder = hero_health();
        binder.resolve_slot(&source, Some(&a()), false, false).unwrap();
        assert!(matches!(
            binder.resolve_slot(&source, Some(&a()), false, false),
            Err(Error::SlotCollision(_))
        ));
        assert!(binder.resolve_slot(&source, Some(&a()), true, false).unwrap());
        assert_eq!(binder.slot_count(), 1);
    }

    #[test]
    fn test_missing_value() {
        let source = MapSource::default().with(None, None);
        let mut binder = hero_health();
        assert!(!binder.resolve_slot(&source, None, false, true).unwrap());
        assert!(matches!(
            binder.resolve_slot(&source, None, false, false),
            Err(Error::Unresolved(_))
        ));
    }

    #[test]
    fn test_undeclared_propagates() {
        let source = MapSource::default();
        let mut binder = hero_health();
        assert!(matches!(
            binder.resolve_slot(&source, Some(&a()), false, true),
            Err(Error::CoordinateNotDeclared(_))
        ));
    }

    #[test]
    fn test_stateless_slot_always_written() {
        let mut source = MapSource::default().with(None, Some(100));
        let mut binder = Binder::new(None, "gold", None);
        binder.resolve_slot(&source, None, false, false).unwrap();
        assert_eq!(binder.current_value().unwrap(), 100);

        source = source.with(None, Some(150));
        binder.resolve_slot(&source, None, false, false).unwrap();
        assert_eq!(binder.current_value().unwrap(), 150);
        assert_eq!(binder.slot_count(), 1);
    }

    #[test]
    fn test_default_fallback() {
        let mut binder = Binder::new(None, "gold", Some(Value::new(5)));
        assert_eq!(binder.current_value().unwrap(), 5);
        assert_eq!(binder.base_value().unwrap(), 5);

        // Running on the default still allows spending
        binder.change_by(-2).unwrap();
        assert_eq!(binder.current_value().unwrap(), 3);
        binder.change_to(9).unwrap();
        assert_eq!(binder.current_value().unwrap(), 9);
        assert_eq!(binder.base_value().unwrap(), 5);

        // A resolved slot takes over from the default
        let source = MapSource::default().with(None, Some(100));
        binder.resolve_slot(&source, None, false, false).unwrap();
        assert_eq!(binder.current_value().unwrap(), 100);

        let mut bare = Binder::new(None, "gold", None);
        assert!(matches!(bare.current_value(), Err(Error::NoValueAndNoDefault(_))));
        assert!(matches!(bare.change_by(1), Err(Error::NoActiveValue(_))));
    }

    #[test]
    fn test_mutations_delegate_to_active() {
        let source = MapSource::default().with(None, Some(100));
        let mut binder = Binder::new(None, "gold", None);
        binder.resolve_slot(&source, None, false, false).unwrap();
        binder.change_by(-30).unwrap();
        assert_eq!(binder.current_value().unwrap(), 70);
        binder.change_to(5).unwrap();
        assert_eq!(binder.current_value().unwrap(), 5);
        assert_eq!(binder.base_value().unwrap(), 100);
    }

    #[test]
    fn test_update_states_noop_when_unchanged() {
        let mut binder = hero_health();
        // No slots yet; selection has nothing to do
        binder
            .update_states(GameState::new("A"), ObjectState::new("Walking"))
            .unwrap();
        binder
            .update_states(GameState::new("A"), ObjectState::new("Walking"))
            .unwrap();
        assert_eq!(binder.object_state().as_str(), "Walking");
    }
}
