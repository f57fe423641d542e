//! Game states, object states and the associations that gate values

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

const UNDEFINED: &str = "Undefined";

/// Name of the state the whole game is in (e.g. "Exploring", "Fighting")
///
/// State names are opaque to the engine. `GameState::default()` is the
/// undefined state, which matches every association.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameState(String);

/// Name of the state a single game object is in (e.g. "Walking")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectState(String);

macro_rules! state_name {
    ($ty:ident) => {
        impl $ty {
            /// Create a state from its name
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            /// The undefined state
            pub fn undefined() -> Self {
                Self(UNDEFINED.to_string())
            }

            pub fn is_undefined(&self) -> bool {
                self.0 == UNDEFINED || self.0.is_empty()
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::undefined()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $ty {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

state_name!(GameState);
state_name!(ObjectState);

/// A named bundle of game states and object states
///
/// A value bound to an association applies while the game is in any of its
/// game states AND the object is in any of its object states. An empty list
/// applies universally for that dimension.
///
/// Equality is structural: the title and the *sets* of states must match,
/// regardless of declaration order or duplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateAssociation {
    title: String,
    #[serde(default)]
    game_states: Vec<GameState>,
    #[serde(default)]
    object_states: Vec<ObjectState>,
}

impl StateAssociation {
    /// Create an association with no states
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            game_states: Vec::new(),
            object_states: Vec::new(),
        }
    }

    /// Set the game states
    pub fn with_game_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<GameState>,
    {
        self.game_states = states.into_iter().map(Into::into).collect();
        self
    }

    /// Set the object states
    pub fn with_object_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ObjectState>,
    {
        self.object_states = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn game_states(&self) -> &[GameState] {
        &self.game_states
    }

    pub fn object_states(&self) -> &[ObjectState] {
        &self.object_states
    }

    /// Whether this association applies to the given pair of states
    pub fn applies_to(&self, game_state: &GameState, object_state: &ObjectState) -> bool {
        let game_ok = game_state.is_undefined()
            || self.game_states.is_empty()
            || self.game_states.contains(game_state);
        let object_ok = object_state.is_undefined()
            || self.object_states.is_empty()
            || self.object_states.contains(object_state);
        game_ok && object_ok
    }

    /// Canonical string form, stable across serialization
    ///
    /// `"Title@N/A"` when no states are listed, otherwise
    /// `"Title@g1,g2/o1"` with each list sorted.
    pub fn canonical(&self) -> String {
        if self.game_states.is_empty() && self.object_states.is_empty() {
            return format!("{}@N/A", self.title);
        }
        let games: Vec<&str> = self.game_set().into_iter().collect();
        let objects: Vec<&str> = self.object_set().into_iter().collect();
        format!("{}@{}/{}", self.title, games.join(","), objects.join(","))
    }

    fn game_set(&self) -> BTreeSet<&str> {
        self.game_states.iter().map(GameState::as_str).collect()
    }

    fn object_set(&self) -> BTreeSet<&str> {
        self.object_states.iter().map(ObjectState::as_str).collect()
    }
}

impl PartialEq for StateAssociation {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.game_set() == other.game_set()
            && self.object_set() == other.object_set()
    }
}

impl Eq for StateAssociation {}

impl Hash for StateAssociation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.title.hash(state);
        self.game_set().hash(state);
        self.object_set().hash(state);
    }
}

impl fmt::Display for StateAssociation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}
