//! Econsync Core - Diagram-driven values for game economies
//!
//! This crate provides the building blocks that the hub reconciles against a
//! remote design diagram:
//! - Numeric values with an optional cap (`Value`)
//! - Derived values driven by simple arithmetic/dice formulas (`Formula`)
//! - Game and object states, bundled into `StateAssociation`s
//! - `Coordinate`s naming which diagram element a property maps to
//! - Per object-type `Manifest`s declaring what must be resolved
//! - Per-property `Binder`s selecting the value that applies right now
//!
//! ## Resolution
//!
//! Binders never talk to the network. They ask a [`ValueSource`] (implemented
//! by the hub's registry) for a fresh copy of the value behind a coordinate:
//!
//! ```rust,ignore
//! use econsync_core::{Binder, StateAssociation, GameState};
//!
//! let mut binder = Binder::new(Some("hero".into()), "health", None);
//! binder.resolve_slot(&registry, Some(&exploring), false, false)?;
//! binder.update_game_state(GameState::new("Exploring"))?;
//! let hp = binder.current_value()?;
//! ```

mod binder;
mod coordinate;
mod error;
mod formula;
mod manifest;
mod rng;
mod source;
mod states;
mod value;

pub use binder::Binder;
pub use coordinate::{Coordinate, MatchMode};
pub use error::{Error, Result};
pub use formula::{Formula, Term};
pub use manifest::{Manifest, PropertySpec};
pub use rng::GameRng;
pub use source::ValueSource;
pub use states::{GameState, ObjectState, StateAssociation};
pub use value::{Derivation, Value, UNBOUNDED};
