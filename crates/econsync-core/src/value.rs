//! Numeric values synchronized from the diagram

use crate::{Formula, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel for "no cap" on `max` (and the unset `min`)
pub const UNBOUNDED: i64 = -1;

/// How a derived value recomputes its base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Derivation {
    /// The expression the base is computed from
    pub formula: Formula,
    /// Recompute the base whenever the value is reset
    pub rerun_on_reset: bool,
    /// Recompute the base (and reset) on every read of the current value
    pub rerun_on_every_read: bool,
}

/// A numeric quantity with a base, a current amount and an optional cap
///
/// `current == base` right after construction or reset, and `current` is
/// clamped to `max` after every mutation.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Value {
    base: i64,
    current: i64,
    #[serde(default = "unbounded")]
    max: i64,
    #[serde(default = "unbounded")]
    min: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    derivation: Option<Derivation>,
}

fn unbounded() -> i64 {
    UNBOUNDED
}

impl Value {
    /// Create a plain value with `current == base`
    pub fn new(base: i64) -> Self {
        Self {
            base,
            current: base,
            max: UNBOUNDED,
            min: UNBOUNDED,
            derivation: None,
        }
    }

    /// Create a derived value from a formula
    ///
    /// The base is computed immediately, so a malformed expression fails here.
    pub fn derived(
        expression: &str,
        rerun_on_reset: bool,
        rerun_on_every_read: bool,
        seed: u64,
    ) -> Result<Self> {
        let mut formula = Formula::with_seed(expression, seed)?;
        let base = formula.evaluate();
        Ok(Self {
            base,
            current: base,
            max: UNBOUNDED,
            min: UNBOUNDED,
            derivation: Some(Derivation {
                formula,
                rerun_on_reset,
                rerun_on_every_read,
            }),
        })
    }

    /// Set the cap (`UNBOUNDED` removes it)
    pub fn with_max(mut self, max: i64) -> Self {
        self.max = max;
        self.clamp();
        self
    }

    /// The base amount
    pub fn base(&self) -> i64 {
        self.base
    }

    /// The cap, or `UNBOUNDED`
    pub fn max(&self) -> i64 {
        self.max
    }

    /// Reserved lower bound
    pub fn min(&self) -> i64 {
        self.min
    }

    /// The derivation, if this value is formula-driven
    pub fn derivation(&self) -> Option<&Derivation> {
        self.derivation.as_ref()
    }

    pub fn is_derived(&self) -> bool {
        self.derivation.is_some()
    }

    /// Read the current amount
    ///
    /// Derived values flagged `rerun_on_every_read` recompute their base and
    /// reset before answering.
    pub fn current(&mut self) -> i64 {
        if let Some(d) = self.derivation.as_mut() {
            if d.rerun_on_every_read {
                self.base = d.formula.evaluate();
                self.current = self.base;
                self.clamp();
            }
        }
        self.current
    }

    /// Read the current amount without recomputing anything
    pub fn peek(&self) -> i64 {
        self.current
    }

    /// Restore `current` to `base`
    pub fn reset(&mut self) {
        if let Some(d) = self.derivation.as_mut() {
            if d.rerun_on_reset {
                self.base = d.formula.evaluate();
            }
        }
        self.current = self.base;
        self.clamp();
    }

    /// Add `delta` to the current amount
    pub fn change_by(&mut self, delta: i64) {
        self.current = self.current.saturating_add(delta);
        self.clamp();
    }

    /// Overwrite the current amount
    pub fn change_to(&mut self, value: i64) {
        self.current = value;
        self.clamp();
    }

    fn clamp(&mut self) {
        if self.max != UNBOUNDED && self.current > self.max {
            self.current = self.max;
        }
    }
}

/// Cloning builds a fresh instance from the construction parameters:
/// `current` starts at `base`, and derived values roll their formula again.
impl Clone for Value {
    fn clone(&self) -> Self {
        match &self.derivation {
            None => {
                let mut value = Self {
                    base: self.base,
                    current: self.base,
                    max: self.max,
                    min: self.min,
                    derivation: None,
                };
                value.clamp();
                value
            }
            Some(d) => {
                let mut formula = d.formula.clone();
                let base = formula.evaluate();
                let mut value = Self {
                    base,
                    current: base,
                    max: self.max,
                    min: self.min,
                    derivation: Some(Derivation {
                        formula,
                        rerun_on_reset: d.rerun_on_reset,
                        rerun_on_every_read: d.rerun_on_every_read,
                    }),
                };
                value.clamp();
                value
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.derivation {
            Some(d) => write!(f, "{}", d.formula),
            None => write!(f, "{}", self.base),
        }
    }
}
