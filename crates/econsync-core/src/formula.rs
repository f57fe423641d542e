//! Formula engine for derived values
//!
//! A formula is a left-to-right sequence of signed integer terms, e.g.
//! `"10 + D6 - 2"`. A term written `D<n>` is a die with `n` faces, re-rolled
//! on every evaluation.

use crate::{Error, GameRng, Result};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;

/// A single member of a formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    /// A fixed integer
    Constant(i64),
    /// A uniformly random integer in [1, sides]
    Dice(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Plus,
    Minus,
}

/// A parsed arithmetic/dice expression
#[derive(Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Formula {
    expression: String,
    terms: Vec<(Op, Term)>,
    /// Clones split from this, so it advances behind a shared reference
    rng: Cell<GameRng>,
}

impl Formula {
    /// Parse an expression, seeding dice with the default seed
    pub fn parse(expression: &str) -> Result<Self> {
        Self::with_seed(expression, GameRng::default().state())
    }

    /// Parse an expression with an explicit dice seed
    pub fn with_seed(expression: &str, seed: u64) -> Result<Self> {
        let terms = parse_terms(expression)?;
        Ok(Self {
            expression: expression.to_string(),
            terms,
            rng: Cell::new(GameRng::new(seed)),
        })
    }

    /// The source expression
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Iterate over the signed terms (true = subtracted)
    pub fn terms(&self) -> impl Iterator<Item = (bool, Term)> + '_ {
        self.terms.iter().map(|(op, t)| (*op == Op::Minus, *t))
    }

    /// Whether evaluating this formula involves randomness
    pub fn has_dice(&self) -> bool {
        self.terms.iter().any(|(_, t)| matches!(t, Term::Dice(_)))
    }

    /// Evaluate the formula, rolling every die again
    pub fn evaluate(&mut self) -> i64 {
        let mut total: i64 = 0;
        for (op, term) in &self.terms {
            let v = match term {
                Term::Constant(c) => *c,
                Term::Dice(sides) => self.rng.get_mut().roll(*sides),
            };
            total = match op {
                Op::Plus => total.saturating_add(v),
                Op::Minus => total.saturating_sub(v),
            };
        }
        total
    }
}

/// Each clone rolls its own dice: the child generator is split off the
/// parent's, and the parent moves on.
impl Clone for Formula {
    fn clone(&self) -> Self {
        let mut parent = self.rng.get();
        let child = parent.fork();
        self.rng.set(parent);
        Self {
            expression: self.expression.clone(),
            terms: self.terms.clone(),
            rng: Cell::new(child),
        }
    }
}

impl PartialEq for Formula {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

impl TryFrom<String> for Formula {
    type Error = Error;

    fn try_from(expression: String) -> Result<Self> {
        Formula::parse(&expression)
    }
}

impl From<Formula> for String {
    fn from(formula: Formula) -> Self {
        formula.expression
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F: {}", self.expression)
    }
}

fn parse_terms(expression: &str) -> Result<Vec<(Op, Term)>> {
    let mut chars = expression.chars().filter(|c| !c.is_whitespace()).peekable();
    let mut terms = Vec::new();

    if chars.peek().is_none() {
        return Err(Error::formula(expression, "empty expression"));
    }

    while let Some(&c) = chars.peek() {
        let op = match c {
            '+' => {
                chars.next();
                Op::Plus
            }
            '-' => {
                chars.next();
                Op::Minus
            }
            // First term defaults to addition
            _ if terms.is_empty() => Op::Plus,
            other => {
                return Err(Error::formula(
                    expression,
                    format!("expected '+' or '-', found '{}'", other),
                ))
            }
        };

        let is_dice = matches!(chars.peek(), Some('D') | Some('d'));
        if is_dice {
            chars.next();
        }

        let mut digits = String::new();
        while let Some(&d) = chars.peek() {
            if !d.is_ascii_digit() {
                break;
            }
            digits.push(d);
            chars.next();
        }

        if digits.is_empty() {
            let found = chars
                .peek()
                .map(|c| format!("'{}'", c))
                .unwrap_or_else(|| "end of input".to_string());
            return Err(Error::formula(
                expression,
                format!("expected integer or dice term, found {}", found),
            ));
        }

        let term = if is_dice {
            let sides: u32 = digits
                .parse()
                .map_err(|_| Error::formula(expression, format!("invalid dice size D{}", digits)))?;
            if sides == 0 {
                return Err(Error::formula(expression, "dice must have at least one face"));
            }
            Term::Dice(sides)
        } else {
            let value: i64 = digits
                .parse()
                .map_err(|_| Error::formula(expression, format!("integer out of range: {}", digits)))?;
            Term::Constant(value)
        };

        terms.push((op, term));
    }

    Ok(terms)
}
