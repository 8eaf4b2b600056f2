//! Three-valued logic.

use std::fmt;
use std::ops::Not;

/// Result of evaluating a predicate: SQL's TRUE / FALSE / UNKNOWN.
///
/// Kept distinct from `bool` so UNKNOWN can never be silently read as FALSE
/// (or TRUE) at a call site; callers decide admission with [`Truth::is_true`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Truth {
    /// Predicate holds.
    True,
    /// Predicate does not hold.
    False,
    /// Predicate involved a NULL and cannot be decided.
    Unknown,
}

impl Truth {
    /// Returns `true` only for [`Truth::True`]; WHERE and ON admit on this alone.
    pub fn is_true(self) -> bool {
        matches!(self, Truth::True)
    }

    /// Kleene conjunction.
    pub fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Unknown,
        }
    }

    /// Kleene disjunction.
    pub fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Unknown,
        }
    }
}

impl Not for Truth {
    type Output = Truth;

    fn not(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }
}

impl From<bool> for Truth {
    fn from(value: bool) -> Self {
        if value {
            Truth::True
        } else {
            Truth::False
        }
    }
}

impl fmt::Display for Truth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Truth::True => "TRUE",
            Truth::False => "FALSE",
            Truth::Unknown => "UNKNOWN",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Truth::{self, False, True, Unknown};

    #[test]
    fn conjunction_table() {
        assert_eq!(False.and(Unknown), False);
        assert_eq!(Unknown.and(False), False);
        assert_eq!(Unknown.and(True), Unknown);
        assert_eq!(True.and(True), True);
    }

    #[test]
    fn disjunction_table() {
        assert_eq!(True.or(Unknown), True);
        assert_eq!(Unknown.or(False), Unknown);
        assert_eq!(False.or(False), False);
    }

    #[test]
    fn negation_keeps_unknown() {
        assert_eq!(!Unknown, Unknown);
        assert_eq!(!True, False);
        assert!(!Truth::Unknown.is_true());
    }
}
