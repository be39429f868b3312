//! The count invariant checked by the observer

use serde::{Deserialize, Serialize};
use std::fmt;

/// A failed observation of the not-DONE count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub expected: u64,
    pub observed: u64,
    /// Queries issued so far, the failing one included
    pub queries: u64,
}

impl Violation {
    /// Observations that matched before this one failed
    pub fn successful_observations(&self) -> u64 {
        self.queries.saturating_sub(1)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Found {} undone tasks, but expected {} (after {} queries, {} consistent)",
            self.observed,
            self.expected,
            self.queries,
            self.successful_observations()
        )
    }
}

/// "not-DONE count equals a constant" for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoneCountInvariant {
    expected: u64,
}

impl UndoneCountInvariant {
    pub fn new(expected: u64) -> Self {
        Self { expected }
    }

    pub fn expected(&self) -> u64 {
        self.expected
    }

    pub fn check(&self, observed: u64, queries: u64) -> Result<(), Violation> {
        if observed == self.expected {
            Ok(())
        } else {
            Err(Violation {
                expected: self.expected,
                observed,
                queries,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_count_passes() {
        assert!(UndoneCountInvariant::new(201).check(201, 7).is_ok());
    }

    #[test]
    fn mismatch_reports_expected_and_observed() {
        let violation = UndoneCountInvariant::new(201).check(200, 12).unwrap_err();
        assert_eq!(violation.expected, 201);
        assert_eq!(violation.observed, 200);
        assert_eq!(violation.successful_observations(), 11);
        assert_eq!(
            violation.to_string(),
            "Found 200 undone tasks, but expected 201 (after 12 queries, 11 consistent)"
        );
    }

    #[test]
    fn phantom_counts_are_violations_too() {
        assert!(UndoneCountInvariant::new(201).check(202, 1).is_err());
    }
}
