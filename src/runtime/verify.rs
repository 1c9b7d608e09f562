//! Verification of recorded calls against cardinality constraints.

use std::fmt;

use super::ledger::Invocation;
use super::stubs::CallPattern;

/// How many matching invocations a verification expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cardinality {
    Exactly(usize),
    AtLeast(usize),
    AtMost(usize),
    Never,
}

impl Cardinality {
    #[must_use]
    pub fn accepts(self, actual: usize) -> bool {
        match self {
            Cardinality::Exactly(expected) => actual == expected,
            Cardinality::AtLeast(expected) => actual >= expected,
            Cardinality::AtMost(expected) => actual <= expected,
            Cardinality::Never => actual == 0,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::Exactly(expected) => write!(f, "exactly {expected}"),
            Cardinality::AtLeast(expected) => write!(f, "at least {expected}"),
            Cardinality::AtMost(expected) => write!(f, "at most {expected}"),
            Cardinality::Never => f.write_str("never"),
        }
    }
}

/// Failed verification, carrying what actually happened for diagnosability.
#[derive(Clone, Debug)]
pub struct VerificationFailure {
    pub member: String,
    pub expected: Cardinality,
    pub actual: usize,
    /// Recorded calls to the same member whose arguments did not match.
    pub near_misses: Vec<Invocation>,
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected `{}` to be called {}, but it was called {} time(s)",
            self.member, self.expected, self.actual
        )?;
        if !self.near_misses.is_empty() {
            write!(f, "; similar calls:")?;
            for miss in &self.near_misses {
                write!(f, "\n  {miss}")?;
            }
        }
        Ok(())
    }
}

const NEAR_MISS_LIMIT: usize = 3;

/// Count ledger entries matching `pattern` and check them against `expected`.
///
/// # Errors
/// Returns a [`VerificationFailure`] carrying the actual count and up to
/// three near misses when `expected` rejects the matching count.
pub fn verify(
    entries: &[Invocation],
    pattern: &CallPattern,
    expected: Cardinality,
) -> Result<(), VerificationFailure> {
    let actual = entries
        .iter()
        .filter(|entry| pattern.matches(&entry.member, &entry.args))
        .count();
    if expected.accepts(actual) {
        return Ok(());
    }

    let near_misses: Vec<Invocation> = entries
        .iter()
        .filter(|entry| {
            entry.member == pattern.member && !pattern.matches(&entry.member, &entry.args)
        })
        .take(NEAR_MISS_LIMIT)
        .cloned()
        .collect();

    Err(VerificationFailure {
        member: pattern.member.clone(),
        expected,
        actual,
        near_misses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ledger::{ArgValue, InvocationLedger};

    fn ledger_with_three_matches() -> InvocationLedger {
        let ledger = InvocationLedger::new();
        for _ in 0..3 {
            ledger.record("ping(host:)", vec![ArgValue::Str("a".into())]);
        }
        ledger
    }

    #[test]
    fn cardinality_arithmetic_over_three_recorded_calls() {
        let ledger = ledger_with_three_matches();
        let entries = ledger.snapshot();
        let pattern = CallPattern::any("ping(host:)");

        assert!(verify(&entries, &pattern, Cardinality::Exactly(3)).is_ok());
        assert!(verify(&entries, &pattern, Cardinality::Exactly(4)).is_err());
        assert!(verify(&entries, &pattern, Cardinality::AtLeast(2)).is_ok());
        assert!(verify(&entries, &pattern, Cardinality::AtMost(3)).is_ok());
        assert!(verify(&entries, &pattern, Cardinality::Never).is_err());
    }

    #[test]
    fn failure_reports_actual_count_and_near_misses() {
        let ledger = InvocationLedger::new();
        ledger.record("ping(host:)", vec![ArgValue::Str("other".into())]);
        let entries = ledger.snapshot();

        let pattern = CallPattern::exact("ping(host:)", vec![ArgValue::Str("expected".into())]);
        let failure = verify(&entries, &pattern, Cardinality::Exactly(1)).unwrap_err();
        assert_eq!(failure.actual, 0);
        assert_eq!(failure.near_misses.len(), 1, "same member, different args");
        let rendered = failure.to_string();
        assert!(rendered.contains("exactly 1"));
        assert!(rendered.contains("similar calls"));
    }

    #[test]
    fn never_succeeds_on_untouched_member() {
        let ledger = ledger_with_three_matches();
        let entries = ledger.snapshot();
        let pattern = CallPattern::any("shutdown()");
        assert!(verify(&entries, &pattern, Cardinality::Never).is_ok());
    }
}
