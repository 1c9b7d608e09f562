//! Stub registration and lookup.
//!
//! Stubs are selected by call pattern. Registration order carries meaning:
//! when several registered patterns match an invocation, the most recently
//! registered one wins, so a test can progressively narrow behaviour.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use super::ledger::ArgValue;

/// Matcher for one argument position.
#[derive(Clone)]
pub enum ArgMatcher {
    Exact(ArgValue),
    Any,
    Predicate(Arc<dyn Fn(&ArgValue) -> bool + Send + Sync>),
}

impl ArgMatcher {
    #[must_use]
    pub fn matches(&self, value: &ArgValue) -> bool {
        match self {
            ArgMatcher::Exact(expected) => expected == value,
            ArgMatcher::Any => true,
            ArgMatcher::Predicate(predicate) => predicate(value),
        }
    }
}

impl fmt::Debug for ArgMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgMatcher::Exact(value) => write!(f, "Exact({value})"),
            ArgMatcher::Any => f.write_str("Any"),
            ArgMatcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Member identity plus per-argument matchers.
#[derive(Clone, Debug)]
pub struct CallPattern {
    pub member: String,
    /// Empty means "any arguments"; otherwise the arity must match exactly.
    pub matchers: Vec<ArgMatcher>,
}

impl CallPattern {
    /// Match any invocation of `member`, regardless of arguments.
    #[must_use]
    pub fn any(member: impl Into<String>) -> Self {
        Self {
            member: member.into(),
            matchers: Vec::new(),
        }
    }

    /// Match an invocation of `member` with exactly these argument values.
    #[must_use]
    pub fn exact(member: impl Into<String>, args: Vec<ArgValue>) -> Self {
        Self {
            member: member.into(),
            matchers: args.into_iter().map(ArgMatcher::Exact).collect(),
        }
    }

    #[must_use]
    pub fn with_matcher(mut self, matcher: ArgMatcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    #[must_use]
    pub fn matches(&self, member: &str, args: &[ArgValue]) -> bool {
        if self.member != member {
            return false;
        }
        if self.matchers.is_empty() {
            return true;
        }
        self.matchers.len() == args.len()
            && self
                .matchers
                .iter()
                .zip(args.iter())
                .all(|(matcher, value)| matcher.matches(value))
    }
}

/// Behaviour a stub supplies when its pattern matches.
#[derive(Clone)]
pub enum StubAnswer {
    /// Return a fixed value.
    Return(ArgValue),
    /// Compute a value from the actual arguments.
    Compute(Arc<dyn Fn(&[ArgValue]) -> ArgValue + Send + Sync>),
    /// Fail the call with the given error description.
    Throw(String),
}

impl fmt::Debug for StubAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StubAnswer::Return(value) => write!(f, "Return({value})"),
            StubAnswer::Compute(_) => f.write_str("Compute(..)"),
            StubAnswer::Throw(message) => write!(f, "Throw({message})"),
        }
    }
}

/// Resolved stub behaviour for one invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum StubResult {
    Value(ArgValue),
    Error(String),
}

/// Ordered stub registrations for one mock instance.
#[derive(Debug, Default)]
pub struct StubTable {
    stubs: Mutex<Vec<(CallPattern, StubAnswer)>>,
}

impl StubTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, pattern: CallPattern, answer: StubAnswer) {
        self.stubs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((pattern, answer));
    }

    /// Resolve the stub for an invocation. The most recently registered
    /// matching pattern wins.
    #[must_use]
    pub fn find(&self, member: &str, args: &[ArgValue]) -> Option<StubResult> {
        let stubs = self.stubs.lock().unwrap_or_else(PoisonError::into_inner);
        stubs
            .iter()
            .rev()
            .find(|(pattern, _)| pattern.matches(member, args))
            .map(|(_, answer)| match answer {
                StubAnswer::Return(value) => StubResult::Value(value.clone()),
                StubAnswer::Compute(compute) => StubResult::Value(compute(args)),
                StubAnswer::Throw(message) => StubResult::Error(message.clone()),
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stubs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every registration.
    pub fn reset(&self) {
        self.stubs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_registered_matching_stub_wins() {
        let table = StubTable::new();
        table.register(
            CallPattern::any("fetch(id:)"),
            StubAnswer::Return(ArgValue::Str("broad".into())),
        );
        table.register(
            CallPattern::exact("fetch(id:)", vec![ArgValue::Int(7)]),
            StubAnswer::Return(ArgValue::Str("narrow".into())),
        );

        // Both stubs match id 7; the later registration is selected.
        assert_eq!(
            table.find("fetch(id:)", &[ArgValue::Int(7)]),
            Some(StubResult::Value(ArgValue::Str("narrow".into())))
        );
        // Only the broad stub matches other ids.
        assert_eq!(
            table.find("fetch(id:)", &[ArgValue::Int(9)]),
            Some(StubResult::Value(ArgValue::Str("broad".into())))
        );
    }

    #[test]
    fn predicate_matchers_inspect_argument_values() {
        let table = StubTable::new();
        let pattern = CallPattern {
            member: "store(count:)".into(),
            matchers: vec![ArgMatcher::Predicate(Arc::new(|value| {
                matches!(value, ArgValue::Int(count) if *count > 10)
            }))],
        };
        table.register(pattern, StubAnswer::Return(ArgValue::Bool(true)));

        assert!(table.find("store(count:)", &[ArgValue::Int(11)]).is_some());
        assert!(table.find("store(count:)", &[ArgValue::Int(3)]).is_none());
    }

    #[test]
    fn computed_stubs_see_actual_arguments() {
        let table = StubTable::new();
        table.register(
            CallPattern::any("double(value:)"),
            StubAnswer::Compute(Arc::new(|args| match args.first() {
                Some(ArgValue::Int(value)) => ArgValue::Int(value * 2),
                _ => ArgValue::Opaque("unexpected".into()),
            })),
        );
        assert_eq!(
            table.find("double(value:)", &[ArgValue::Int(21)]),
            Some(StubResult::Value(ArgValue::Int(42)))
        );
    }

    #[test]
    fn throw_answers_surface_as_errors() {
        let table = StubTable::new();
        table.register(
            CallPattern::any("save()"),
            StubAnswer::Throw("disk full".into()),
        );
        assert_eq!(
            table.find("save()", &[]),
            Some(StubResult::Error("disk full".into()))
        );
    }

    #[test]
    fn arity_mismatch_never_matches_explicit_matchers() {
        let pattern = CallPattern::exact("pair(a:b:)", vec![ArgValue::Int(1), ArgValue::Int(2)]);
        assert!(!pattern.matches("pair(a:b:)", &[ArgValue::Int(1)]));
    }
}
