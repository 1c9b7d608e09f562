//! Append-only record of calls made against a mock instance.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Argument value captured at a call site, or an opaque token for values the
/// runtime cannot compare structurally.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Opaque(String),
}

impl ArgValue {
    /// Deterministic default for a declared return type, when one is safe.
    ///
    /// Optional-typed returns default to an absent marker; reference types
    /// with no obvious zero value return `None` and force the caller to
    /// consult its missing-stub policy.
    #[must_use]
    pub fn default_for(type_name: &str) -> Option<ArgValue> {
        if type_name.starts_with("Optional<") || type_name.ends_with('?') {
            return Some(ArgValue::Opaque("none".into()));
        }
        match type_name {
            "Bool" => Some(ArgValue::Bool(false)),
            "Int" | "Int8" | "Int16" | "Int32" | "Int64" | "UInt" => Some(ArgValue::Int(0)),
            "Float" | "Double" => Some(ArgValue::Float(0.0)),
            "String" => Some(ArgValue::Str(String::new())),
            "Void" | "()" => Some(ArgValue::Opaque("void".into())),
            _ if type_name.starts_with("Array<") || type_name.starts_with("Dictionary<") => {
                Some(ArgValue::Opaque("empty".into()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Bool(value) => write!(f, "{value}"),
            ArgValue::Int(value) => write!(f, "{value}"),
            ArgValue::Float(value) => write!(f, "{value}"),
            ArgValue::Str(value) => write!(f, "{value:?}"),
            ArgValue::Opaque(token) => write!(f, "<{token}>"),
        }
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.into())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Str(value)
    }
}

/// One recorded call: member identity, captured arguments, sequence number.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Invocation {
    pub member: String,
    pub args: Vec<ArgValue>,
    pub sequence: u64,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        write!(f, "#{} {}({})", self.sequence, self.member, args.join(", "))
    }
}

/// Ordered, append-only sequence of recorded invocations.
///
/// Interior mutability keeps recording usable from `&self` mock methods;
/// entries are only removed by an explicit [`InvocationLedger::reset`].
#[derive(Debug, Default)]
pub struct InvocationLedger {
    entries: Mutex<Vec<Invocation>>,
    next_sequence: AtomicU64,
}

impl InvocationLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call record and return its sequence number.
    pub fn record(&self, member: impl Into<String>, args: Vec<ArgValue>) -> u64 {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let invocation = Invocation {
            member: member.into(),
            args,
            sequence,
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invocation);
        sequence
    }

    /// Copy of the recorded entries, in recording order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Invocation> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every recorded entry. Sequence numbers keep counting upward so
    /// records from before and after a reset stay distinguishable.
    pub fn reset(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_preserve_order_and_sequence() {
        let ledger = InvocationLedger::new();
        ledger.record("first()", vec![]);
        ledger.record("second(count:)", vec![ArgValue::Int(2)]);

        let entries = ledger.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].member, "first()");
        assert_eq!(entries[1].args, vec![ArgValue::Int(2)]);
        assert!(entries[0].sequence < entries[1].sequence);
    }

    #[test]
    fn reset_clears_entries_but_not_sequence() {
        let ledger = InvocationLedger::new();
        ledger.record("call()", vec![]);
        ledger.reset();
        assert!(ledger.is_empty());

        let sequence = ledger.record("call()", vec![]);
        assert!(sequence > 0, "sequence numbers survive a reset");
    }

    #[test]
    fn safe_defaults_cover_value_types_only() {
        assert_eq!(ArgValue::default_for("Bool"), Some(ArgValue::Bool(false)));
        assert_eq!(ArgValue::default_for("Int"), Some(ArgValue::Int(0)));
        assert_eq!(
            ArgValue::default_for("String"),
            Some(ArgValue::Str(String::new()))
        );
        assert_eq!(
            ArgValue::default_for("Optional<Session>"),
            Some(ArgValue::Opaque("none".into()))
        );
        assert_eq!(ArgValue::default_for("Session"), None);
    }
}
