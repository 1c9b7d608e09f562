//! Call-recording, stubbing, and verification runtime embedded in every
//! generated mock.
//!
//! Generated members delegate to a [`MockCore`]: record the invocation into
//! the ledger, consult the stub table, and fall back to the instance's
//! missing-stub policy when nothing matches.

mod ledger;
mod stubs;
mod verify;

pub use ledger::{ArgValue, Invocation, InvocationLedger};
pub use stubs::{ArgMatcher, CallPattern, StubAnswer, StubResult, StubTable};
pub use verify::{verify, Cardinality, VerificationFailure};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether a failable constructor hands back a live instance or the absence
/// marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstructionPolicy {
    /// Failable constructors succeed like ordinary ones.
    Succeed,
    /// Failable constructors indicate failure; the instance they return is
    /// marked absent.
    Fail,
}

/// What a mock does when a member needing a return value has no matching stub.
///
/// This is explicit per instance; a silent wrong answer is worse than a loud
/// missing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingStubPolicy {
    /// Return a deterministic default when the return type has a safe one.
    ReturnDefault,
    /// Report every unstubbed call as an error.
    Fail,
}

/// Error surfaced by a mock at call time.
#[derive(Clone, Debug, PartialEq)]
pub enum MockRuntimeError {
    /// No stub matched and no safe default exists for the return type.
    MissingStub { member: String, type_name: String },
    /// A stub declared a thrown error for this call.
    Stubbed(String),
}

impl fmt::Display for MockRuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockRuntimeError::MissingStub { member, type_name } => write!(
                f,
                "no stub registered for `{member}` on `{type_name}` and no safe default exists"
            ),
            MockRuntimeError::Stubbed(message) => write!(f, "stubbed error: {message}"),
        }
    }
}

impl std::error::Error for MockRuntimeError {}

/// Shared state of one mock instance: ledger, stub table, and policy.
#[derive(Debug)]
pub struct MockCore {
    type_name: String,
    ledger: InvocationLedger,
    stubs: StubTable,
    policy: MissingStubPolicy,
    construction: ConstructionPolicy,
    absent: AtomicBool,
}

impl MockCore {
    #[must_use]
    pub fn new(type_name: impl Into<String>, policy: MissingStubPolicy) -> Self {
        Self::with_construction(type_name, policy, ConstructionPolicy::Succeed)
    }

    #[must_use]
    pub fn with_construction(
        type_name: impl Into<String>,
        policy: MissingStubPolicy,
        construction: ConstructionPolicy,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            ledger: InvocationLedger::new(),
            stubs: StubTable::new(),
            policy,
            construction,
            absent: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// True when a failable constructor must hand back the absence marker
    /// instead of a live instance.
    #[must_use]
    pub fn construction_indicates_failure(&self) -> bool {
        self.construction == ConstructionPolicy::Fail
    }

    /// Turn this core into the absence marker a failable constructor returns
    /// on failure. The instance stays structurally complete.
    pub fn mark_absent(&self) {
        self.absent.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.absent.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn policy(&self) -> MissingStubPolicy {
        self.policy
    }

    /// Record one invocation. Returns its sequence number.
    pub fn record(&self, member: &str, args: Vec<ArgValue>) -> u64 {
        tracing::trace!(target: "mock", mock = %self.type_name, member, "recorded invocation");
        self.ledger.record(member, args)
    }

    /// Resolve the result of an invocation after it was recorded.
    ///
    /// `declared_return` is the rendered return type, or `None` for members
    /// returning nothing. Unstubbed void members always succeed.
    ///
    /// # Errors
    /// Returns [`MockRuntimeError::Stubbed`] when the matching stub throws,
    /// and [`MockRuntimeError::MissingStub`] when no stub matches and the
    /// policy cannot supply a default.
    pub fn answer(
        &self,
        member: &str,
        args: &[ArgValue],
        declared_return: Option<&str>,
    ) -> Result<Option<ArgValue>, MockRuntimeError> {
        match self.stubs.find(member, args) {
            Some(StubResult::Value(value)) => Ok(Some(value)),
            Some(StubResult::Error(message)) => Err(MockRuntimeError::Stubbed(message)),
            None => {
                let Some(return_type) = declared_return else {
                    return Ok(None);
                };
                let missing = || MockRuntimeError::MissingStub {
                    member: member.to_owned(),
                    type_name: self.type_name.clone(),
                };
                match self.policy {
                    MissingStubPolicy::ReturnDefault => ArgValue::default_for(return_type)
                        .map(Some)
                        .ok_or_else(missing),
                    MissingStubPolicy::Fail => Err(missing()),
                }
            }
        }
    }

    /// Register a stub. Later registrations shadow earlier matching ones.
    pub fn stub(&self, pattern: CallPattern, answer: StubAnswer) {
        self.stubs.register(pattern, answer);
    }

    /// Verify recorded calls against a pattern and cardinality.
    ///
    /// # Errors
    /// Returns a [`VerificationFailure`] describing the actual call count and
    /// near misses when the cardinality is not met.
    pub fn verify(
        &self,
        pattern: &CallPattern,
        expected: Cardinality,
    ) -> Result<(), VerificationFailure> {
        verify(&self.ledger.snapshot(), pattern, expected)
    }

    /// Snapshot of the ledger for inspection in tests.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.ledger.snapshot()
    }

    /// Clear the invocation ledger. Stubs are kept; use
    /// [`MockCore::clear_stubs`] to drop them too.
    pub fn reset(&self) {
        self.ledger.reset();
    }

    pub fn clear_stubs(&self) {
        self.stubs.reset();
    }
}
