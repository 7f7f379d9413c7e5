pub mod runner;
pub mod suite;

use std::sync::Arc;

use alloy::primitives::U256;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ops::Operation;

pub use runner::{FlowOutcome, FlowRunner, FlowState};
pub use suite::{SuiteReport, default_suite, fund, run_flows, run_suite};

/// Predicate over an operation's result. `None` means execution failed.
pub type AssertFn = dyn Fn(Option<U256>) -> bool + Send + Sync;

/// What a flow expects from its operation.
#[derive(Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assertion {
    /// The operation completed.
    #[default]
    Succeeds,
    /// The operation completed with a nonzero result.
    Positive,
    AtLeast { min: u64 },
    /// In-code predicate. Not representable in suite files.
    #[serde(skip)]
    #[schemars(skip)]
    Custom(Arc<AssertFn>),
}

impl Assertion {
    pub fn custom(f: impl Fn(Option<U256>) -> bool + Send + Sync + 'static) -> Self {
        Assertion::Custom(Arc::new(f))
    }

    pub fn check(&self, result: Option<U256>) -> bool {
        match self {
            Assertion::Succeeds => result.is_some(),
            Assertion::Positive => result.is_some_and(|r| r > U256::ZERO),
            Assertion::AtLeast { min } => result.is_some_and(|r| r >= U256::from(*min)),
            Assertion::Custom(f) => f(result),
        }
    }
}

impl std::fmt::Debug for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Assertion::Succeeds => write!(f, "Succeeds"),
            Assertion::Positive => write!(f, "Positive"),
            Assertion::AtLeast { min } => write!(f, "AtLeast({min})"),
            Assertion::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// One operation wrapped with time travel, state rollback and an assertion.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Flow {
    #[serde(flatten)]
    pub operation: Operation,
    /// Seconds to advance the chain clock before running. Simulated chains only.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub elapsed_seconds: u64,
    /// Restore the pre-flow state afterwards. Simulated chains only.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub revert: bool,
    #[serde(default)]
    pub assertion: Assertion,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

impl Flow {
    pub fn new(operation: Operation) -> Self {
        Flow {
            operation,
            elapsed_seconds: 0,
            revert: false,
            assertion: Assertion::default(),
        }
    }

    pub fn after(mut self, seconds: u64) -> Self {
        self.elapsed_seconds = seconds;
        self
    }

    pub fn reverted(mut self) -> Self {
        self.revert = true;
        self
    }

    pub fn expect(mut self, assertion: Assertion) -> Self {
        self.assertion = assertion;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assertions() {
        assert!(Assertion::Succeeds.check(Some(U256::ZERO)));
        assert!(!Assertion::Succeeds.check(None));
        assert!(!Assertion::Positive.check(Some(U256::ZERO)));
        assert!(Assertion::AtLeast { min: 5 }.check(Some(U256::from(5u64))));
        let even = Assertion::custom(|r| r.is_some_and(|v| v.bit(0) == false));
        assert!(even.check(Some(U256::from(4u64))));
        assert!(!even.check(None));
    }

    #[test]
    fn test_flow_json() {
        let flow: Flow = serde_json::from_str(
            r#"{ "op": "harvest", "elapsed_seconds": 604800, "revert": true, "assertion": { "kind": "positive" } }"#,
        )
        .unwrap();
        assert_eq!(flow.operation, Operation::Harvest);
        assert_eq!(flow.elapsed_seconds, 604_800);
        assert!(flow.revert);
        assert!(matches!(flow.assertion, Assertion::Positive));

        let flow: Flow = serde_json::from_str(r#"{ "op": "deposit", "amount": 10 }"#).unwrap();
        assert_eq!(flow.operation, Operation::Deposit { amount: 10.0 });
        assert!(!flow.revert);
        assert!(matches!(flow.assertion, Assertion::Succeeds));
    }
}
