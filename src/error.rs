use thiserror::Error;

/// Failures the harness distinguishes from plain chain/transport errors.
///
/// Functions return `anyhow::Result` and raise these through `anyhow::Error::from`,
/// so callers can recover the variant with `err.downcast_ref::<HarnessError>()`.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Deployment of `{unit}` failed: {reason}")]
    Deployment { unit: String, reason: String },

    #[error("Deployment units form a dependency cycle: {units:?}")]
    DependencyCycle { units: Vec<String> },

    #[error("Unit `{unit}` depends on unknown unit `{dependency}`")]
    UnknownDependency { unit: String, dependency: String },

    #[error("No swap route found for {input} -> {output}")]
    QuoteUnavailable { input: String, output: String },

    #[error("{kind} {index} address mismatch: expected {expected}, on-chain {actual}")]
    StateMismatch {
        kind: String,
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("Flow `{flow}` did not satisfy its assertion")]
    AssertionFailure { flow: String },

    #[error("{count} input slots configured, at most {max} supported")]
    SlotOverflow { count: usize, max: usize },
}
