mod flows;
mod strategy;

use std::path::Path;

use thiserror::Error;

use crate::config::SuiteConfig;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("`{field}` must not be empty")]
    Empty { field: &'static str },

    #[error("Strategy has {count} inputs, at most {max} are supported")]
    TooManyInputs { count: usize, max: usize },

    #[error("Input `{symbol}` is listed more than once")]
    DuplicateInput { symbol: String },

    #[error("{weights} input weights given for {inputs} inputs")]
    TooManyWeights { weights: usize, inputs: usize },

    #[error("Input weights sum to {sum} bps, more than 10000")]
    WeightsExceedTotal { sum: u32 },

    #[error("`{field}` has {actual} entries, expected one per input ({expected})")]
    CountMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Fee `{fee}` is {value} bps, more than 10000")]
    FeeTooHigh { fee: &'static str, value: u64 },

    #[error("`{field}` is not valid hex: `{value}`")]
    InvalidHex { field: &'static str, value: String },

    #[error("`{field}` must be a finite, non-negative number, got {value}")]
    InvalidAmount { field: String, value: f64 },
}

/// Load and fully validate a suite from a JSON file.
pub fn load_and_validate(path: &Path) -> Result<SuiteConfig, Vec<ValidationError>> {
    let contents = std::fs::read_to_string(path).map_err(|e| vec![ValidationError::Io(e)])?;
    let suite: SuiteConfig =
        serde_json::from_str(&contents).map_err(|e| vec![ValidationError::Json(e)])?;
    validate(&suite)?;
    Ok(suite)
}

/// Validate a suite, collecting all errors.
pub fn validate(suite: &SuiteConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if suite.name.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "name" });
    }
    errors.extend(strategy::check_identity(&suite.strategy));
    errors.extend(strategy::check_inputs(&suite.strategy));
    errors.extend(strategy::check_fees(&suite.strategy));
    errors.extend(strategy::check_oracle(&suite.strategy));
    errors.extend(flows::check_funding(&suite.funding));
    errors.extend(flows::check_flows(&suite.flows));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// CLI entry point for the `validate` subcommand.
pub fn run(path: &Path) -> anyhow::Result<()> {
    match load_and_validate(path) {
        Ok(suite) => {
            println!(
                "Suite '{}' is valid. Strategy {} with {} inputs, {} flows{}.",
                suite.name,
                suite.strategy.symbol,
                suite.strategy.inputs.len(),
                suite.flows.len(),
                if suite.flows.is_empty() { " (default suite)" } else { "" }
            );
            Ok(())
        }
        Err(errors) => {
            eprintln!("Validation failed with {} error(s):", errors.len());
            for (i, e) in errors.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, e);
            }
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suite(strategy: serde_json::Value, flows: serde_json::Value) -> SuiteConfig {
        serde_json::from_value(serde_json::json!({
            "name": "test",
            "chain": { "name": "anvil", "chain_id": 56 },
            "strategy": strategy,
            "flows": flows,
        }))
        .unwrap()
    }

    fn strategy() -> serde_json::Value {
        serde_json::json!({
            "name": "Astrolab Primitive Venus USD",
            "symbol": "apXVS.USD",
            "contract": "VenusMultiStake",
            "underlying": "USDC",
            "inputs": ["USDC", "USDT"],
            "input_weights": [5000, 4500],
        })
    }

    #[test]
    fn test_valid_suite() {
        let s = suite(strategy(), serde_json::json!([{ "op": "deposit", "amount": 5 }]));
        assert!(validate(&s).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut bad = strategy();
        bad["inputs"] = serde_json::json!(["USDC", "USDC"]);
        bad["input_weights"] = serde_json::json!([6000, 5000, 1000]);
        bad["fees"] = serde_json::json!({ "perf": 20000 });
        bad["protocol_params"] = serde_json::json!("0xzz");
        let s = suite(bad, serde_json::json!([{ "op": "withdraw", "amount": -1.0 }]));

        let errors = validate(&s).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::DuplicateInput { symbol } if symbol == "USDC")));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::TooManyWeights { weights: 3, inputs: 2 })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::WeightsExceedTotal { sum: 12000 })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::FeeTooHigh { fee: "perf", .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidHex { field: "protocol_params", .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidAmount { .. })));
    }

    #[test]
    fn test_too_many_inputs() {
        let mut bad = strategy();
        bad["inputs"] = serde_json::json!(["A", "B", "C", "D", "E", "F", "G", "H", "I"]);
        bad["input_weights"] = serde_json::json!([]);
        let errors = validate(&suite(bad, serde_json::json!([]))).unwrap_err();
        assert!(matches!(errors[0], ValidationError::TooManyInputs { count: 9, max: 8 }));
    }

    #[test]
    fn test_pyth_ids() {
        let mut s = strategy();
        s["oracle"] = serde_json::json!({
            "family": "pyth",
            "pyth": "oracles.Pyth",
            "underlying_pyth_id": format!("0x{}", "ab".repeat(32)),
            "input_pyth_ids": ["0x1234"],
        });
        let errors = validate(&suite(s, serde_json::json!([]))).unwrap_err();
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(errors.iter().any(|e| matches!(e, ValidationError::CountMismatch { field: "input_pyth_ids", .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidHex { field: "input_pyth_ids", .. })));
    }

    #[test]
    fn test_load_and_validate_missing_file() {
        let errors = load_and_validate(Path::new("/nonexistent/suite.json")).unwrap_err();
        assert!(matches!(errors[0], ValidationError::Io(_)));
    }
}
