use std::collections::HashSet;

use super::ValidationError;
use crate::config::{OracleConfig, StrategyConfig};
use crate::model::{Fees, MAX_SLOTS};

const BPS_TOTAL: u64 = 10_000;

pub fn check_identity(cfg: &StrategyConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (field, value) in [
        ("strategy.name", &cfg.name),
        ("strategy.symbol", &cfg.symbol),
        ("strategy.contract", &cfg.contract),
        ("strategy.underlying", &cfg.underlying),
    ] {
        if value.trim().is_empty() {
            errors.push(ValidationError::Empty { field });
        }
    }
    if let Some(params) = &cfg.protocol_params {
        if !is_hex(params, None) {
            errors.push(ValidationError::InvalidHex {
                field: "protocol_params",
                value: params.clone(),
            });
        }
    }
    if !cfg.min_liquidity_usd.is_finite() || cfg.min_liquidity_usd < 0.0 {
        errors.push(ValidationError::InvalidAmount {
            field: "strategy.min_liquidity_usd".into(),
            value: cfg.min_liquidity_usd,
        });
    }
    errors
}

/// Slot capacity, uniqueness, weights and per-input lists.
pub fn check_inputs(cfg: &StrategyConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let n = cfg.inputs.len();

    if n == 0 {
        errors.push(ValidationError::Empty { field: "strategy.inputs" });
    }
    if n > MAX_SLOTS {
        errors.push(ValidationError::TooManyInputs {
            count: n,
            max: MAX_SLOTS,
        });
    }

    let mut seen = HashSet::new();
    for input in &cfg.inputs {
        if !seen.insert(input.as_str()) {
            errors.push(ValidationError::DuplicateInput {
                symbol: input.clone(),
            });
        }
    }

    if cfg.input_weights.len() > n {
        errors.push(ValidationError::TooManyWeights {
            weights: cfg.input_weights.len(),
            inputs: n,
        });
    }
    let sum: u32 = cfg.input_weights.iter().map(|&w| u32::from(w)).sum();
    if u64::from(sum) > BPS_TOTAL {
        errors.push(ValidationError::WeightsExceedTotal { sum });
    }

    if !cfg.lp_tokens.is_empty() && cfg.lp_tokens.len() != n {
        errors.push(ValidationError::CountMismatch {
            field: "lp_tokens",
            expected: n,
            actual: cfg.lp_tokens.len(),
        });
    }
    errors
}

/// Every merged fee must fit in 100%.
pub fn check_fees(cfg: &StrategyConfig) -> Vec<ValidationError> {
    let fees = Fees::default().merge(&cfg.fees);
    [
        ("perf", fees.perf),
        ("mgmt", fees.mgmt),
        ("entry", fees.entry),
        ("exit", fees.exit),
    ]
    .into_iter()
    .filter(|&(_, value)| value > BPS_TOTAL)
    .map(|(fee, value)| ValidationError::FeeTooHigh { fee, value })
    .collect()
}

pub fn check_oracle(cfg: &StrategyConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let n = cfg.inputs.len();
    match &cfg.oracle {
        OracleConfig::None => {}
        OracleConfig::Chainlink {
            input_price_feeds, ..
        } => {
            if input_price_feeds.len() != n {
                errors.push(ValidationError::CountMismatch {
                    field: "input_price_feeds",
                    expected: n,
                    actual: input_price_feeds.len(),
                });
            }
        }
        OracleConfig::Pyth {
            underlying_pyth_id,
            input_pyth_ids,
            ..
        } => {
            if input_pyth_ids.len() != n {
                errors.push(ValidationError::CountMismatch {
                    field: "input_pyth_ids",
                    expected: n,
                    actual: input_pyth_ids.len(),
                });
            }
            if !is_hex(underlying_pyth_id, Some(32)) {
                errors.push(ValidationError::InvalidHex {
                    field: "underlying_pyth_id",
                    value: underlying_pyth_id.clone(),
                });
            }
            for id in input_pyth_ids.iter().filter(|id| !is_hex(id, Some(32))) {
                errors.push(ValidationError::InvalidHex {
                    field: "input_pyth_ids",
                    value: id.clone(),
                });
            }
        }
    }
    errors
}

/// `0x`-optional hex, optionally of an exact byte length.
fn is_hex(value: &str, bytes: Option<usize>) -> bool {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    digits.len() % 2 == 0
        && digits.chars().all(|c| c.is_ascii_hexdigit())
        && bytes.is_none_or(|b| digits.len() == b * 2)
}
