use super::ValidationError;
use crate::config::FundingRequest;
use crate::flow::Flow;
use crate::ops::Operation;

fn check_amount(field: String, value: f64) -> Option<ValidationError> {
    (!value.is_finite() || value < 0.0).then_some(ValidationError::InvalidAmount { field, value })
}

pub fn check_funding(requests: &[FundingRequest]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (i, request) in requests.iter().enumerate() {
        if request.asset.trim().is_empty() {
            errors.push(ValidationError::Empty {
                field: "funding.asset",
            });
        }
        errors.extend(check_amount(format!("funding[{i}].amount"), request.amount));
    }
    errors
}

pub fn check_flows(flows: &[Flow]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (i, flow) in flows.iter().enumerate() {
        let amount = match &flow.operation {
            Operation::SeedLiquidity { amount }
            | Operation::Deposit { amount }
            | Operation::Liquidate { amount }
            | Operation::Withdraw { amount }
            | Operation::RequestWithdraw { amount } => Some(*amount),
            Operation::SwapDeposit { input, amount } => {
                if input.trim().is_empty() {
                    errors.push(ValidationError::Empty {
                        field: "swap_deposit.input",
                    });
                }
                Some(*amount)
            }
            Operation::Invest { amount } => *amount,
            Operation::Harvest | Operation::Compound => None,
        };
        if let Some(amount) = amount {
            errors.extend(check_amount(
                format!("flows[{i}] {}", flow.operation.name()),
                amount,
            ));
        }
    }
    errors
}
