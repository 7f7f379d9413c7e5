use alloy::primitives::{Address, U256};

/// An ERC20 resolved on-chain. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    pub wei_per_unit: U256,
}

impl Token {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Token {
            address,
            symbol: symbol.into(),
            decimals,
            wei_per_unit: U256::from(10u64).pow(U256::from(decimals)),
        }
    }

    /// Human amount → base units.
    pub fn to_wei(&self, amount: f64) -> U256 {
        if amount <= 0.0 || !amount.is_finite() {
            return U256::ZERO;
        }
        // Split so 18-decimal tokens do not lose the integer part to f64 precision.
        let whole = amount.trunc();
        let frac = amount - whole;
        let whole_wei = U256::from(whole as u128) * self.wei_per_unit;
        let frac_wei = U256::from((frac * 10f64.powi(self.decimals as i32)).round() as u128);
        whole_wei + frac_wei
    }

    /// Base units → human amount.
    pub fn to_amount(&self, wei: U256) -> f64 {
        let whole = wei / self.wei_per_unit;
        let rem = wei % self.wei_per_unit;
        let whole: u128 = whole.saturating_to();
        let rem: u128 = rem.saturating_to();
        whole as f64 + rem as f64 / 10f64.powi(self.decimals as i32)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol)
    }
}
