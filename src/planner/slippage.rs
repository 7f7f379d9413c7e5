use alloy::primitives::U256;

/// Denominator of every bound below.
pub const BOUND_BASIS: u64 = 100_000;

/// Amounts at or below this many base units are dust: never quoted, never liquidated.
pub const DUST_THRESHOLD: u64 = 10;

/// Harvest quotes `balance - balance / HARVEST_BUFFER_DIVISOR` (0.1% off).
pub const HARVEST_BUFFER_DIVISOR: u64 = 1_000;

/// Peg groups. Two assets in the same group form a stable pair.
const PEG_GROUPS: &[&[&str]] = &[
    &[
        "USDC", "USDC.E", "USDBC", "USDT", "DAI", "BUSD", "TUSD", "FRAX", "LUSD", "USDP", "GUSD",
        "SUSD", "MIM", "USDD", "CRVUSD", "GHO", "PYUSD", "FDUSD", "USDE", "XDAI", "WXDAI", "AXLUSDC",
    ],
    &["EURS", "EURT", "EURE", "AGEUR", "EURA", "EUROC", "EURC"],
    &[
        "ETH", "WETH", "STETH", "WSTETH", "RETH", "CBETH", "SFRXETH", "FRXETH", "WEETH", "EZETH",
    ],
    &["BTC", "WBTC", "BTCB", "TBTC", "CBBTC", "RENBTC", "SBTC"],
];

fn peg_group(symbol: &str) -> Option<usize> {
    let symbol = symbol.to_ascii_uppercase();
    PEG_GROUPS.iter().position(|g| g.contains(&symbol.as_str()))
}

/// True when both assets track the same peg.
pub fn is_stable_pair(a: &str, b: &str) -> bool {
    match (peg_group(a), peg_group(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a.eq_ignore_ascii_case(b),
    }
}

/// Tolerances applied when liquidating an input back into the underlying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlippagePolicy {
    /// Oracle-vs-market price deviation, in `BOUND_BASIS` units.
    pub derivation: u64,
    /// Execution-price deviation, in `BOUND_BASIS` units.
    pub slippage: u64,
}

impl SlippagePolicy {
    /// 0.1% derivation, 0.025% slippage.
    pub const STABLE: SlippagePolicy = SlippagePolicy {
        derivation: 100,
        slippage: 25,
    };

    /// 1% derivation, 0.25% slippage.
    pub const VOLATILE: SlippagePolicy = SlippagePolicy {
        derivation: 1_000,
        slippage: 250,
    };

    pub fn for_pair(input: &str, underlying: &str) -> Self {
        if is_stable_pair(input, underlying) {
            Self::STABLE
        } else {
            Self::VOLATILE
        }
    }

    /// `amount * (1 + derivation)`, floored.
    pub fn inflate(&self, amount: U256) -> U256 {
        amount * U256::from(BOUND_BASIS + self.derivation) / U256::from(BOUND_BASIS)
    }

    /// `amount * (1 - slippage)`, floored.
    pub fn reduce(&self, amount: U256) -> U256 {
        amount * U256::from(BOUND_BASIS - self.slippage) / U256::from(BOUND_BASIS)
    }
}

/// Harvest swap input: the balance less a 0.1% buffer.
pub fn harvest_amount(balance: U256) -> U256 {
    balance - balance / U256::from(HARVEST_BUFFER_DIVISOR)
}

pub fn is_dust(amount: U256) -> bool {
    amount <= U256::from(DUST_THRESHOLD)
}
