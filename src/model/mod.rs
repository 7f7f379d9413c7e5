pub mod address_book;
pub mod chain;
pub mod deployment;
pub mod params;
pub mod swap;
pub mod token;
pub mod unit;

pub use address_book::{AddressBook, NetworkAddresses};
pub use chain::Chain;
pub use deployment::StrategyDeployment;
pub use params::{BaseParams, Erc20Metadata, FeeOverrides, Fees, InitParams, OracleParams};
pub use swap::{EncodedSwapPlan, SwapLeg, SwapRequest, SwapRoute};
pub use token::Token;
pub use unit::{DeployableUnit, LibraryRole, MaterializedUnit, UnitKind};

/// Capacity of the strategy's per-input amount arrays (`uint256[8]`).
pub const MAX_SLOTS: usize = 8;

/// Per-slot amounts as the strategy returns and accepts them.
pub type SlotAmounts = [alloy::primitives::U256; MAX_SLOTS];
