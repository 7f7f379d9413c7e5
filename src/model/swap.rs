use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolValue;
use serde::Serialize;

/// `minAmountOut` sent with every leg. Slippage is priced into the amounts instead.
pub const MIN_OUT_PLACEHOLDER: u64 = 1;

/// One quote request, per slot per planning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub input: Address,
    pub output: Address,
    pub amount_wei: U256,
    pub chain_id: u64,
    /// Contract that will execute the swap.
    pub payer: Address,
    /// Funded account the provider may simulate with.
    pub test_payer: Option<Address>,
}

/// A candidate route. `router == None` with empty data is the identity route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapRoute {
    pub router: Option<Address>,
    pub call_data: Bytes,
    pub estimated_output_wei: U256,
    pub estimated_exchange_rate: f64,
}

impl SwapRoute {
    /// No swap: the slot already holds the target asset.
    pub fn identity(amount: U256) -> Self {
        SwapRoute {
            router: None,
            call_data: Bytes::new(),
            estimated_output_wei: amount,
            estimated_exchange_rate: 1.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.router.is_none()
    }
}

/// One `(router, minOut, data)` tuple of a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapLeg {
    pub router: Option<Address>,
    pub min_out: U256,
    pub call_data: Bytes,
    #[serde(skip)]
    pub route: Option<SwapRoute>,
}

impl SwapLeg {
    pub fn from_route(route: SwapRoute) -> Self {
        SwapLeg {
            router: route.router,
            min_out: U256::from(MIN_OUT_PLACEHOLDER),
            call_data: route.call_data.clone(),
            route: Some(route),
        }
    }

    /// `abi.encode(address router, uint256 minOut, bytes data)`; identity legs use the zero router.
    pub fn encode(&self) -> Bytes {
        let router = self.router.unwrap_or(Address::ZERO);
        (router, self.min_out, self.call_data.clone())
            .abi_encode_params()
            .into()
    }
}

/// Swap legs index-aligned with the strategy's inputs or reward tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EncodedSwapPlan {
    pub legs: Vec<SwapLeg>,
}

impl EncodedSwapPlan {
    pub fn push(&mut self, route: SwapRoute) {
        self.legs.push(SwapLeg::from_route(route));
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// The `bytes[]` argument the strategy expects.
    pub fn encode(&self) -> Vec<Bytes> {
        self.legs.iter().map(SwapLeg::encode).collect()
    }

    /// Concatenate two plans, `self` first (compound sends harvest legs then invest legs).
    pub fn chain(mut self, other: EncodedSwapPlan) -> EncodedSwapPlan {
        self.legs.extend(other.legs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_leg_encodes_zero_router() {
        let leg = SwapLeg::from_route(SwapRoute::identity(U256::from(5u64)));
        let encoded = leg.encode();
        let (router, min_out, data) =
            <(Address, U256, Bytes)>::abi_decode_params(&encoded).unwrap();
        assert_eq!(router, Address::ZERO);
        assert_eq!(min_out, U256::from(1u64));
        assert!(data.is_empty());
    }

    #[test]
    fn test_chain_keeps_order() {
        let mut harvest = EncodedSwapPlan::default();
        harvest.push(SwapRoute::identity(U256::ZERO));
        let mut invest = EncodedSwapPlan::default();
        invest.push(SwapRoute {
            router: Some(Address::repeat_byte(7)),
            call_data: Bytes::from(vec![1, 2, 3]),
            estimated_output_wei: U256::from(10u64),
            estimated_exchange_rate: 1.0,
        });
        let plan = harvest.chain(invest);
        assert_eq!(plan.len(), 2);
        assert!(plan.legs[0].router.is_none());
        assert_eq!(plan.legs[1].router, Some(Address::repeat_byte(7)));
    }
}
