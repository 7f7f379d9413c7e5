use alloy::primitives::{Address, U256};
use anyhow::{Context, Result, bail};

use super::ensure_allowance;
use crate::chain::SwapperCall;
use crate::context::HarnessContext;
use crate::error::HarnessError;
use crate::model::{SwapRequest, swap::MIN_OUT_PLACEHOLDER};

pub const MAX_FUNDING_ATTEMPTS: usize = 3;

/// Largest single wrap when the gas token is ETH or BTC denominated (5 units).
const MAX_TOPUP_WEI: u128 = 5_000_000_000_000_000_000;

/// Swap `gas_amount` of wrapped native gas into `asset` for the deployer.
///
/// Each attempt wraps gas, quotes `WGAS → asset`, and tries the routes in order
/// through the Swapper (whitelisting router and tokens as needed) until one
/// delivers a positive amount. Gives up after `MAX_FUNDING_ATTEMPTS`. No route
/// at all is fatal immediately. Returns the amount received.
pub async fn fund_account(ctx: &HarnessContext, asset: Address, gas_amount: U256) -> Result<U256> {
    let swapper = ctx.swapper().context("Swapper is not materialized")?;
    let wgas = ctx
        .addresses
        .token("WGAS")?
        .context("no WGAS token in the address book")?;
    let payer = ctx.deployer();
    let before = ctx.chain.balance_of(asset, payer).await?;

    if asset == wgas {
        wrap(ctx, wgas, gas_amount).await?;
        let after = ctx.chain.balance_of(asset, payer).await?;
        return Ok(after.saturating_sub(before));
    }

    for attempt in 1..=MAX_FUNDING_ATTEMPTS {
        match swap_once(ctx, swapper, wgas, asset, gas_amount, before).await {
            Ok(received) if received > U256::ZERO => {
                tracing::info!(%asset, %received, attempt, "funded");
                return Ok(received);
            }
            Ok(_) => tracing::warn!(%asset, attempt, "no route delivered any output"),
            Err(e)
                if matches!(
                    e.downcast_ref::<HarnessError>(),
                    Some(HarnessError::QuoteUnavailable { .. })
                ) =>
            {
                return Err(e);
            }
            Err(e) => tracing::warn!(%asset, attempt, "funding swap failed: {e:#}"),
        }
    }
    bail!("funding {asset} failed after {MAX_FUNDING_ATTEMPTS} attempts")
}

/// Wrap native gas, capped for ETH/BTC gas tokens.
async fn wrap(ctx: &HarnessContext, wgas: Address, amount: U256) -> Result<U256> {
    let (symbol, _) = ctx.chain.erc20_metadata(wgas).await?;
    let amount = if ["ETH", "BTC"].iter().any(|s| symbol.contains(s)) {
        amount.min(U256::from(MAX_TOPUP_WEI))
    } else {
        amount
    };
    let native = ctx.chain.native_balance(ctx.deployer()).await?;
    if native <= amount {
        bail!("native balance {native} does not cover wrapping {amount}");
    }
    ctx.chain.wrap_native(wgas, amount).await.context("wrapping gas")?;
    tracing::debug!(%amount, %symbol, "wrapped");
    Ok(amount)
}

async fn ensure_whitelisted(ctx: &HarnessContext, swapper: Address, accounts: &[Address]) -> Result<()> {
    for &account in accounts {
        if !ctx.chain.is_whitelisted(swapper, account).await? {
            tracing::info!(%account, "whitelisting");
            ctx.chain.add_to_whitelist(swapper, account).await?;
            if !ctx.chain.is_whitelisted(swapper, account).await? {
                bail!("{account} could not be whitelisted");
            }
        }
    }
    Ok(())
}

async fn swap_once(
    ctx: &HarnessContext,
    swapper: Address,
    wgas: Address,
    asset: Address,
    gas_amount: U256,
    before: U256,
) -> Result<U256> {
    let amount = wrap(ctx, wgas, gas_amount).await?;
    ensure_allowance(ctx, wgas, swapper, amount).await?;

    let payer = ctx.deployer();
    let request = SwapRequest {
        input: wgas,
        output: asset,
        amount_wei: amount,
        chain_id: ctx.chain_id(),
        payer,
        test_payer: ctx.test_payer(),
    };
    let routes = ctx.quotes.quote(&request).await?;
    if routes.is_empty() {
        return Err(HarnessError::QuoteUnavailable {
            input: wgas.to_string(),
            output: asset.to_string(),
        }
        .into());
    }

    for route in routes {
        let Some(router) = route.router else { continue };
        ensure_whitelisted(ctx, swapper, &[router, wgas, asset]).await?;
        let call = SwapperCall {
            input: wgas,
            output: asset,
            amount,
            min_out: U256::from(MIN_OUT_PLACEHOLDER),
            router,
            call_data: route.call_data.clone(),
        };
        if let Err(e) = ctx.chain.swapper_swap(swapper, &call).await {
            tracing::warn!(%router, "swap route failed: {e:#}");
            continue;
        }
        let received = ctx.chain.balance_of(asset, payer).await?.saturating_sub(before);
        if received > U256::ZERO {
            return Ok(received);
        }
    }
    Ok(U256::ZERO)
}
