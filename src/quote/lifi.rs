use alloy::hex;
use alloy::primitives::{Address, Bytes, U256};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::Deserialize;

use super::QuoteProvider;
use crate::model::{SwapRequest, SwapRoute};

pub const LIFI_API_BASE: &str = "https://li.quest/v1";

/// Slippage sent to the aggregator. The strategy enforces its own bounds.
const DEFAULT_SLIPPAGE: f64 = 0.005;

// ── LiFi API response types ───────────────────────────────────────

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    action: Option<QuoteAction>,
    estimate: QuoteEstimate,
    #[serde(rename = "transactionRequest")]
    transaction_request: Option<TransactionRequest>,
}

#[derive(Debug, Deserialize)]
struct QuoteAction {
    #[serde(rename = "fromToken")]
    from_token: Option<TokenInfo>,
    #[serde(rename = "toToken")]
    to_token: Option<TokenInfo>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    decimals: u8,
}

#[derive(Debug, Deserialize)]
struct QuoteEstimate {
    #[serde(rename = "fromAmount")]
    from_amount: Option<String>,
    #[serde(rename = "toAmount")]
    to_amount: String,
}

#[derive(Debug, Deserialize)]
struct TransactionRequest {
    to: String,
    data: String,
}

// ── LiFi quotes ───────────────────────────────────────────────────

/// `QuoteProvider` backed by the LiFi `/quote` endpoint.
pub struct LiFiQuotes {
    client: reqwest::Client,
    api_base: String,
    slippage: f64,
}

impl LiFiQuotes {
    pub fn new(api_base: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("strat-harness/0.1")
            .build()
            .context("creating LiFi HTTP client")?;
        Ok(LiFiQuotes {
            client,
            api_base: api_base.unwrap_or(LIFI_API_BASE).trim_end_matches('/').to_string(),
            slippage: DEFAULT_SLIPPAGE,
        })
    }

    fn url(&self, request: &SwapRequest) -> String {
        // LiFi does not simulate, so test_payer is not forwarded.
        format!(
            "{}/quote?\
            fromChain={chain}&\
            toChain={chain}&\
            fromToken={:?}&\
            toToken={:?}&\
            fromAmount={}&\
            fromAddress={:?}&\
            toAddress={:?}&\
            slippage={}",
            self.api_base,
            request.input,
            request.output,
            request.amount_wei,
            request.payer,
            request.payer,
            self.slippage,
            chain = request.chain_id,
        )
    }
}

#[async_trait]
impl QuoteProvider for LiFiQuotes {
    async fn quote(&self, request: &SwapRequest) -> Result<Vec<SwapRoute>> {
        let url = self.url(request);
        tracing::debug!(%url, "LiFi quote");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("LiFi quote request failed")?;

        // 404 is LiFi's "no available quotes"
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!(input = %request.input, output = %request.output, "LiFi returned no route");
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("LiFi API error {status}: {body}");
        }

        let quote = resp
            .json::<QuoteResponse>()
            .await
            .context("parsing LiFi quote response")?;
        Ok(route_from_quote(quote, request.amount_wei)?.into_iter().collect())
    }
}

fn route_from_quote(quote: QuoteResponse, amount_in: U256) -> Result<Option<SwapRoute>> {
    let Some(tx) = quote.transaction_request else {
        return Ok(None);
    };
    let router: Address = tx
        .to
        .parse()
        .map_err(|e| anyhow!("bad LiFi tx.to '{}': {e}", tx.to))?;
    let call_data = Bytes::from(
        hex::decode(tx.data.trim_start_matches("0x")).context("bad LiFi tx.data")?,
    );
    let to_amount: U256 = quote
        .estimate
        .to_amount
        .parse()
        .with_context(|| format!("bad LiFi toAmount '{}'", quote.estimate.to_amount))?;
    let from_amount: U256 = match quote.estimate.from_amount.as_deref() {
        Some(raw) => raw.parse().unwrap_or(amount_in),
        None => amount_in,
    };

    let (from_decimals, to_decimals) = quote
        .action
        .as_ref()
        .map(|a| {
            (
                a.from_token.as_ref().map_or(0, |t| t.decimals),
                a.to_token.as_ref().map_or(0, |t| t.decimals),
            )
        })
        .unwrap_or((0, 0));

    Ok(Some(SwapRoute {
        router: Some(router),
        call_data,
        estimated_output_wei: to_amount,
        estimated_exchange_rate: exchange_rate(from_amount, from_decimals, to_amount, to_decimals),
    }))
}

/// Output units per input unit, decimals-adjusted.
fn exchange_rate(from: U256, from_decimals: u8, to: U256, to_decimals: u8) -> f64 {
    let from = from.saturating_to::<u128>() as f64 / 10f64.powi(from_decimals as i32);
    let to = to.saturating_to::<u128>() as f64 / 10f64.powi(to_decimals as i32);
    if from == 0.0 { 0.0 } else { to / from }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTE: &str = r#"{
        "action": {
            "fromToken": { "decimals": 6, "symbol": "USDT" },
            "toToken": { "decimals": 6, "symbol": "USDC" }
        },
        "estimate": { "fromAmount": "30000000", "toAmount": "29985000", "approvalAddress": "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE" },
        "transactionRequest": { "to": "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE", "data": "0xdeadbeef", "value": "0x0" }
    }"#;

    #[test]
    fn test_route_from_quote() {
        let quote: QuoteResponse = serde_json::from_str(QUOTE).unwrap();
        let route = route_from_quote(quote, U256::from(30_000_000u64)).unwrap().unwrap();
        assert_eq!(route.estimated_output_wei, U256::from(29_985_000u64));
        assert_eq!(route.call_data.as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
        assert!(!route.is_identity());
        assert!((route.estimated_exchange_rate - 0.9995).abs() < 1e-9);
    }

    #[test]
    fn test_quote_without_transaction_is_no_route() {
        let quote: QuoteResponse =
            serde_json::from_str(r#"{ "estimate": { "toAmount": "1" } }"#).unwrap();
        assert!(route_from_quote(quote, U256::from(1u64)).unwrap().is_none());
    }

    #[test]
    fn test_url_carries_payer_and_amount() {
        let lifi = LiFiQuotes::new(Some("http://localhost:9/v1/")).unwrap();
        let url = lifi.url(&SwapRequest {
            input: Address::repeat_byte(1),
            output: Address::repeat_byte(2),
            amount_wei: U256::from(42u64),
            chain_id: 10,
            payer: Address::repeat_byte(3),
            test_payer: None,
        });
        assert!(url.starts_with("http://localhost:9/v1/quote?fromChain=10&toChain=10"));
        assert!(url.contains("fromAmount=42"));
        assert!(url.contains(&format!("fromAddress={:?}", Address::repeat_byte(3))));
    }
}
