//! Source verification through an Etherscan-compatible explorer API.

use std::collections::BTreeMap;

use alloy::hex;
use alloy::primitives::{Address, Bytes};
use anyhow::{Context, Result, bail};
use serde::Deserialize;

use super::artifacts::{Artifact, BuildInfo};

/// Etherscan's multichain endpoint. The chain goes in the `chainid` query parameter.
pub const ETHERSCAN_API: &str = "https://api.etherscan.io/v2/api";

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    #[serde(default)]
    message: String,
    /// Submission guid on success, the reason otherwise.
    #[serde(default)]
    result: String,
}

/// Submits standard-JSON sources for deployed contracts.
pub struct ExplorerVerifier {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    chain_id: u64,
}

impl ExplorerVerifier {
    pub fn new(api_url: Option<&str>, api_key: String, chain_id: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .user_agent("strat-harness/0.1")
            .build()
            .context("creating explorer HTTP client")?;
        Ok(ExplorerVerifier {
            client,
            api_url: api_url.unwrap_or(ETHERSCAN_API).to_string(),
            api_key,
            chain_id,
        })
    }

    /// Submit `address` for verification. Returns the explorer's submission guid, or
    /// its message when the contract is already verified.
    pub async fn submit(
        &self,
        artifact: &Artifact,
        build: &BuildInfo,
        address: Address,
        libraries: &BTreeMap<String, Address>,
        constructor_args: &Bytes,
    ) -> Result<String> {
        let input = standard_input(build, artifact, libraries)?;
        let form = verification_form(
            &self.api_key,
            artifact,
            build,
            address,
            &input,
            constructor_args,
        )?;
        tracing::debug!(contract = %artifact.contract_name, %address, "submitting verification");

        let resp = self
            .client
            .post(&self.api_url)
            .query(&[("chainid", self.chain_id.to_string())])
            .form(&form)
            .send()
            .await
            .context("explorer verification request failed")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("explorer API error {status}: {body}");
        }
        let body = resp
            .json::<ExplorerResponse>()
            .await
            .context("parsing explorer response")?;
        accepted(body)
    }
}

fn accepted(body: ExplorerResponse) -> Result<String> {
    if body.status == "1" {
        return Ok(body.result);
    }
    if body.result.to_lowercase().contains("already verified") {
        return Ok(body.result);
    }
    bail!("explorer rejected verification: {} ({})", body.result, body.message)
}

/// The build's compiler input with the linked library addresses filled in.
pub fn standard_input(
    build: &BuildInfo,
    artifact: &Artifact,
    libraries: &BTreeMap<String, Address>,
) -> Result<serde_json::Value> {
    let mut input = build.input.clone();
    let mut linked = serde_json::Map::new();
    for (source, libs) in &artifact.link_references {
        let mut per_source = serde_json::Map::new();
        for lib in libs.keys() {
            let addr = libraries
                .get(lib)
                .with_context(|| format!("{} links {lib}, which has no address", artifact.contract_name))?;
            per_source.insert(lib.clone(), format!("{addr:?}").into());
        }
        linked.insert(source.clone(), per_source.into());
    }
    if !linked.is_empty() {
        let settings = input
            .get_mut("settings")
            .and_then(|s| s.as_object_mut())
            .context("build info input has no settings")?;
        settings.insert("libraries".to_string(), linked.into());
    }
    Ok(input)
}

/// Form fields of a `verifysourcecode` submission.
pub fn verification_form(
    api_key: &str,
    artifact: &Artifact,
    build: &BuildInfo,
    address: Address,
    input: &serde_json::Value,
    constructor_args: &Bytes,
) -> Result<Vec<(&'static str, String)>> {
    if artifact.source_name.is_empty() {
        bail!("artifact {} has no sourceName", artifact.contract_name);
    }
    Ok(vec![
        ("apikey", api_key.to_string()),
        ("module", "contract".to_string()),
        ("action", "verifysourcecode".to_string()),
        ("codeformat", "solidity-standard-json-input".to_string()),
        ("sourceCode", serde_json::to_string(input)?),
        ("contractaddress", format!("{address:?}")),
        ("contractname", format!("{}:{}", artifact.source_name, artifact.contract_name)),
        ("compilerversion", format!("v{}", build.solc_long_version)),
        // the API's own spelling
        ("constructorArguements", hex::encode(constructor_args)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> Artifact {
        serde_json::from_str(
            r#"{
                "contractName": "StrategyV5Agent",
                "sourceName": "src/abstract/StrategyV5Agent.sol",
                "bytecode": "0x00",
                "linkReferences": {
                    "src/libs/AsAccounting.sol": { "AsAccounting": [ { "start": 2, "length": 20 } ] }
                }
            }"#,
        )
        .unwrap()
    }

    fn build() -> BuildInfo {
        serde_json::from_str(
            r#"{
                "solcLongVersion": "0.8.25+commit.b61c2a91",
                "input": {
                    "language": "Solidity",
                    "sources": {},
                    "settings": { "optimizer": { "enabled": true, "runs": 200 } }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_standard_input_carries_linked_libraries() {
        let lib = Address::repeat_byte(0xab);
        let libs = BTreeMap::from([("AsAccounting".to_string(), lib)]);

        let input = standard_input(&build(), &artifact(), &libs).unwrap();

        assert_eq!(
            input["settings"]["libraries"]["src/libs/AsAccounting.sol"]["AsAccounting"],
            format!("{lib:?}")
        );
        assert_eq!(input["settings"]["optimizer"]["runs"], 200);
        assert!(standard_input(&build(), &artifact(), &BTreeMap::new()).is_err());
    }

    #[test]
    fn test_verification_form_fields() {
        let address = Address::repeat_byte(0x01);
        let args = Bytes::from(vec![0x12, 0x34]);

        let form = verification_form("KEY", &artifact(), &build(), address, &build().input, &args).unwrap();
        let field = |name: &str| form.iter().find(|(k, _)| *k == name).map(|(_, v)| v.as_str());

        assert_eq!(field("contractname"), Some("src/abstract/StrategyV5Agent.sol:StrategyV5Agent"));
        assert_eq!(field("compilerversion"), Some("v0.8.25+commit.b61c2a91"));
        assert_eq!(field("constructorArguements"), Some("1234"));
        assert_eq!(field("codeformat"), Some("solidity-standard-json-input"));
    }

    #[test]
    fn test_already_verified_is_accepted() {
        let ok = |status: &str, result: &str| {
            accepted(ExplorerResponse {
                status: status.into(),
                message: String::new(),
                result: result.into(),
            })
        };
        assert_eq!(ok("1", "guid-1").unwrap(), "guid-1");
        assert!(ok("0", "Contract source code already verified").is_ok());
        assert!(ok("0", "Fail - Unable to verify").is_err());
    }
}
