use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use alloy::hex;
use alloy::primitives::{Address, Bytes};
use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Hardhat-format compilation artifact (only the fields deployment needs).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub contract_name: String,
    /// Source file the contract was compiled from.
    #[serde(default)]
    pub source_name: String,
    pub bytecode: String,
    /// source file → library name → placeholder positions.
    #[serde(default)]
    pub link_references: HashMap<String, HashMap<String, Vec<LinkReference>>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LinkReference {
    pub start: usize,
    pub length: usize,
}

impl Artifact {
    /// Libraries the bytecode has placeholders for.
    pub fn required_libraries(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .link_references
            .values()
            .flat_map(|libs| libs.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Splice library addresses into the bytecode. Every placeholder must be covered;
    /// extra libraries are ignored.
    pub fn link(&self, libraries: &BTreeMap<String, Address>) -> Result<Bytes> {
        let mut code = self.bytecode.trim_start_matches("0x").to_string();
        for libs in self.link_references.values() {
            for (lib, refs) in libs {
                let addr = libraries.get(lib).with_context(|| {
                    format!("{} needs library {lib}, which is not linked", self.contract_name)
                })?;
                let addr_hex = hex::encode(addr.as_slice());
                for r in refs {
                    let (start, end) = (r.start * 2, (r.start + r.length) * 2);
                    if end > code.len() || r.length != 20 {
                        bail!(
                            "{}: link reference for {lib} at {}..{} is out of range",
                            self.contract_name,
                            r.start,
                            r.start + r.length
                        );
                    }
                    code.replace_range(start..end, &addr_hex);
                }
            }
        }
        let bytes = hex::decode(&code)
            .with_context(|| format!("{}: bytecode is not valid hex after linking", self.contract_name))?;
        Ok(bytes.into())
    }
}

/// Compiler input of the build that produced an artifact.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// e.g. `0.8.25+commit.b61c2a91`.
    pub solc_long_version: String,
    /// Standard-JSON compiler input.
    pub input: serde_json::Value,
}

/// `<contract>.dbg.json`, pointing at the build info relative to itself.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: String,
}

/// Artifacts directory produced by the compiler toolchain.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ArtifactStore { root: root.into() }
    }

    /// Find `<contract>.json` anywhere under the root.
    pub fn load(&self, contract: &str) -> Result<Artifact> {
        let file_name = format!("{contract}.json");
        let path = find_file(&self.root, &file_name)?
            .with_context(|| format!("no artifact {file_name} under {}", self.root.display()))?;
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut artifact: Artifact = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        if artifact.contract_name.is_empty() {
            artifact.contract_name = contract.to_string();
        }
        Ok(artifact)
    }

    /// Build info of `contract`, found through its debug file.
    pub fn load_build_info(&self, contract: &str) -> Result<BuildInfo> {
        let file_name = format!("{contract}.dbg.json");
        let dbg_path = find_file(&self.root, &file_name)?
            .with_context(|| format!("no {file_name} under {}", self.root.display()))?;
        let dbg: DebugFile = serde_json::from_str(
            &std::fs::read_to_string(&dbg_path).with_context(|| format!("reading {}", dbg_path.display()))?,
        )
        .with_context(|| format!("parsing {}", dbg_path.display()))?;

        let dir = dbg_path.parent().unwrap_or(&self.root);
        let path = dir.join(&dbg.build_info);
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("reading build info {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("parsing build info {}", path.display()))
    }
}

fn find_file(dir: &Path, file_name: &str) -> Result<Option<PathBuf>> {
    let direct = dir.join(file_name);
    if direct.is_file() {
        return Ok(Some(direct));
    }
    if !dir.is_dir() {
        return Ok(None);
    }
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        // build-info holds the compiler input/output, not artifacts
        if path.is_dir() && path.file_name().is_some_and(|n| n != "build-info") {
            if let Some(found) = find_file(&path, file_name)? {
                return Ok(Some(found));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0x6080 + 20-byte placeholder + 0x00
    const ARTIFACT: &str = r#"{
        "contractName": "StrategyV5Agent",
        "sourceName": "src/abstract/StrategyV5Agent.sol",
        "bytecode": "0x6080__$0123456789abcdef0123456789abcdef01$__00",
        "linkReferences": {
            "src/libs/AsAccounting.sol": { "AsAccounting": [ { "start": 2, "length": 20 } ] }
        }
    }"#;

    #[test]
    fn test_link_splices_address() {
        let artifact: Artifact = serde_json::from_str(ARTIFACT).unwrap();
        assert_eq!(artifact.required_libraries(), vec!["AsAccounting".to_string()]);

        let lib = Address::repeat_byte(0xab);
        let libs = BTreeMap::from([("AsAccounting".to_string(), lib)]);
        let code = artifact.link(&libs).unwrap();
        assert_eq!(code.len(), 23);
        assert_eq!(&code[..2], &[0x60, 0x80]);
        assert_eq!(&code[2..22], lib.as_slice());
        assert_eq!(code[22], 0x00);
    }

    #[test]
    fn test_link_ignores_libraries_without_placeholders() {
        let artifact: Artifact = serde_json::from_str(ARTIFACT).unwrap();
        let lib = Address::repeat_byte(0xab);
        let exact = BTreeMap::from([("AsAccounting".to_string(), lib)]);
        let mut extra = exact.clone();
        extra.insert("AsMaths".to_string(), Address::repeat_byte(0xcd));

        assert_eq!(artifact.link(&extra).unwrap(), artifact.link(&exact).unwrap());
    }

    #[test]
    fn test_link_missing_library_fails() {
        let artifact: Artifact = serde_json::from_str(ARTIFACT).unwrap();
        let err = artifact.link(&BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("AsAccounting"));
    }

    #[test]
    fn test_store_finds_nested_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("src/StrategyV5Agent.sol");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("StrategyV5Agent.json"), ARTIFACT).unwrap();

        let store = ArtifactStore::new(dir.path());
        let artifact = store.load("StrategyV5Agent").unwrap();
        assert_eq!(artifact.contract_name, "StrategyV5Agent");
        assert!(store.load("Missing").is_err());
    }

    #[test]
    fn test_store_follows_debug_file_to_build_info() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("src/StrategyV5Agent.sol");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir_all(dir.path().join("build-info")).unwrap();
        std::fs::write(
            nested.join("StrategyV5Agent.dbg.json"),
            r#"{ "_format": "hh-sol-dbg-1", "buildInfo": "../../build-info/ab12.json" }"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("build-info/ab12.json"),
            r#"{ "solcLongVersion": "0.8.25+commit.b61c2a91", "input": { "language": "Solidity" } }"#,
        )
        .unwrap();

        let build = ArtifactStore::new(dir.path()).load_build_info("StrategyV5Agent").unwrap();
        assert_eq!(build.solc_long_version, "0.8.25+commit.b61c2a91");
        assert_eq!(build.input["language"], "Solidity");
    }
}
