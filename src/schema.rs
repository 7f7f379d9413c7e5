use schemars::schema_for;

use crate::config::SuiteConfig;

/// Generate and print the JSON Schema for `SuiteConfig`.
pub fn run() -> anyhow::Result<()> {
    let schema = schema_for!(SuiteConfig);
    let json = serde_json::to_string_pretty(&schema)?;
    println!("{json}");
    Ok(())
}
