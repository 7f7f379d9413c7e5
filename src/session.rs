//! Entry points for the on-chain commands: `deploy`, `plan` and `run`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};

use crate::chain::artifacts::ArtifactStore;
use crate::chain::evm::AlloyChain;
use crate::chain::verify::ExplorerVerifier;
use crate::cli::{ChainArgs, PlanOp};
use crate::config::{RuntimeConfig, SuiteConfig};
use crate::context::HarnessContext;
use crate::model::{AddressBook, StrategyDeployment};
use crate::quote::LiFiQuotes;
use crate::{deploy, flow, ops, planner};

/// A connected harness plus the address book it writes back to.
struct Session {
    ctx: HarnessContext,
    suite: SuiteConfig,
    runtime: RuntimeConfig,
    book: AddressBook,
}

impl Session {
    async fn open(suite_path: &Path, args: &ChainArgs) -> Result<Self> {
        let suite = crate::validate::load_and_validate(suite_path).map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow!("Suite validation failed:\n  {}", msgs.join("\n  "))
        })?;
        let runtime = RuntimeConfig::from_cli(args)?;
        let chain = runtime.chain(&suite);

        let book = if runtime.address_book.exists() {
            AddressBook::load(&runtime.address_book)?
        } else {
            tracing::warn!(
                path = %runtime.address_book.display(),
                "address book not found, starting empty"
            );
            AddressBook::default()
        };
        let addresses = book.network(chain.chain_id()).cloned().unwrap_or_default();

        let mut adapter = AlloyChain::connect(
            &chain,
            &runtime.private_key,
            ArtifactStore::new(runtime.artifacts_dir.clone()),
        )
        .await?;
        if let Some(key) = &runtime.explorer_key {
            let verifier = ExplorerVerifier::new(runtime.explorer_api.as_deref(), key.clone(), chain.chain_id())?;
            adapter = adapter.with_verifier(verifier);
        }
        let quotes = LiFiQuotes::new(runtime.quote_api.as_deref())?;
        let ctx = HarnessContext::new(Arc::new(adapter), Arc::new(quotes), addresses);

        println!("=== strat-harness ===");
        println!("Suite:    {}", suite.name);
        println!("Chain:    {chain}");
        println!("Signer:   {}", ctx.deployer());
        println!("Strategy: {} ({})", suite.strategy.name, suite.strategy.symbol);
        println!();

        Ok(Session {
            ctx,
            suite,
            runtime,
            book,
        })
    }

    /// Write addresses recorded during this session back to the address book.
    fn save_addresses(&mut self) -> Result<()> {
        *self.book.network_mut(self.ctx.chain_id()) = self.ctx.addresses.clone();
        self.book
            .save(&self.runtime.address_book)
            .with_context(|| format!("saving {}", self.runtime.address_book.display()))
    }

    async fn setup(&mut self) -> Result<StrategyDeployment> {
        let result = ops::setup_strategy(&mut self.ctx, &self.suite.strategy, self.runtime.verify).await;
        // keep whatever got deployed, even when a later setup step failed
        self.save_addresses()?;
        result
    }
}

fn block_on<F: std::future::Future<Output = Result<()>>>(fut: F) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    rt.block_on(fut)
}

fn print_deployment(dep: &StrategyDeployment) {
    println!("Deployed {} at {}", dep.name, dep.strategy());
    for unit in dep.units.values() {
        let status = if unit.deployed { "deployed" } else { "bound" };
        println!("  {:<24} {} ({status})", unit.name, unit.address);
    }
}

/// Entry point for the `deploy` command.
pub fn deploy(suite_path: &Path, args: &ChainArgs) -> Result<()> {
    block_on(async {
        let mut session = Session::open(suite_path, args).await?;
        let dep = session.setup().await?;
        print_deployment(&dep);
        Ok(())
    })
}

/// Entry point for the `plan` command. Binds the stack without sending transactions
/// beyond any missing deployment.
pub fn plan(suite_path: &Path, op: PlanOp, amount: f64, args: &ChainArgs) -> Result<()> {
    block_on(async {
        let mut session = Session::open(suite_path, args).await?;
        let verify = session.runtime.verify;
        let dep = deploy::deploy_strategy(&mut session.ctx, &session.suite.strategy, verify).await?;
        session.save_addresses()?;

        let ctx = &session.ctx;
        let wei = dep.underlying.to_wei(amount);
        let json = match op {
            PlanOp::Invest => serde_json::to_string_pretty(&planner::plan_invest(ctx, &dep, wei).await?)?,
            PlanOp::Liquidate => {
                serde_json::to_string_pretty(&planner::plan_liquidate(ctx, &dep, wei).await?)?
            }
            PlanOp::Harvest => serde_json::to_string_pretty(&planner::plan_harvest(ctx, &dep).await?)?,
        };
        println!("{json}");
        Ok(())
    })
}

/// Entry point for the `run` command. Fails when any flow failed.
pub fn run(suite_path: &Path, output: Option<&PathBuf>, args: &ChainArgs) -> Result<()> {
    block_on(async {
        let mut session = Session::open(suite_path, args).await?;
        let dep = session.setup().await?;
        print_deployment(&dep);
        let report = flow::run_suite(&mut session.ctx, &session.suite, &dep).await?;
        println!();
        report.print_summary();
        if let Some(path) = output {
            report.save(path)?;
            println!("Report written to {}", path.display());
        }
        report.ensure_passed()
    })
}
