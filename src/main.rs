use clap::Parser;

use strat_harness::cli::{self, Command};
use strat_harness::{logging, schema, session, validate};

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    logging::init(&cli.log_level, cli.log_json);

    match cli.command {
        Command::Schema => schema::run(),
        Command::Validate { file } => validate::run(&file),
        Command::Deploy { file, chain } => session::deploy(&file, &chain),
        Command::Plan {
            file,
            op,
            amount,
            chain,
        } => session::plan(&file, op, amount, &chain),
        Command::Run {
            file,
            output,
            chain,
        } => session::run(&file, output.as_ref(), &chain),
    }
}
