// Entry point: parse arguments, install logging, run the chosen command.
//
// All computation lives in the library crate; this binary only wires
// command-line options to it and prints or exports the results.
mod cli;

use clap::Parser;
use cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(cli.log_level())
        .with_target(false)
        .init();
    cli.run()
}
