//! Command-line linter for pinned dependency manifests and documentation
//! outlines.

mod cli;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run()
}
