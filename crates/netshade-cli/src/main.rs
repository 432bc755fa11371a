mod cli;
mod logging;
mod ops;
mod render;
mod theme;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    logging::init(cli.verbose)?;
    ops::run(cli)
}
