use clap::Parser;

use neuro_resonator::cli::{execute, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    execute(cli)
}
