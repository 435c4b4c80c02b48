mod cli;

use clap::Parser;

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt::init();

  let cli = cli::Cli::parse();
  cli.run()
}
