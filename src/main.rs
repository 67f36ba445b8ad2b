use clap::Parser;

use sso_proxy_config::cli::{Cli, execute_command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    execute_command(&cli)
}
