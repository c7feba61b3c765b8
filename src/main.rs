use clap::Parser;
use user_record_store::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli::commands::run(cli).await
}
