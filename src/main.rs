use anyhow::Result;
use clap::Parser;
use cropplan::{CLIArguments, export_main, plan_main};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cropplan=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = CLIArguments::parse();

    match args {
        CLIArguments::Plan(args) => plan_main(args),
        CLIArguments::Export(args) => export_main(args),
    }
}
