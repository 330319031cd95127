use anyhow::Result;
use clap::Command;
use tracing_subscriber::EnvFilter;

mod cmd;
mod config;

fn cli() -> Command {
    Command::new("quill")
        .about("Render wiki pages and preview them in the browser")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(cmd::render::make_subcommand())
        .subcommand(cmd::serve::make_subcommand())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("render", args)) => cmd::render::execute(args),
        Some(("serve", args)) => cmd::serve::execute(args).await,
        _ => unreachable!("subcommand_required is set"),
    }
}
