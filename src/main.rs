//! marcus - black-box HTTP API tests written as plain markdown
//!
//! Each `## ` heading in a markdown file is one test: a request line, optional
//! headers and body, assertions on the response and values saved for later
//! tests in the same file.

use clap::Parser;
use marcus::commands::RunArgs;
use marcus::common::logging;

#[derive(Parser)]
#[command(name = "marcus", about = "Run HTTP API tests written in markdown")]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    match marcus::cli::run(cli.run).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
