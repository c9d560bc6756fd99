use std::path::PathBuf;

use clap::Parser;
use pagecodec::{Encoding, PageCodecError, Result, RewriteConfig, rewrite_file};
use pagecodec_bin::{LogArgs, exit_code, parse_or_usage};
use tracing::{info, warn};

const USAGE: &str = "Arguments: <input file> <output file> <Page size> [delta]";

#[derive(Debug, Parser)]
#[clap(name = "pagerewrite")]
#[clap(version)]
#[clap(about = "Rewrite a page file using plain or delta value encoding", long_about = None)]
struct Cli {
    #[clap(flatten)]
    log: LogArgs,

    /// Page file to read.
    input: PathBuf,

    /// Destination, replaced if it exists.
    output: PathBuf,

    /// Max page size in bytes. Also used as the max rows per page.
    page_size: String,

    /// "delta" selects delta encoding, plain is used otherwise.
    encoding: Option<String>,
}

fn main() {
    let cli: Cli = parse_or_usage(USAGE);
    cli.log.init_logging();

    info!(version = env!("CARGO_PKG_VERSION"), "starting...");

    if let Err(e) = run(cli) {
        eprintln!("ERROR: {e}");
        std::process::exit(exit_code(&e));
    }
}

fn run(cli: Cli) -> Result<()> {
    let page_size: usize = cli.page_size.parse().map_err(|_| {
        PageCodecError::InvalidConfig(format!(
            "page size must be a non-negative integer, got '{}'",
            cli.page_size
        ))
    })?;

    let encoding = Encoding::from_cli_token(cli.encoding.as_deref());
    if let Some(token) = cli.encoding.as_deref().filter(|t| *t != "delta" && *t != "plain") {
        warn!(%token, "unrecognized encoding, using plain");
    }

    let config = RewriteConfig::new(page_size, encoding);
    let summary = rewrite_file(&cli.input, &cli.output, config)?;
    print!("{summary}");

    Ok(())
}
