mod cli;
mod config;
mod core;
mod error;
mod models;
mod sources;

use clap::Parser;

fn main() {
    let cli = cli::Cli::parse();
    let debug = cli.debug;
    cli::init_logging(debug);

    if let Err(e) = cli::run(cli) {
        if debug {
            eprintln!("error: {:?}", e);
        } else {
            eprintln!("error: {:#}", e);
        }
        std::process::exit(1);
    }
}
