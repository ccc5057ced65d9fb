use anyhow::Result;
use clap::{Parser, Subcommand};
use scopus_hal::{normalize, resolve};

#[derive(Parser)]
#[command(name = "scopus-hal")]
#[command(about = "Resolve author affiliation strings against the HAL structure referential")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve affiliations for a document dump and write reports plus cache
    Resolve(resolve::ResolveArgs),
    /// Show how an affiliation string is normalized and segmented
    Normalize {
        /// Raw affiliation string
        affiliation: String,

        /// Country name or 2-letter code, if known
        #[arg(short, long)]
        country: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }

    match cli.command {
        Commands::Resolve(args) => resolve::run(args),
        Commands::Normalize {
            affiliation,
            country,
        } => {
            let code = country.as_deref().and_then(scopus_hal::country::to_alpha2);
            let prepared = normalize::preprocess(&affiliation, code);
            println!("normalized: {prepared}");
            for (i, unit) in normalize::segment(&prepared).iter().rev().enumerate() {
                println!("unit {}: {}", i + 1, unit);
            }
            Ok(())
        }
    }
}
