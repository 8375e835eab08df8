use crate::config::RouterConfig;
use crate::manifest::{check_artifact, collect, write_artifact};
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "restmount-gen")]
#[command(about = "Route manifest generator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the configured route roots and write the registration artifact
    Generate {
        /// Routing configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Output path for the generated artifact
        #[arg(short, long)]
        output: PathBuf,

        /// Verify the committed artifact is current instead of writing
        #[arg(long, default_value_t = false)]
        check: bool,
    },
    /// Print the discovered route table
    Inspect {
        /// Routing configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Generate {
            config,
            output,
            check,
        } => {
            let config = RouterConfig::from_file(config)?;
            let routes = collect(&config)?;
            if *check {
                if !check_artifact(&routes, output)? {
                    bail!(
                        "artifact {} is stale, re-run restmount-gen generate",
                        output.display()
                    );
                }
                println!("artifact {} is up to date", output.display());
            } else {
                write_artifact(&routes, output)?;
                println!(
                    "wrote {} route(s) to {}",
                    routes.len(),
                    output.display()
                );
            }
            Ok(())
        }
        Commands::Inspect { config } => {
            let config = RouterConfig::from_file(config)?;
            let routes = collect(&config)?;
            println!("[routes] count={}", routes.len());
            for route in &routes {
                println!(
                    "[route] {} {} -> {}.{}",
                    route.method, route.http_path, route.module_path, route.handler
                );
            }
            Ok(())
        }
    }
}
