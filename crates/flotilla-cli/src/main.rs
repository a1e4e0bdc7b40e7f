//! Flotilla CLI - deploy a fleet of Helm releases in dependency-ordered waves

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod error;
mod exit_codes;

use commands::plan::PlanSection;

#[derive(Parser)]
#[command(name = "flotilla")]
#[command(author = "Flotilla Contributors")]
#[command(version)]
#[command(about = "Deploy a fleet of Helm releases in dependency-ordered waves", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a plan file template (flotilla.yml.tpl -> flotilla.yml)
    Render {
        /// Template path
        #[arg(short = 'f', long, default_value = "flotilla.yml.tpl")]
        file: PathBuf,

        /// Output path
        #[arg(short, long, default_value = "flotilla.yml")]
        output: PathBuf,
    },

    /// Validate the plan and show what would run
    Plan {
        /// Plan file path
        #[arg(short = 'f', long, default_value = "flotilla.yml")]
        file: PathBuf,

        /// Restrict to releases carrying any of these tags (plus their dependencies)
        #[arg(short, long)]
        tags: Vec<String>,

        /// Section to print
        #[arg(long, value_enum, default_value_t = PlanSection::All)]
        only: PlanSection,
    },

    /// Deploy the plan
    Up {
        /// Plan file path
        #[arg(short = 'f', long, default_value = "flotilla.yml")]
        file: PathBuf,

        /// Restrict to releases carrying any of these tags (plus their dependencies)
        #[arg(short, long)]
        tags: Vec<String>,

        /// Run against a scripted executor instead of helm
        #[arg(long)]
        dry_run: bool,

        /// Bound the number of releases running concurrently within a wave
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Print flotilla version
    Version,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Render { file, output } => commands::render::run(&file, &output),

        Commands::Plan { file, tags, only } => commands::plan::run(&file, &tags, only),

        Commands::Up {
            file,
            tags,
            dry_run,
            workers,
        } => commands::up::run(&file, &tags, dry_run, workers).await,

        Commands::Version => {
            println!("flotilla {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }

    Ok(())
}
