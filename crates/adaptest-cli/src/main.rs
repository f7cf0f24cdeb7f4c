//! adaptest CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "adaptest", version, about = "Adaptive exam session engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate exam TOML files
    Validate {
        /// Path to exam file or directory
        #[arg(long)]
        exam: PathBuf,
    },

    /// Replay a scripted set of responses through an exam session
    Simulate {
        /// Path to the exam .toml file
        #[arg(long)]
        exam: PathBuf,

        /// Path to the response script .toml file
        #[arg(long)]
        responses: PathBuf,

        /// Starting difficulty (1-5, default from config)
        #[arg(long)]
        difficulty: Option<f64>,

        /// Directory to write the JSON session report to
        #[arg(long)]
        output: Option<PathBuf>,

        /// Submit the results to the configured grading service
        #[arg(long)]
        submit: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and example exam
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("adaptest=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { exam } => commands::validate::execute(exam),
        Commands::Simulate {
            exam,
            responses,
            difficulty,
            output,
            submit,
            config,
        } => commands::simulate::execute(exam, responses, difficulty, output, submit, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
