mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{compile, normalize, preview, CompileArgs, NormalizeArgs, PreviewArgs};
use tracing_subscriber::EnvFilter;

/// Texforge CLI - LaTeX preview and remote compilation
#[derive(Parser, Debug)]
#[command(name = "texforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a .tex file to an HTML preview
    Preview(PreviewArgs),

    /// Sanitize source and wrap bare content in a document envelope
    Normalize(NormalizeArgs),

    /// Compile a .tex file to PDF via the remote providers
    Compile(CompileArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Preview(args) => preview(args, &cwd),
        Command::Normalize(args) => normalize(args, &cwd),
        Command::Compile(args) => compile(args, &cwd).await,
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
