use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use texforge_compiler::{
    HttpCompileProvider, HttpFixGenerator, Orchestrator, RepairPipeline, RepairSession,
    SourceDocument,
};

use crate::config::Config;

#[derive(Debug, Args)]
pub struct CompileArgs {
    /// Input .tex file
    pub input: PathBuf,

    /// Output PDF file (defaults to the input path with a .pdf extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Compile engine, overriding the config (pdflatex, xelatex, lualatex)
    #[arg(short, long)]
    pub engine: Option<String>,

    /// Automatic repair attempts, overriding the config
    #[arg(long, value_name = "N")]
    pub max_repairs: Option<u32>,

    /// Disable automatic repair on compile failure
    #[arg(long, conflicts_with = "max_repairs")]
    pub no_repair: bool,
}

pub async fn compile(args: CompileArgs, cwd: &str) -> Result<()> {
    if !args.input.exists() {
        return Err(anyhow!("Input file does not exist: {}", args.input.display()));
    }
    let config = Config::load(cwd)?;
    let engine = match &args.engine {
        Some(name) => name.parse()?,
        None => config.engine,
    };
    let raw = fs::read_to_string(&args.input)?;
    let doc = SourceDocument::new(raw, engine);

    println!(
        "{} {} ({engine})",
        "🔨 Compiling".bright_blue().bold(),
        args.input.display()
    );

    let orchestrator = Orchestrator::new(
        Box::new(HttpCompileProvider::new(
            "primary",
            config.primary_url.as_str(),
            config.timeout(),
        )),
        Box::new(HttpCompileProvider::new(
            "secondary",
            config.secondary_url.as_str(),
            config.timeout(),
        )),
    );
    let generator = HttpFixGenerator::new(config.fix_url.as_str(), config.timeout());
    let pipeline = RepairPipeline::new(orchestrator, generator);

    let budget = if args.no_repair {
        0
    } else {
        args.max_repairs.unwrap_or(config.max_repair_attempts)
    };
    let mut session = RepairSession::new(budget);

    match pipeline.compile_with_repair(&doc, &mut session).await {
        Ok(artifact) => {
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| args.input.with_extension("pdf"));
            fs::write(&output, &artifact.bytes)?;

            let repairs = session.attempts().len().saturating_sub(1);
            if repairs > 0 {
                println!(
                    "  {} repaired after {} attempt(s)",
                    "⚠".yellow(),
                    repairs
                );
            }
            println!(
                "{} {} ({} bytes)",
                "✓".green(),
                output.display(),
                artifact.len()
            );
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", "Compile log:".red().bold());
            eprintln!("{}", err.log().dimmed());
            Err(anyhow!(
                "compilation failed after {} attempt(s)",
                session.attempts().len()
            ))
        }
    }
}
