use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use texforge_compiler::{has_envelope, normalize as normalize_source, Engine};

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Input .tex file
    pub input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Compile engine (pdflatex, xelatex, lualatex)
    #[arg(short, long, default_value = "pdflatex")]
    pub engine: Engine,
}

pub fn normalize(args: NormalizeArgs, _cwd: &str) -> Result<()> {
    if !args.input.exists() {
        return Err(anyhow!("Input file does not exist: {}", args.input.display()));
    }
    let raw = fs::read_to_string(&args.input)?;

    let envelope_added = !has_envelope(&raw);
    let normalized = normalize_source(&raw, args.engine);

    match &args.output {
        Some(path) => {
            fs::write(path, &normalized.text)?;
            println!("{} {}", "✓".green(), path.display());
            if envelope_added {
                println!("  {}", "wrapped bare content in a document envelope".dimmed());
            }
        }
        None => println!("{}", normalized.text),
    }

    Ok(())
}
