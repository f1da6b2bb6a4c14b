use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use texforge_preview::{render, to_html, to_page};

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Input .tex file
    pub input: PathBuf,

    /// Output HTML file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Emit only the document fragment, without the page shell
    #[arg(long)]
    pub fragment: bool,
}

pub fn preview(args: PreviewArgs, _cwd: &str) -> Result<()> {
    if !args.input.exists() {
        return Err(anyhow!("Input file does not exist: {}", args.input.display()));
    }
    let source = fs::read_to_string(&args.input)?;

    // render() is total: malformed input yields a tree with error markers
    let tree = render(&source);
    let html = if args.fragment {
        to_html(&tree)
    } else {
        let title = args
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("preview");
        to_page(title, &tree)
    };

    match &args.output {
        Some(path) => {
            fs::write(path, html)?;
            println!(
                "{} {} → {}",
                "✓".green(),
                args.input.display(),
                path.display()
            );
        }
        None => println!("{html}"),
    }

    Ok(())
}
