//! Print what a PDF's info dictionary contains and how it normalizes.
//!
//! Read-only: nothing is sent to the document service.

use std::cell::RefCell;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use clap::Parser;
use owo_colors::OwoColorize;
use pdfmeta_core::metadata::ISO_FORMAT;
use pdfmeta_core::{PdfSource, SyncEvent, normalize, parse_pdf_date};
use tracing_subscriber::EnvFilter;

/// Inspect the document info dictionary of a PDF
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the PDF to inspect
    pdf_path: PathBuf,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let color = !cli.no_color && std::io::stdout().is_terminal();
    let mut w = std::io::stdout().lock();
    let source = PdfSource::Path(cli.pdf_path);

    let raw = pdfmeta_ingest::read_raw_info(&source)
        .map_err(|e| anyhow::anyhow!("{}: {}", source.display_name(), e))?;

    heading(&mut w, "Info dictionary", color)?;
    writeln!(w, "{}", serde_json::to_string_pretty(&raw)?)?;
    writeln!(w)?;

    let problems = RefCell::new(Vec::new());
    let metadata = normalize(&raw, &|event: SyncEvent| {
        if let SyncEvent::Failure(err) = event {
            problems.borrow_mut().push(err.to_string());
        }
    });

    heading(&mut w, "Normalized", color)?;
    let keywords = metadata.keywords.as_ref().map(|k| format!("{k:?}"));
    for (label, value) in [
        ("author", metadata.author.clone()),
        ("title", metadata.title.clone()),
        ("created", metadata.created_iso()),
        ("keywords", keywords),
    ] {
        writeln!(w, "  {:<9} {}", label, value.as_deref().unwrap_or("-"))?;
    }
    writeln!(w)?;

    heading(&mut w, "CreationDate", color)?;
    match raw.get("CreationDate") {
        Some(value) => {
            writeln!(w, "  raw       {value:?}")?;
            match creation_date_iso(value) {
                Ok(parsed) => writeln!(w, "  parsed    {parsed}")?,
                Err(reason) if color => writeln!(w, "  error     {}", reason.red())?,
                Err(reason) => writeln!(w, "  error     {reason}")?,
            }
        }
        None => writeln!(w, "  (not present)")?,
    }

    for problem in problems.into_inner() {
        tracing::warn!(problem = %problem, "normalization problem");
    }
    Ok(())
}

fn heading(w: &mut dyn Write, title: &str, color: bool) -> std::io::Result<()> {
    if color {
        writeln!(w, "{}", title.bold().cyan())
    } else {
        writeln!(w, "{title}")
    }
}

/// `CreationDate` in the same form `created` is sent to the service.
fn creation_date_iso(value: &str) -> Result<String, String> {
    parse_pdf_date(value).map(|dt| dt.format(ISO_FORMAT).to_string())
}
