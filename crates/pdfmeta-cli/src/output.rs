use std::io::Write;

use owo_colors::OwoColorize;
use pdfmeta_core::{PdfMetadata, SyncEvent, SyncOutcome, SyncReport};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Forward a sync event to `tracing`.
pub fn log_event(event: &SyncEvent) {
    match event {
        SyncEvent::ExtractionStarted { source_name } => {
            tracing::info!(source = %source_name, "extracting PDF metadata");
        }
        SyncEvent::RawEntry { key, value } => {
            tracing::debug!(key = %key, value = %value, "info dictionary entry");
        }
        SyncEvent::FieldFound { field, key, value } => {
            tracing::info!(field = %field, key, value = %value, "field found");
        }
        SyncEvent::FieldMissing { field } => {
            tracing::info!(field = %field, "field not present, omitted");
        }
        SyncEvent::EntityResolved {
            kind,
            name,
            id,
            created,
        } => {
            if *created {
                tracing::info!(kind = %kind, name = %name, id, "created");
            } else {
                tracing::info!(kind = %kind, name = %name, id, "found existing");
            }
        }
        SyncEvent::CurrentTags { document_id, tags } => {
            tracing::debug!(document_id, ?tags, "current document tags");
        }
        SyncEvent::UpdateSent {
            document_id,
            payload,
        } => {
            tracing::info!(document_id, fields = ?payload.fields(), "document updated");
        }
        SyncEvent::UpdateSkipped { document_id } => {
            tracing::info!(document_id, "no metadata to apply, update skipped");
        }
        SyncEvent::Failure(err) => {
            tracing::warn!(error = %err, "sync step failed");
        }
    }
}

/// Print the normalized metadata extracted from a PDF.
pub fn print_metadata(
    w: &mut dyn Write,
    source_name: &str,
    metadata: &PdfMetadata,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}", "DRY RUN:".bold().cyan(), source_name.bold())?;
    } else {
        writeln!(w, "DRY RUN: {}", source_name)?;
    }

    let keywords = metadata.keywords.as_ref().map(|k| k.join(", "));
    let rows = [
        ("correspondent", metadata.author.clone()),
        ("title", metadata.title.clone()),
        ("created", metadata.created_iso()),
        ("tags", keywords),
    ];
    for (label, value) in rows {
        match value {
            Some(value) => writeln!(w, "  {:<14} {}", label, value)?,
            None if color.enabled() => writeln!(w, "  {:<14} {}", label, "(omitted)".dimmed())?,
            None => writeln!(w, "  {:<14} (omitted)", label)?,
        }
    }

    if metadata.is_empty() {
        writeln!(w)?;
        writeln!(w, "Nothing would be sent.")?;
    }
    Ok(())
}

/// Print the outcome of a sync and every non-fatal failure it collected.
pub fn print_report(w: &mut dyn Write, report: &SyncReport, color: ColorMode) -> std::io::Result<()> {
    let fields: Vec<&str> = report.payload.fields().iter().map(|f| f.as_str()).collect();

    match report.outcome {
        SyncOutcome::Updated => {
            let detail = format!("document {} ({})", report.document_id, fields.join(", "));
            if color.enabled() {
                writeln!(w, "{} {}", "UPDATED".green().bold(), detail)?;
            } else {
                writeln!(w, "UPDATED {}", detail)?;
            }
        }
        SyncOutcome::NoOp => {
            let detail = format!("document {}: no metadata to apply", report.document_id);
            if color.enabled() {
                writeln!(w, "{} {}", "UNCHANGED".yellow().bold(), detail)?;
            } else {
                writeln!(w, "UNCHANGED {}", detail)?;
            }
        }
        SyncOutcome::Failed => {
            let detail = format!("document {}: update was not applied", report.document_id);
            if color.enabled() {
                writeln!(w, "{} {}", "FAILED".red().bold(), detail)?;
            } else {
                writeln!(w, "FAILED {}", detail)?;
            }
        }
    }

    if !report.failures.is_empty() {
        writeln!(w)?;
        let header = format!("{} problem(s) during sync:", report.failures.len());
        if color.enabled() {
            writeln!(w, "{}", header.yellow())?;
        } else {
            writeln!(w, "{}", header)?;
        }
        for failure in &report.failures {
            writeln!(w, "  - {}", failure)?;
        }
    }
    Ok(())
}
