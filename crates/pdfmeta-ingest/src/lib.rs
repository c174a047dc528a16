use thiserror::Error;

pub use pdfmeta_core::{BackendError, PdfMetadata, PdfSource, RawInfo, SyncEvent};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("PDF backend error: {0}")]
    Backend(#[from] BackendError),
    #[cfg(not(feature = "pdf"))]
    #[error("PDF support not compiled in (enable the `pdf` feature of pdfmeta-ingest)")]
    NoPdfSupport,
}

/// Read and normalize the info dictionary of a PDF.
///
/// Failures are reported to `observer` and yield empty metadata, so callers
/// always get something they can hand to [`pdfmeta_core::sync`].
pub fn extract_metadata(source: &PdfSource, observer: &dyn Fn(SyncEvent)) -> PdfMetadata {
    tracing::debug!(source = %source.display_name(), "reading PDF info dictionary");
    extract_pdf(source, observer)
}

/// Raw info-dictionary entries without normalization.
pub fn read_raw_info(source: &PdfSource) -> Result<RawInfo, IngestError> {
    read_pdf(source)
}

#[cfg(feature = "pdf")]
fn extract_pdf(source: &PdfSource, observer: &dyn Fn(SyncEvent)) -> PdfMetadata {
    let backend = pdfmeta_pdf_lopdf::LopdfBackend::new();
    pdfmeta_core::extract(source, &backend, observer)
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(source: &PdfSource, observer: &dyn Fn(SyncEvent)) -> PdfMetadata {
    observer(SyncEvent::Failure(pdfmeta_core::SyncError::Extraction {
        source_name: source.display_name(),
        reason: IngestError::NoPdfSupport.to_string(),
    }));
    PdfMetadata::default()
}

#[cfg(feature = "pdf")]
fn read_pdf(source: &PdfSource) -> Result<RawInfo, IngestError> {
    use pdfmeta_core::InfoBackend;

    Ok(pdfmeta_pdf_lopdf::LopdfBackend::new().read_info(source)?)
}

#[cfg(not(feature = "pdf"))]
fn read_pdf(_source: &PdfSource) -> Result<RawInfo, IngestError> {
    Err(IngestError::NoPdfSupport)
}
