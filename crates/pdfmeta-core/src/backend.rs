use std::path::PathBuf;

use thiserror::Error;

use crate::metadata::RawInfo;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("malformed info dictionary: {0}")]
    MalformedInfo(String),
}

/// Where a PDF is read from.
#[derive(Debug, Clone)]
pub enum PdfSource {
    Path(PathBuf),
    /// An in-memory PDF; `name` is only used in diagnostics.
    Bytes { name: String, data: Vec<u8> },
}

impl PdfSource {
    pub fn display_name(&self) -> String {
        match self {
            PdfSource::Path(path) => path.display().to_string(),
            PdfSource::Bytes { name, .. } => name.clone(),
        }
    }
}

/// Trait for PDF container backends.
///
/// Implementors only read the document info dictionary; mapping the raw
/// entries onto normalized fields lives in [`crate::metadata::normalize`].
pub trait InfoBackend: Send + Sync {
    /// Read the info dictionary. A document without one yields an empty map.
    fn read_info(&self, source: &PdfSource) -> Result<RawInfo, BackendError>;
}
