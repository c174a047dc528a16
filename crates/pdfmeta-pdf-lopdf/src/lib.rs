use lopdf::{Document, Object};

use pdfmeta_core::{BackendError, InfoBackend, PdfSource, RawInfo};

/// lopdf-based implementation of [`InfoBackend`].
///
/// This crate isolates the lopdf dependency so that the mapping and sync
/// code never touches the container format directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfBackend;

impl LopdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl InfoBackend for LopdfBackend {
    fn read_info(&self, source: &PdfSource) -> Result<RawInfo, BackendError> {
        let document = match source {
            PdfSource::Path(path) => Document::load(path),
            PdfSource::Bytes { data, .. } => Document::load_mem(data),
        }
        .map_err(|e| BackendError::OpenError(e.to_string()))?;

        info_entries(&document)
    }
}

/// Collect the trailer's `/Info` dictionary as decoded strings.
///
/// Entries that are not scalars (arrays, streams, dangling references) are
/// skipped.
fn info_entries(document: &Document) -> Result<RawInfo, BackendError> {
    let mut raw = RawInfo::new();

    let Ok(info) = document.trailer.get(b"Info") else {
        return Ok(raw);
    };
    let dict = resolve(document, info)
        .and_then(|obj| obj.as_dict())
        .map_err(|e| BackendError::MalformedInfo(e.to_string()))?;

    for (key, value) in dict.iter() {
        let Ok(value) = resolve(document, value) else {
            continue;
        };
        if let Some(text) = scalar_text(value) {
            raw.insert(String::from_utf8_lossy(key).into_owned(), text);
        }
    }

    Ok(raw)
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> lopdf::Result<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id),
        other => Ok(other),
    }
}

fn scalar_text(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Object::Integer(i) => Some(i.to_string()),
        Object::Real(r) => Some(r.to_string()),
        Object::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Decode a PDF text string.
///
/// UTF-16 (with byte-order mark) and UTF-8 (valid or BOM-prefixed) are
/// decoded as such; anything else is treated as Latin-1, which matches
/// PDFDocEncoding for the printable range.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(rest, u16::from_be_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(rest, u16::from_le_bytes);
    }
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}
