//! Mapping of raw PDF info-dictionary entries onto normalized metadata.
//!
//! Every field is handled independently: a missing or malformed entry only
//! affects its own field and is reported to the observer.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::backend::{InfoBackend, PdfSource};
use crate::{Field, SyncError, SyncEvent};

/// Decoded info-dictionary entries keyed by name without the leading `/`.
pub type RawInfo = BTreeMap<String, String>;

/// Format used for `created` when it is sent to the service.
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Normalized bibliographic metadata. Every present field is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfMetadata {
    pub author: Option<String>,
    pub title: Option<String>,
    pub created: Option<NaiveDateTime>,
    pub keywords: Option<Vec<String>>,
}

impl PdfMetadata {
    pub fn is_empty(&self) -> bool {
        self.author.is_none()
            && self.title.is_none()
            && self.created.is_none()
            && self.keywords.is_none()
    }

    /// `created` rendered as `YYYY-MM-DDTHH:MM:SS`.
    pub fn created_iso(&self) -> Option<String> {
        self.created.map(|dt| dt.format(ISO_FORMAT).to_string())
    }
}

/// Read the info dictionary through `backend` and normalize it.
///
/// Never fails: an unreadable container is reported as an extraction
/// failure and yields empty metadata.
pub fn extract(
    source: &PdfSource,
    backend: &dyn InfoBackend,
    observer: &dyn Fn(SyncEvent),
) -> PdfMetadata {
    let source_name = source.display_name();
    observer(SyncEvent::ExtractionStarted {
        source_name: source_name.clone(),
    });

    match backend.read_info(source) {
        Ok(raw) => {
            for (key, value) in &raw {
                observer(SyncEvent::RawEntry {
                    key: key.clone(),
                    value: value.clone(),
                });
            }
            normalize(&raw, observer)
        }
        Err(e) => {
            observer(SyncEvent::Failure(SyncError::Extraction {
                source_name,
                reason: e.to_string(),
            }));
            PdfMetadata::default()
        }
    }
}

/// Map raw info entries onto the four normalized fields.
pub fn normalize(raw: &RawInfo, observer: &dyn Fn(SyncEvent)) -> PdfMetadata {
    let mut metadata = PdfMetadata::default();

    match entry(raw, "Author") {
        Some(author) => {
            found(observer, Field::Author, "Author", author);
            metadata.author = Some(author.to_string());
        }
        None => observer(SyncEvent::FieldMissing {
            field: Field::Author,
        }),
    }

    // Subject stands in for a blank Title.
    let title = entry(raw, "Title")
        .map(|t| ("Title", t))
        .or_else(|| entry(raw, "Subject").map(|s| ("Subject", s)));
    match title {
        Some((key, title)) => {
            found(observer, Field::Title, key, title);
            metadata.title = Some(title.to_string());
        }
        None => observer(SyncEvent::FieldMissing {
            field: Field::Title,
        }),
    }

    match entry(raw, "CreationDate") {
        Some(value) => match parse_pdf_date(value) {
            Ok(created) => {
                found(
                    observer,
                    Field::Created,
                    "CreationDate",
                    &created.format(ISO_FORMAT).to_string(),
                );
                metadata.created = Some(created);
            }
            Err(reason) => observer(SyncEvent::Failure(SyncError::FieldParse {
                field: Field::Created,
                value: value.to_string(),
                reason,
            })),
        },
        None => observer(SyncEvent::FieldMissing {
            field: Field::Created,
        }),
    }

    let keywords = entry(raw, "Keywords").map(split_keywords).unwrap_or_default();
    if keywords.is_empty() {
        observer(SyncEvent::FieldMissing {
            field: Field::Keywords,
        });
    } else {
        found(observer, Field::Keywords, "Keywords", &keywords.join(", "));
        metadata.keywords = Some(keywords);
    }

    metadata
}

/// Parse a PDF date (`D:YYYYMMDDHHmmSS[OHH'mm']`) into a naive timestamp.
///
/// Only the first 14 characters after the optional `D:` prefix are used;
/// any timezone suffix is discarded.
pub fn parse_pdf_date(value: &str) -> Result<NaiveDateTime, String> {
    let trimmed = value.trim();
    let body = trimmed.strip_prefix("D:").unwrap_or(trimmed);
    let digits: String = body.chars().take(14).collect();

    if digits.chars().count() < 14 {
        return Err(format!(
            "expected 14 characters YYYYMMDDHHMMSS, got {:?}",
            digits
        ));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("non-numeric date components in {:?}", digits));
    }

    // All 14 bytes are ASCII digits past this point.
    let num = |from: usize, to: usize| -> u32 {
        digits[from..to]
            .bytes()
            .fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
    };

    NaiveDate::from_ymd_opt(num(0, 4) as i32, num(4, 6), num(6, 8))
        .and_then(|date| date.and_hms_opt(num(8, 10), num(10, 12), num(12, 14)))
        .ok_or_else(|| format!("invalid calendar value in {:?}", digits))
}

/// Split a comma-separated keyword field, trimming tokens and dropping empties.
pub fn split_keywords(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

fn entry<'a>(raw: &'a RawInfo, key: &str) -> Option<&'a str> {
    raw.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn found(observer: &dyn Fn(SyncEvent), field: Field, key: &'static str, value: &str) {
    observer(SyncEvent::FieldFound {
        field,
        key,
        value: value.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use std::sync::Mutex;

    fn raw(entries: &[(&str, &str)]) -> RawInfo {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn normalize_collecting(info: &RawInfo) -> (PdfMetadata, Vec<SyncEvent>) {
        let events = Mutex::new(Vec::new());
        let metadata = normalize(info, &|e| events.lock().unwrap().push(e));
        (metadata, events.into_inner().unwrap())
    }

    struct FixedInfo(RawInfo);

    impl InfoBackend for FixedInfo {
        fn read_info(&self, _source: &PdfSource) -> Result<RawInfo, BackendError> {
            Ok(self.0.clone())
        }
    }

    struct Unreadable;

    impl InfoBackend for Unreadable {
        fn read_info(&self, _source: &PdfSource) -> Result<RawInfo, BackendError> {
            Err(BackendError::OpenError("not a PDF".into()))
        }
    }

    fn source() -> PdfSource {
        PdfSource::Bytes {
            name: "letter.pdf".into(),
            data: vec![],
        }
    }

    #[test]
    fn parses_plain_pdf_date() {
        let dt = parse_pdf_date("D:19611027120000").unwrap();
        assert_eq!(dt.format(ISO_FORMAT).to_string(), "1961-10-27T12:00:00");
    }

    #[test]
    fn discards_timezone_suffix() {
        let dt = parse_pdf_date("D:20230405083015+02'00'").unwrap();
        assert_eq!(dt.format(ISO_FORMAT).to_string(), "2023-04-05T08:30:15");
    }

    #[test]
    fn accepts_date_without_prefix() {
        let dt = parse_pdf_date("20000101000000Z").unwrap();
        assert_eq!(dt.format(ISO_FORMAT).to_string(), "2000-01-01T00:00:00");
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(parse_pdf_date("D:BADVALUE0000").is_err());
        assert!(parse_pdf_date("D:2023").is_err());
        assert!(parse_pdf_date("D:2023AB01120000").is_err());
        assert!(parse_pdf_date("D:20231301120000").is_err());
        assert!(parse_pdf_date("D:20230230120000").is_err());
        assert!(parse_pdf_date("D:20230101250000").is_err());
        assert!(parse_pdf_date("").is_err());
    }

    #[test]
    fn keywords_are_trimmed_and_empties_dropped() {
        assert_eq!(split_keywords("a, b ,,c"), vec!["a", "b", "c"]);
        assert!(split_keywords(" , ,").is_empty());
    }

    #[test]
    fn subject_fills_in_for_missing_title() {
        let (metadata, events) = normalize_collecting(&raw(&[("Subject", "  Annual report ")]));
        assert_eq!(metadata.title.as_deref(), Some("Annual report"));
        assert!(events.contains(&SyncEvent::FieldFound {
            field: Field::Title,
            key: "Subject",
            value: "Annual report".into(),
        }));
    }

    #[test]
    fn title_wins_over_subject() {
        let (metadata, _) =
            normalize_collecting(&raw(&[("Title", "Letter"), ("Subject", "Correspondence")]));
        assert_eq!(metadata.title.as_deref(), Some("Letter"));
    }

    #[test]
    fn blank_title_falls_back_to_subject() {
        let (metadata, _) =
            normalize_collecting(&raw(&[("Title", "   "), ("Subject", "Correspondence")]));
        assert_eq!(metadata.title.as_deref(), Some("Correspondence"));
    }

    #[test]
    fn bad_date_only_drops_created() {
        let (metadata, events) = normalize_collecting(&raw(&[
            ("Author", "President of LSU"),
            ("Title", "Letter"),
            ("CreationDate", "D:BADVALUE0000"),
            ("Keywords", "history, lsu"),
        ]));

        assert!(metadata.created.is_none());
        assert_eq!(metadata.author.as_deref(), Some("President of LSU"));
        assert_eq!(metadata.title.as_deref(), Some("Letter"));
        assert_eq!(
            metadata.keywords,
            Some(vec!["history".to_string(), "lsu".to_string()])
        );
        assert!(events.iter().any(|e| matches!(
            e,
            SyncEvent::Failure(SyncError::FieldParse {
                field: Field::Created,
                ..
            })
        )));
    }

    #[test]
    fn empty_info_yields_empty_metadata() {
        let (metadata, events) = normalize_collecting(&RawInfo::new());
        assert!(metadata.is_empty());
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, SyncEvent::FieldMissing { .. }))
                .count(),
            4
        );
    }

    #[test]
    fn keywords_of_only_separators_are_omitted() {
        let (metadata, _) = normalize_collecting(&raw(&[("Keywords", ", ,")]));
        assert!(metadata.keywords.is_none());
    }

    #[test]
    fn extract_reports_raw_entries() {
        let backend = FixedInfo(raw(&[
            ("CreationDate", "D:19611027120000"),
            ("Producer", "Scanner"),
        ]));
        let events = Mutex::new(Vec::new());
        let metadata = extract(&source(), &backend, &|e| events.lock().unwrap().push(e));

        assert_eq!(metadata.created_iso().as_deref(), Some("1961-10-27T12:00:00"));
        let events = events.into_inner().unwrap();
        assert_eq!(
            events[0],
            SyncEvent::ExtractionStarted {
                source_name: "letter.pdf".into()
            }
        );
        assert!(events.contains(&SyncEvent::RawEntry {
            key: "Producer".into(),
            value: "Scanner".into(),
        }));
    }

    #[test]
    fn unreadable_container_yields_empty_metadata() {
        let events = Mutex::new(Vec::new());
        let metadata = extract(&source(), &Unreadable, &|e| events.lock().unwrap().push(e));

        assert!(metadata.is_empty());
        assert!(events.into_inner().unwrap().iter().any(|e| matches!(
            e,
            SyncEvent::Failure(SyncError::Extraction { .. })
        )));
    }
}
