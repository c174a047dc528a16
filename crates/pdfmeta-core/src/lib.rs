use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub mod backend;
pub mod client;
pub mod config_file;
pub mod metadata;
pub mod reconcile;
pub mod service;

#[cfg(test)]
mod mock;

// Re-export for convenience
pub use backend::{BackendError, InfoBackend, PdfSource};
pub use client::PaperlessClient;
pub use metadata::{PdfMetadata, RawInfo, extract, normalize, parse_pdf_date, split_keywords};
pub use reconcile::{SyncOutcome, SyncReport, UpdatePayload, sync};
pub use service::{DocumentService, Entity};

/// Default location of the document-management service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default `Authorization` scheme; the token is sent as `Token <value>`.
pub const DEFAULT_AUTH_SCHEME: &str = "Token";

/// Default client-wide request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A semantic field tracked through extraction and reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Author,
    Title,
    Created,
    Keywords,
    Correspondent,
    Tags,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Author => "author",
            Field::Title => "title",
            Field::Created => "created",
            Field::Keywords => "keywords",
            Field::Correspondent => "correspondent",
            Field::Tags => "tags",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named entity kind on the remote service, resolved by find-or-create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Correspondent,
    Tag,
}

impl EntityKind {
    /// Collection path segment under the API root.
    pub fn endpoint(&self) -> &'static str {
        match self {
            EntityKind::Correspondent => "correspondents",
            EntityKind::Tag => "tags",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Correspondent => f.write_str("correspondent"),
            EntityKind::Tag => f.write_str("tag"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("could not connect to {url}: {reason}")]
    Connectivity { url: String, reason: String },
    #[error("authentication rejected by {url} (HTTP {status}), check PAPERLESS_TOKEN")]
    Authentication { url: String, status: u16 },
    #[error("failed to read PDF metadata from {source_name}: {reason}")]
    Extraction { source_name: String, reason: String },
    #[error("could not parse {field} value {value:?}: {reason}")]
    FieldParse {
        field: Field,
        value: String,
        reason: String,
    },
    #[error("lookup of {target} failed: {reason}")]
    RemoteLookup { target: String, reason: String },
    #[error("update of document {document_id} failed{}: {body}", http_suffix(.status))]
    RemoteUpdate {
        document_id: u64,
        status: Option<u16>,
        body: String,
    },
}

impl SyncError {
    /// Fatal errors abort the run; everything else degrades a single field or call.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Configuration(_)
                | SyncError::Connectivity { .. }
                | SyncError::Authentication { .. }
        )
    }
}

/// How keyword tags are combined with the tags a document already carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagPolicy {
    /// The document's tags become exactly the resolved keyword tags.
    Replace,
    /// Resolved keyword tags are added to the document's current tags.
    #[default]
    Merge,
}

impl FromStr for TagPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(TagPolicy::Replace),
            "merge" => Ok(TagPolicy::Merge),
            other => Err(format!(
                "unknown tag policy {other:?} (expected \"merge\" or \"replace\")"
            )),
        }
    }
}

impl fmt::Display for TagPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagPolicy::Replace => f.write_str("replace"),
            TagPolicy::Merge => f.write_str("merge"),
        }
    }
}

/// Events emitted while extracting and synchronizing a document.
///
/// Components never log through a global sink on their own; callers pass an
/// observer and decide how to render these (the CLI forwards them to `tracing`).
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    ExtractionStarted {
        source_name: String,
    },
    /// One raw entry of the PDF info dictionary.
    RawEntry {
        key: String,
        value: String,
    },
    FieldFound {
        field: Field,
        /// Info dictionary key the value was taken from.
        key: &'static str,
        value: String,
    },
    FieldMissing {
        field: Field,
    },
    EntityResolved {
        kind: EntityKind,
        name: String,
        id: u64,
        created: bool,
    },
    CurrentTags {
        document_id: u64,
        tags: Vec<u64>,
    },
    UpdateSent {
        document_id: u64,
        payload: UpdatePayload,
    },
    UpdateSkipped {
        document_id: u64,
    },
    Failure(SyncError),
}

/// Observer that drops every event.
pub fn discard(_event: SyncEvent) {}

/// Runtime configuration for talking to the document-management service.
#[derive(Clone)]
pub struct Config {
    pub base_url: String,
    pub token: Option<String>,
    pub auth_scheme: String,
    pub tag_policy: TagPolicy,
    pub check_connection: bool,
    pub timeout_secs: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("auth_scheme", &self.auth_scheme)
            .field("tag_policy", &self.tag_policy)
            .field("check_connection", &self.check_connection)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            auth_scheme: DEFAULT_AUTH_SCHEME.to_string(),
            tag_policy: TagPolicy::default(),
            check_connection: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Build a config from a loaded config file, with environment values
    /// (looked up through `env`) taking precedence over file values.
    pub fn from_sources(
        file: &config_file::ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SyncError> {
        let server = file.server.clone().unwrap_or_default();
        let sync = file.sync.clone().unwrap_or_default();
        let defaults = Config::default();

        let tag_policy = match env("PDFMETA_TAG_POLICY").or(sync.tag_policy) {
            Some(raw) => raw.parse().map_err(SyncError::Configuration)?,
            None => defaults.tag_policy,
        };

        let check_connection = match env("PDFMETA_CHECK_CONNECTION") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                SyncError::Configuration(format!(
                    "PDFMETA_CHECK_CONNECTION must be a boolean, got {raw:?}"
                ))
            })?,
            None => sync.check_connection.unwrap_or(defaults.check_connection),
        };

        let timeout_secs = match env("PDFMETA_TIMEOUT") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                SyncError::Configuration(format!(
                    "PDFMETA_TIMEOUT must be a number of seconds, got {raw:?}"
                ))
            })?,
            None => server.timeout_secs.unwrap_or(defaults.timeout_secs),
        };

        Ok(Self {
            base_url: env("PAPERLESS_URL")
                .or(server.url)
                .unwrap_or(defaults.base_url),
            token: env("PAPERLESS_TOKEN")
                .or(server.token)
                .filter(|t| !t.trim().is_empty()),
            auth_scheme: env("PAPERLESS_AUTH_SCHEME")
                .or(server.auth_scheme)
                .unwrap_or(defaults.auth_scheme),
            tag_policy,
            check_connection,
            timeout_secs,
        })
    }

    /// The token, or a configuration error when it was never provided.
    pub fn require_token(&self) -> Result<&str, SyncError> {
        self.token.as_deref().ok_or_else(|| {
            SyncError::Configuration("PAPERLESS_TOKEN environment variable is required".into())
        })
    }

    /// REST API root derived from the base URL: `<base>/api` unless the base
    /// already points at it.
    pub fn api_root(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/api") {
            base.to_string()
        } else {
            format!("{base}/api")
        }
    }
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
