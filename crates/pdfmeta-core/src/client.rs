//! REST client for a Paperless-style document-management API.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::reconcile::UpdatePayload;
use crate::service::{DocumentService, Entity, ServiceFuture};
use crate::{Config, EntityKind, SyncError};

/// Paginated listing envelope.
#[derive(Deserialize)]
struct Page<T> {
    results: Vec<T>,
}

#[derive(Deserialize)]
struct DocumentTags {
    tags: Vec<TagRef>,
}

/// Documents list tags either as bare ids or as objects carrying an id.
#[derive(Deserialize)]
#[serde(untagged)]
enum TagRef {
    Id(u64),
    Object { id: u64 },
}

impl TagRef {
    fn id(&self) -> u64 {
        match self {
            TagRef::Id(id) | TagRef::Object { id } => *id,
        }
    }
}

pub struct PaperlessClient {
    http: reqwest::Client,
    api_root: String,
}

impl PaperlessClient {
    /// Build a client from configuration. Fails when no token is configured.
    pub fn new(config: &Config) -> Result<Self, SyncError> {
        let token = config.require_token()?;

        let mut auth = HeaderValue::from_str(&format!("{} {}", config.auth_scheme, token))
            .map_err(|_| {
                SyncError::Configuration(
                    "PAPERLESS_TOKEN contains characters not allowed in an HTTP header".into(),
                )
            })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_root: config.api_root(),
        })
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// Issue one read-only listing request to validate the URL and token.
    ///
    /// Returns the number of documents the service reports.
    pub async fn check_connection(&self) -> Result<u64, SyncError> {
        let url = format!("{}/documents/?page_size=1", self.api_root);
        let connectivity = |reason: String| SyncError::Connectivity {
            url: self.api_root.clone(),
            reason,
        };

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| connectivity(e.to_string()))?;

        let status = resp.status();
        if is_auth_rejection(status) {
            return Err(SyncError::Authentication {
                url: self.api_root.clone(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(connectivity(format!("HTTP {}: {}", status, body.trim())));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| connectivity(format!("unexpected response: {e}")))?;
        Ok(data["count"].as_u64().unwrap_or(0))
    }

    fn entity_url(&self, kind: EntityKind) -> String {
        format!("{}/{}/", self.api_root, kind.endpoint())
    }

    fn document_url(&self, document_id: u64) -> String {
        format!("{}/documents/{}/", self.api_root, document_id)
    }
}

fn is_auth_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// Decode a JSON body, treating non-2xx statuses as errors.
///
/// A rejected token is reported as [`SyncError::Authentication`] regardless
/// of which call hit it; every other failure goes through `fail`.
async fn read_json<T: DeserializeOwned>(
    resp: reqwest::Response,
    api_root: &str,
    fail: impl FnOnce(String) -> SyncError,
) -> Result<T, SyncError> {
    let status = resp.status();
    if is_auth_rejection(status) {
        return Err(SyncError::Authentication {
            url: api_root.to_string(),
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(fail(format!("HTTP {}: {}", status, body.trim())));
    }
    resp.json::<T>()
        .await
        .map_err(|e| fail(format!("malformed response: {e}")))
}

impl DocumentService for PaperlessClient {
    fn find_entity<'a>(
        &'a self,
        kind: EntityKind,
        name: &'a str,
    ) -> ServiceFuture<'a, Option<Entity>> {
        Box::pin(async move {
            let url = format!("{}?name={}", self.entity_url(kind), urlencoding::encode(name));
            let lookup_error = |reason: String| SyncError::RemoteLookup {
                target: format!("{kind} {name:?}"),
                reason,
            };
            tracing::debug!(%kind, name, "looking up entity by name");

            let resp = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|e| lookup_error(e.to_string()))?;
            let page: Page<Entity> = read_json(resp, &self.api_root, lookup_error).await?;

            Ok(page.results.into_iter().find(|e| e.name == name))
        })
    }

    fn create_entity<'a>(&'a self, kind: EntityKind, name: &'a str) -> ServiceFuture<'a, Entity> {
        Box::pin(async move {
            let create_error = |reason: String| SyncError::RemoteLookup {
                target: format!("{kind} {name:?}"),
                reason: format!("create failed: {reason}"),
            };

            let resp = self
                .http
                .post(self.entity_url(kind))
                .json(&serde_json::json!({ "name": name }))
                .send()
                .await
                .map_err(|e| create_error(e.to_string()))?;

            read_json(resp, &self.api_root, create_error).await
        })
    }

    fn document_tags(&self, document_id: u64) -> ServiceFuture<'_, Vec<u64>> {
        Box::pin(async move {
            let lookup_error = |reason: String| SyncError::RemoteLookup {
                target: format!("document {document_id}"),
                reason,
            };

            let resp = self
                .http
                .get(self.document_url(document_id))
                .send()
                .await
                .map_err(|e| lookup_error(e.to_string()))?;
            let document: DocumentTags = read_json(resp, &self.api_root, lookup_error).await?;

            Ok(document.tags.iter().map(TagRef::id).collect())
        })
    }

    fn update_document<'a>(
        &'a self,
        document_id: u64,
        payload: &'a UpdatePayload,
    ) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            tracing::debug!(document_id, fields = ?payload.fields(), "sending partial update");
            let resp = self
                .http
                .patch(self.document_url(document_id))
                .json(payload)
                .send()
                .await
                .map_err(|e| SyncError::RemoteUpdate {
                    document_id,
                    status: None,
                    body: e.to_string(),
                })?;

            let status = resp.status();
            if is_auth_rejection(status) {
                return Err(SyncError::Authentication {
                    url: self.api_root.clone(),
                    status: status.as_u16(),
                });
            }
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(SyncError::RemoteUpdate {
                    document_id,
                    status: Some(status.as_u16()),
                    body: body.trim().to_string(),
                });
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_token(token: Option<&str>) -> Config {
        Config {
            token: token.map(String::from),
            ..Config::default()
        }
    }

    #[test]
    fn missing_token_is_a_configuration_error() {
        let err = PaperlessClient::new(&config_with_token(None))
            .err()
            .expect("client without token");
        assert!(matches!(err, SyncError::Configuration(_)));
    }

    #[test]
    fn header_unsafe_token_is_rejected() {
        let err = PaperlessClient::new(&config_with_token(Some("abc\ndef")))
            .err()
            .expect("token with newline");
        assert!(matches!(err, SyncError::Configuration(_)));
    }

    #[test]
    fn api_root_comes_from_config() {
        let client = PaperlessClient::new(&Config {
            base_url: "https://paperless.example.org/".into(),
            ..config_with_token(Some("t0k3n"))
        })
        .unwrap();
        assert_eq!(client.api_root(), "https://paperless.example.org/api");
        assert_eq!(
            client.document_url(12),
            "https://paperless.example.org/api/documents/12/"
        );
        assert_eq!(
            client.entity_url(EntityKind::Tag),
            "https://paperless.example.org/api/tags/"
        );
    }

    #[test]
    fn tag_refs_accept_ids_and_objects() {
        let doc: DocumentTags =
            serde_json::from_str(r#"{"id": 3, "tags": [4, {"id": 9, "name": "x"}]}"#).unwrap();
        let ids: Vec<u64> = doc.tags.iter().map(TagRef::id).collect();
        assert_eq!(ids, vec![4, 9]);
    }
}
