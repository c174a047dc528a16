//! Reconciliation of normalized PDF metadata with a remote document.
//!
//! Each field resolves on its own; a failed lookup drops only that field
//! (or that keyword) and the remaining fields are still sent in a single
//! partial update.

use serde::Serialize;

use crate::metadata::PdfMetadata;
use crate::service::DocumentService;
use crate::{EntityKind, Field, SyncError, SyncEvent, TagPolicy};

/// Partial update for a remote document. Absent fields are not serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdatePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correspondent: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<u64>>,
}

impl UpdatePayload {
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Fields carried by this payload, in wire order.
    pub fn fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        if self.correspondent.is_some() {
            fields.push(Field::Correspondent);
        }
        if self.title.is_some() {
            fields.push(Field::Title);
        }
        if self.created.is_some() {
            fields.push(Field::Created);
        }
        if self.tags.is_some() {
            fields.push(Field::Tags);
        }
        fields
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The update was accepted by the service.
    Updated,
    /// Nothing resolved, so no update was sent.
    NoOp,
    /// The update request was rejected or could not be delivered.
    Failed,
}

/// Result of synchronizing one document.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub document_id: u64,
    pub outcome: SyncOutcome,
    pub payload: UpdatePayload,
    /// Non-fatal failures, in the order they happened.
    pub failures: Vec<SyncError>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.outcome != SyncOutcome::Failed
    }
}

/// Resolve `metadata` against the service and send one partial update for
/// `document_id`.
///
/// A fatal error (a rejected token) stops the run before any update is sent
/// and yields [`SyncOutcome::Failed`].
pub async fn sync(
    service: &dyn DocumentService,
    document_id: u64,
    metadata: &PdfMetadata,
    policy: TagPolicy,
    observer: &dyn Fn(SyncEvent),
) -> SyncReport {
    let mut failures = Vec::new();

    let payload = match build_payload(
        service,
        document_id,
        metadata,
        policy,
        observer,
        &mut failures,
    )
    .await
    {
        Ok(payload) => payload,
        Err(fatal) => {
            record(observer, &mut failures, fatal);
            return SyncReport {
                document_id,
                outcome: SyncOutcome::Failed,
                payload: UpdatePayload::default(),
                failures,
            };
        }
    };

    if payload.is_empty() {
        observer(SyncEvent::UpdateSkipped { document_id });
        return SyncReport {
            document_id,
            outcome: SyncOutcome::NoOp,
            payload,
            failures,
        };
    }

    let outcome = match service.update_document(document_id, &payload).await {
        Ok(()) => {
            observer(SyncEvent::UpdateSent {
                document_id,
                payload: payload.clone(),
            });
            SyncOutcome::Updated
        }
        Err(e) => {
            record(observer, &mut failures, e);
            SyncOutcome::Failed
        }
    };

    SyncReport {
        document_id,
        outcome,
        payload,
        failures,
    }
}

async fn build_payload(
    service: &dyn DocumentService,
    document_id: u64,
    metadata: &PdfMetadata,
    policy: TagPolicy,
    observer: &dyn Fn(SyncEvent),
    failures: &mut Vec<SyncError>,
) -> Result<UpdatePayload, SyncError> {
    let mut payload = UpdatePayload::default();

    if let Some(author) = &metadata.author {
        payload.correspondent =
            resolve_entity(service, EntityKind::Correspondent, author, observer, failures).await?;
    }

    payload.title = metadata.title.clone();
    payload.created = metadata.created_iso();

    if let Some(keywords) = &metadata.keywords {
        payload.tags =
            resolve_tags(service, document_id, keywords, policy, observer, failures).await?;
    }

    Ok(payload)
}

/// Resolve keyword tags according to `policy`.
///
/// In merge mode the document's current tags are fetched first; if that
/// fails the tags field is left out entirely so unrelated tags are never
/// dropped, and no keyword tags are created.
async fn resolve_tags(
    service: &dyn DocumentService,
    document_id: u64,
    keywords: &[String],
    policy: TagPolicy,
    observer: &dyn Fn(SyncEvent),
    failures: &mut Vec<SyncError>,
) -> Result<Option<Vec<u64>>, SyncError> {
    let current = match policy {
        TagPolicy::Replace => None,
        TagPolicy::Merge => match service.document_tags(document_id).await {
            Ok(tags) => {
                observer(SyncEvent::CurrentTags {
                    document_id,
                    tags: tags.clone(),
                });
                Some(tags)
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                record(observer, failures, e);
                return Ok(None);
            }
        },
    };

    let mut resolved = Vec::new();
    for keyword in keywords {
        if let Some(id) =
            resolve_entity(service, EntityKind::Tag, keyword, observer, failures).await?
            && !resolved.contains(&id)
        {
            resolved.push(id);
        }
    }

    if resolved.is_empty() {
        return Ok(None);
    }

    Ok(match current {
        Some(current) => Some(merge_tags(&current, &resolved)),
        None => Some(resolved),
    })
}

/// Union of `current` and `resolved`: current ids keep their order, new ids
/// are appended, duplicates are dropped.
pub fn merge_tags(current: &[u64], resolved: &[u64]) -> Vec<u64> {
    let mut merged: Vec<u64> = Vec::with_capacity(current.len() + resolved.len());
    for id in current.iter().chain(resolved) {
        if !merged.contains(id) {
            merged.push(*id);
        }
    }
    merged
}

/// Find-or-create an entity by exact name.
///
/// Non-fatal failures are recorded and yield `None`; fatal ones are returned.
async fn resolve_entity(
    service: &dyn DocumentService,
    kind: EntityKind,
    name: &str,
    observer: &dyn Fn(SyncEvent),
    failures: &mut Vec<SyncError>,
) -> Result<Option<u64>, SyncError> {
    let resolved = match service.find_entity(kind, name).await {
        Ok(Some(entity)) => Ok((entity, false)),
        Ok(None) => service
            .create_entity(kind, name)
            .await
            .map(|entity| (entity, true)),
        Err(e) => Err(e),
    };

    match resolved {
        Ok((entity, created)) => {
            observer(SyncEvent::EntityResolved {
                kind,
                name: name.to_string(),
                id: entity.id,
                created,
            });
            Ok(Some(entity.id))
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            record(observer, failures, e);
            Ok(None)
        }
    }
}

fn record(observer: &dyn Fn(SyncEvent), failures: &mut Vec<SyncError>, error: SyncError) {
    observer(SyncEvent::Failure(error.clone()));
    failures.push(error);
}
