//! In-memory document service for testing.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::reconcile::UpdatePayload;
use crate::service::{DocumentService, Entity, ServiceFuture};
use crate::{EntityKind, SyncError};

/// A hand-rolled [`DocumentService`] that keeps entities and document tags
/// in memory.
///
/// Supports:
/// - Pre-seeded entities and documents.
/// - Per-name lookup and creation failures.
/// - A failing document fetch or a rejected update.
/// - A rejected token on every call.
/// - Call counting and capture of every update sent.
pub struct MockService {
    entities: Mutex<Vec<(EntityKind, Entity)>>,
    documents: Mutex<HashMap<u64, Vec<u64>>>,
    next_id: AtomicU64,
    failing_lookups: HashSet<(EntityKind, String)>,
    failing_creates: HashSet<(EntityKind, String)>,
    fail_document_fetch: bool,
    update_failure: Option<(u16, String)>,
    reject_token: bool,
    create_calls: AtomicUsize,
    document_fetches: AtomicUsize,
    updates: Mutex<Vec<(u64, UpdatePayload)>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            entities: Mutex::new(Vec::new()),
            documents: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1000),
            failing_lookups: HashSet::new(),
            failing_creates: HashSet::new(),
            fail_document_fetch: false,
            update_failure: None,
            reject_token: false,
            create_calls: AtomicUsize::new(0),
            document_fetches: AtomicUsize::new(0),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn with_entity(self, kind: EntityKind, id: u64, name: &str) -> Self {
        self.entities.lock().unwrap().push((
            kind,
            Entity {
                id,
                name: name.to_string(),
            },
        ));
        self
    }

    pub fn with_document(self, document_id: u64, tags: &[u64]) -> Self {
        self.documents
            .lock()
            .unwrap()
            .insert(document_id, tags.to_vec());
        self
    }

    pub fn failing_lookup(mut self, kind: EntityKind, name: &str) -> Self {
        self.failing_lookups.insert((kind, name.to_string()));
        self
    }

    pub fn failing_create(mut self, kind: EntityKind, name: &str) -> Self {
        self.failing_creates.insert((kind, name.to_string()));
        self
    }

    pub fn failing_document_fetch(mut self) -> Self {
        self.fail_document_fetch = true;
        self
    }

    pub fn failing_update(mut self, status: u16, body: &str) -> Self {
        self.update_failure = Some((status, body.to_string()));
        self
    }

    /// Answer every call as if the token were invalid.
    pub fn rejecting_token(mut self) -> Self {
        self.reject_token = true;
        self
    }

    /// How many times `create_entity()` has been called.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// How many times `document_tags()` has been called.
    pub fn document_fetches(&self) -> usize {
        self.document_fetches.load(Ordering::SeqCst)
    }

    /// Every accepted or rejected update, in order.
    pub fn updates(&self) -> Vec<(u64, UpdatePayload)> {
        self.updates.lock().unwrap().clone()
    }

    /// Current tags of a document after any applied updates.
    pub fn tags_of(&self, document_id: u64) -> Vec<u64> {
        self.documents
            .lock()
            .unwrap()
            .get(&document_id)
            .cloned()
            .unwrap_or_default()
    }

    fn auth_error(&self) -> Option<SyncError> {
        self.reject_token.then(|| SyncError::Authentication {
            url: "mock://api".into(),
            status: 401,
        })
    }

    fn lookup_error(kind: EntityKind, name: &str, reason: &str) -> SyncError {
        SyncError::RemoteLookup {
            target: format!("{kind} {name:?}"),
            reason: reason.to_string(),
        }
    }
}

impl DocumentService for MockService {
    fn find_entity<'a>(
        &'a self,
        kind: EntityKind,
        name: &'a str,
    ) -> ServiceFuture<'a, Option<Entity>> {
        let result = if let Some(err) = self.auth_error() {
            Err(err)
        } else if self.failing_lookups.contains(&(kind, name.to_string())) {
            Err(Self::lookup_error(kind, name, "HTTP 500 Internal Server Error"))
        } else {
            Ok(self
                .entities
                .lock()
                .unwrap()
                .iter()
                .find(|(k, e)| *k == kind && e.name == name)
                .map(|(_, e)| e.clone()))
        };
        Box::pin(async move { result })
    }

    fn create_entity<'a>(&'a self, kind: EntityKind, name: &'a str) -> ServiceFuture<'a, Entity> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let result = if let Some(err) = self.auth_error() {
            Err(err)
        } else if self.failing_creates.contains(&(kind, name.to_string())) {
            Err(Self::lookup_error(kind, name, "create failed: HTTP 400 Bad Request"))
        } else {
            let entity = Entity {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                name: name.to_string(),
            };
            self.entities.lock().unwrap().push((kind, entity.clone()));
            Ok(entity)
        };
        Box::pin(async move { result })
    }

    fn document_tags(&self, document_id: u64) -> ServiceFuture<'_, Vec<u64>> {
        self.document_fetches.fetch_add(1, Ordering::SeqCst);
        let result = if let Some(err) = self.auth_error() {
            Err(err)
        } else if self.fail_document_fetch {
            Err(SyncError::RemoteLookup {
                target: format!("document {document_id}"),
                reason: "HTTP 404 Not Found".into(),
            })
        } else {
            Ok(self.tags_of(document_id))
        };
        Box::pin(async move { result })
    }

    fn update_document<'a>(
        &'a self,
        document_id: u64,
        payload: &'a UpdatePayload,
    ) -> ServiceFuture<'a, ()> {
        self.updates
            .lock()
            .unwrap()
            .push((document_id, payload.clone()));

        if let Some(err) = self.auth_error() {
            return Box::pin(async move { Err(err) });
        }

        let result = match &self.update_failure {
            Some((status, body)) => Err(SyncError::RemoteUpdate {
                document_id,
                status: Some(*status),
                body: body.clone(),
            }),
            None => {
                if let Some(tags) = &payload.tags {
                    self.documents
                        .lock()
                        .unwrap()
                        .insert(document_id, tags.clone());
                }
                Ok(())
            }
        };
        Box::pin(async move { result })
    }
}
