//! Remote document-service trait used by the reconciler.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

use crate::reconcile::UpdatePayload;
use crate::{EntityKind, SyncError};

/// A named entity (correspondent or tag) on the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Entity {
    pub id: u64,
    pub name: String,
}

/// Boxed future returned by [`DocumentService`] methods.
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SyncError>> + Send + 'a>>;

/// The operations the reconciler needs from a document-management service.
///
/// Lookup and creation failures are reported as [`SyncError::RemoteLookup`],
/// update failures as [`SyncError::RemoteUpdate`].
pub trait DocumentService: Send + Sync {
    /// Find the entity of `kind` whose name equals `name` exactly.
    fn find_entity<'a>(&'a self, kind: EntityKind, name: &'a str)
    -> ServiceFuture<'a, Option<Entity>>;

    /// Create an entity of `kind` named `name`.
    fn create_entity<'a>(&'a self, kind: EntityKind, name: &'a str) -> ServiceFuture<'a, Entity>;

    /// Tag ids currently attached to a document.
    fn document_tags(&self, document_id: u64) -> ServiceFuture<'_, Vec<u64>>;

    /// Send a partial update for a document.
    fn update_document<'a>(
        &'a self,
        document_id: u64,
        payload: &'a UpdatePayload,
    ) -> ServiceFuture<'a, ()>;
}
