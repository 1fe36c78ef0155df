//! Mutation gateway: create, update and delete against the remote service,
//! reconciled into the record store.
//!
//! Every operation validates locally first and returns before any request
//! is sent when validation fails. Remote failures leave the store exactly as
//! it was. In-flight requests are tracked per target record so the UI can
//! gate its controls and so contradictory mutations on one record are
//! refused while one is pending.

mod error;
mod notice;

pub use error::{MutationError, ValidationError};
pub use notice::{Notice, NoticeLevel};
pub(crate) use notice::capitalize;

use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entity::{Actor, Lifecycle, Record, RecordBase};
use crate::remote::{DeleteMode, RemoteError, RemoteService};
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub fn verb(self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            MutationKind::Create => "created",
            MutationKind::Update => "updated",
            MutationKind::Delete => "deleted",
        }
    }
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.verb())
    }
}

/// What a pending request is keyed on. Creates have no record yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Target {
    New,
    Record(Uuid),
}

type Pending = DashMap<Target, MutationKind>;

/// Clears the pending entry when the request finishes, however it ends.
struct PendingGuard {
    pending: Arc<Pending>,
    target: Target,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.remove(&self.target);
    }
}

/// Proof that the user confirmed deleting a record.
///
/// Only [`MutationGateway::confirm_delete`] creates one, so a delete can
/// never be issued without passing through the confirmation step.
#[derive(Debug)]
pub struct DeleteConfirmation<R> {
    id: Uuid,
    label: String,
    _record: PhantomData<fn() -> R>,
}

impl<R> DeleteConfirmation<R> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Label of the record as it was when confirmed.
    pub fn label(&self) -> &str {
        &self.label
    }
}

pub struct MutationGateway<R: Record> {
    remote: Arc<dyn RemoteService<R>>,
    store: Weak<Mutex<RecordStore<R>>>,
    pending: Arc<Pending>,
    delete_mode: DeleteMode,
}

impl<R: Record> Clone for MutationGateway<R> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            store: Weak::clone(&self.store),
            pending: Arc::clone(&self.pending),
            delete_mode: self.delete_mode,
        }
    }
}

impl<R: Record> MutationGateway<R> {
    /// Gateway writing into `store`. Only a weak reference is kept: once the
    /// owning view drops the store, late responses are discarded.
    pub fn new(
        remote: Arc<dyn RemoteService<R>>,
        store: &Arc<Mutex<RecordStore<R>>>,
        delete_mode: DeleteMode,
    ) -> Self {
        Self {
            remote,
            store: Arc::downgrade(store),
            pending: Arc::new(DashMap::new()),
            delete_mode,
        }
    }

    pub fn delete_mode(&self) -> DeleteMode {
        self.delete_mode
    }

    /// Whether the owning store still exists.
    pub fn is_attached(&self) -> bool {
        self.store.strong_count() > 0
    }

    pub fn is_creating(&self) -> bool {
        self.pending.contains_key(&Target::New)
    }

    pub fn is_updating(&self, id: Uuid) -> bool {
        self.pending_kind(id) == Some(MutationKind::Update)
    }

    pub fn is_deleting(&self, id: Uuid) -> bool {
        self.pending_kind(id) == Some(MutationKind::Delete)
    }

    /// Any mutation in flight on `id`.
    pub fn is_busy(&self, id: Uuid) -> bool {
        self.pending_kind(id).is_some()
    }

    fn pending_kind(&self, id: Uuid) -> Option<MutationKind> {
        self.pending.get(&Target::Record(id)).map(|kind| *kind)
    }

    pub async fn create(&self, actor: Option<&Actor>, draft: R) -> Result<R, MutationError> {
        let actor = require_actor(actor)?;
        if draft.is_fixture() {
            return Err(ValidationError::FixtureRecord(draft.id()).into());
        }
        draft.validate()?;

        let _guard = self.begin(Target::New, MutationKind::Create)?;
        debug!(collection = R::COLLECTION, label = draft.label(), "creating record");

        let saved = self
            .remote
            .insert(actor, draft)
            .await
            .map_err(|e| self.failed(MutationKind::Create, None, e))?;

        info!(collection = R::COLLECTION, id = %saved.id(), "record created");
        self.apply_saved(saved.clone()).await;
        Ok(saved)
    }

    pub async fn update_status(
        &self,
        actor: Option<&Actor>,
        id: Uuid,
        status: R::Status,
    ) -> Result<R, MutationError> {
        let actor = require_actor(actor)?;
        let mut next = self.target(id).await?;
        check_transition(next.status(), status)?;

        let _guard = self.begin(Target::Record(id), MutationKind::Update)?;
        debug!(collection = R::COLLECTION, %id, from = %next.status(), to = %status, "updating status");
        next.set_status(status);

        let saved = self
            .remote
            .update(actor, next)
            .await
            .map_err(|e| self.failed(MutationKind::Update, Some(id), e))?;

        self.apply_saved(saved.clone()).await;
        Ok(saved)
    }

    /// Apply a field edit to the stored copy of `id` and persist it.
    ///
    /// The edited record is validated again, and a status change made by the
    /// edit must be a legal transition. An edit that changes nothing returns
    /// the stored record without a request.
    pub async fn edit<F>(&self, actor: Option<&Actor>, id: Uuid, change: F) -> Result<R, MutationError>
    where
        F: FnOnce(&mut R) + Send,
    {
        let actor = require_actor(actor)?;
        let current = self.target(id).await?;

        let mut next = current.clone();
        change(&mut next);
        // only tags are editable on the base
        let tags = std::mem::take(&mut next.base_mut().tags);
        *next.base_mut() = RecordBase {
            tags,
            ..current.base().clone()
        };

        if next.status() != current.status() {
            check_transition(current.status(), next.status())?;
            let status = next.status();
            next.set_status(status);
        }
        next.validate()?;
        if next == current {
            return Ok(current);
        }

        let _guard = self.begin(Target::Record(id), MutationKind::Update)?;
        debug!(collection = R::COLLECTION, %id, "editing record");

        let saved = self
            .remote
            .update(actor, next)
            .await
            .map_err(|e| self.failed(MutationKind::Update, Some(id), e))?;

        self.apply_saved(saved.clone()).await;
        Ok(saved)
    }

    /// First step of a delete: check the target and hand out the token that
    /// [`delete`](Self::delete) requires.
    pub async fn confirm_delete(&self, id: Uuid) -> Result<DeleteConfirmation<R>, MutationError> {
        let record = self.target(id).await?;
        Ok(DeleteConfirmation {
            id,
            label: record.label().to_string(),
            _record: PhantomData,
        })
    }

    /// Delete a confirmed record. Dependent records go with it on the remote
    /// side; the store only ever holds this collection.
    pub async fn delete(
        &self,
        actor: Option<&Actor>,
        confirmation: DeleteConfirmation<R>,
    ) -> Result<(), MutationError> {
        let actor = require_actor(actor)?;
        let id = confirmation.id;
        self.target(id).await?;

        let _guard = self.begin(Target::Record(id), MutationKind::Delete)?;
        debug!(collection = R::COLLECTION, %id, mode = %self.delete_mode, "deleting record");

        self.remote
            .delete(actor, id, self.delete_mode)
            .await
            .map_err(|e| self.failed(MutationKind::Delete, Some(id), e))?;

        info!(collection = R::COLLECTION, %id, "record deleted");
        match self.store.upgrade() {
            Some(store) => {
                store.lock().await.remove(id);
            }
            None => debug!(collection = R::COLLECTION, %id, "view dropped, discarding delete"),
        }
        Ok(())
    }

    /// Create a copy of `id` with identity cleared, status reset and
    /// counters zeroed.
    pub async fn duplicate(&self, actor: Option<&Actor>, id: Uuid) -> Result<R, MutationError> {
        require_actor(actor)?;
        let source = self.target(id).await?;
        self.create(actor, source.duplicate()).await
    }

    /// Live copy of `id` from the store.
    async fn target(&self, id: Uuid) -> Result<R, MutationError> {
        let store = self.store.upgrade().ok_or(MutationError::Detached)?;
        let store = store.lock().await;
        let record = store.get(id).cloned().ok_or(MutationError::NotFound(id))?;
        if record.is_fixture() {
            return Err(ValidationError::FixtureRecord(id).into());
        }
        Ok(record)
    }

    fn begin(&self, target: Target, kind: MutationKind) -> Result<PendingGuard, MutationError> {
        match self.pending.entry(target) {
            Entry::Occupied(entry) => Err(MutationError::Busy { kind: *entry.get() }),
            Entry::Vacant(entry) => {
                entry.insert(kind);
                Ok(PendingGuard {
                    pending: Arc::clone(&self.pending),
                    target,
                })
            }
        }
    }

    fn failed(&self, kind: MutationKind, id: Option<Uuid>, error: RemoteError) -> MutationError {
        warn!(collection = R::COLLECTION, ?id, %kind, error = %error, "mutation failed");
        MutationError::Remote(error)
    }

    /// Upsert a canonical record returned by the service, unless the view is
    /// gone or the store already holds a newer copy.
    async fn apply_saved(&self, saved: R) {
        let Some(store) = self.store.upgrade() else {
            debug!(collection = R::COLLECTION, id = %saved.id(), "view dropped, discarding response");
            return;
        };
        let mut store = store.lock().await;
        if let Some(stored) = store.get(saved.id()) {
            if stored.base().updated_at > saved.base().updated_at {
                debug!(collection = R::COLLECTION, id = %saved.id(), "ignoring stale response");
                return;
            }
        }
        store.upsert(saved);
    }
}

fn require_actor(actor: Option<&Actor>) -> Result<&Actor, ValidationError> {
    actor.ok_or(ValidationError::ActorRequired)
}

fn check_transition<S: Lifecycle>(from: S, to: S) -> Result<(), ValidationError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ValidationError::IllegalTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
