use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use super::{
    stamp_insert, stamp_update, DeleteMode, ListQuery, RemoteError, RemoteResult, RemoteService,
};
use crate::entity::{Actor, Origin, Record};

/// Operations of the remote contract, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    List,
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
struct Row {
    collection: &'static str,
    id: Uuid,
    actor: String,
    parent_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    seq: u64,
    body: serde_json::Value,
}

#[derive(Default)]
struct State {
    rows: Vec<Row>,
    next_seq: u64,
    failures: HashMap<RemoteOp, RemoteError>,
}

/// In-process remote service.
///
/// Besides plain storage it can fail the next call of a given kind and hold
/// writes until released, which is how tests exercise failure reconciliation
/// and out-of-order responses.
pub struct MemoryRemote {
    state: Mutex<State>,
    writes_open: watch::Sender<bool>,
    lists_open: watch::Sender<bool>,
    calls: AtomicUsize,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        let (writes_open, _) = watch::channel(true);
        let (lists_open, _) = watch::channel(true);
        Self {
            state: Mutex::new(State::default()),
            writes_open,
            lists_open,
            calls: AtomicUsize::new(0),
        }
    }

    /// Make the next call of kind `op` fail with `error`.
    pub async fn fail_next(&self, op: RemoteOp, error: RemoteError) {
        self.state.lock().await.failures.insert(op, error);
    }

    /// Hold every insert, update and delete until [`resume_writes`](Self::resume_writes).
    pub fn pause_writes(&self) {
        self.writes_open.send_replace(false);
    }

    pub fn resume_writes(&self) {
        self.writes_open.send_replace(true);
    }

    /// Hold list responses until [`resume_lists`](Self::resume_lists). A held
    /// list still answers with the rows stored when it arrived.
    pub fn pause_lists(&self) {
        self.lists_open.send_replace(false);
    }

    pub fn resume_lists(&self) {
        self.lists_open.send_replace(true);
    }

    /// Number of calls that reached the service.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Store already-canonical records as-is, keeping their ids and
    /// timestamps. Records are owned by `actor`.
    pub async fn import<R: Record>(&self, actor: &Actor, records: Vec<R>) -> RemoteResult<()> {
        let mut state = self.state.lock().await;
        for mut record in records {
            let base = record.base_mut();
            base.created_by = Some(actor.id.clone());
            base.origin = Origin::Live;
            let row = encode(&mut state, actor, &record)?;
            state.rows.push(row);
        }
        Ok(())
    }

    /// Rows of a collection including soft-deleted ones, for inspection.
    pub async fn raw_count(&self, collection: &str) -> usize {
        let state = self.state.lock().await;
        state.rows.iter().filter(|r| r.collection == collection).count()
    }

    async fn enter(&self, op: RemoteOp) -> RemoteResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if op != RemoteOp::List {
            let mut open = self.writes_open.subscribe();
            // the sender lives as long as self, so this only errors on teardown
            let _ = open.wait_for(|open| *open).await;
        }
        match self.state.lock().await.failures.remove(&op) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn encode<R: Record>(state: &mut State, actor: &Actor, record: &R) -> RemoteResult<Row> {
    state.next_seq += 1;
    Ok(Row {
        collection: R::COLLECTION,
        id: record.id(),
        actor: actor.id.clone(),
        parent_id: record.parent_id(),
        created_at: record.base().created_at,
        deleted_at: record.base().deleted_at,
        seq: state.next_seq,
        body: serde_json::to_value(record)?,
    })
}

fn live_row<'a, R: Record>(rows: &'a mut [Row], actor: &Actor, id: Uuid) -> Option<&'a mut Row> {
    rows.iter_mut().find(|r| {
        r.collection == R::COLLECTION && r.id == id && r.actor == actor.id && r.deleted_at.is_none()
    })
}

#[async_trait]
impl<R: Record> RemoteService<R> for MemoryRemote {
    async fn list(&self, actor: &Actor, query: &ListQuery) -> RemoteResult<Vec<R>> {
        self.enter(RemoteOp::List).await?;
        let listed: RemoteResult<Vec<R>> = {
            let state = self.state.lock().await;
            let mut rows: Vec<&Row> = state
                .rows
                .iter()
                .filter(|r| r.collection == R::COLLECTION && r.actor == actor.id)
                .filter(|r| query.include_deleted || r.deleted_at.is_none())
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.seq.cmp(&a.seq)));

            rows.into_iter()
                .take(query.limit)
                .map(|r| serde_json::from_value(r.body.clone()).map_err(RemoteError::from))
                .collect()
        };

        let mut open = self.lists_open.subscribe();
        let _ = open.wait_for(|open| *open).await;
        listed
    }

    async fn insert(&self, actor: &Actor, mut record: R) -> RemoteResult<R> {
        self.enter(RemoteOp::Insert).await?;
        let mut state = self.state.lock().await;

        stamp_insert(&mut record, actor, Utc::now());
        let row = encode(&mut state, actor, &record)?;
        state.rows.push(row);
        Ok(record)
    }

    async fn update(&self, actor: &Actor, mut record: R) -> RemoteResult<R> {
        self.enter(RemoteOp::Update).await?;
        let mut state = self.state.lock().await;

        let id = record.id();
        let row = live_row::<R>(&mut state.rows, actor, id).ok_or(RemoteError::NotFound(id))?;
        let stored: R = serde_json::from_value(row.body.clone())?;
        stamp_update(&mut record, &stored, Utc::now());
        row.parent_id = record.parent_id();
        row.body = serde_json::to_value(&record)?;
        Ok(record)
    }

    async fn delete(&self, actor: &Actor, id: Uuid, mode: DeleteMode) -> RemoteResult<()> {
        self.enter(RemoteOp::Delete).await?;
        let mut state = self.state.lock().await;

        if live_row::<R>(&mut state.rows, actor, id).is_none() {
            return Err(RemoteError::NotFound(id));
        }

        let doomed = |r: &Row| {
            (r.collection == R::COLLECTION && r.id == id)
                || (R::DEPENDENTS.contains(&r.collection) && r.parent_id == Some(id))
        };
        match mode {
            DeleteMode::Soft => {
                let now = Utc::now();
                for row in state.rows.iter_mut().filter(|r| doomed(&**r)) {
                    if row.deleted_at.is_none() {
                        row.deleted_at = Some(now);
                    }
                }
            }
            DeleteMode::Hard => state.rows.retain(|r| !doomed(r)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Survey, SurveyResponse, SurveyStatus};

    fn actor() -> Actor {
        Actor::new("alice")
    }

    #[tokio::test]
    async fn test_insert_assigns_identity() {
        let remote = MemoryRemote::new();
        let saved = remote
            .insert(&actor(), Survey::new("Pulse".to_string()))
            .await
            .unwrap();
        assert!(!saved.base.id.is_nil());
        assert_eq!(saved.base.created_by.as_deref(), Some("alice"));
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_newest_first() {
        let remote = MemoryRemote::new();
        let first = remote.insert(&actor(), Survey::new("First".to_string())).await.unwrap();
        let second = remote.insert(&actor(), Survey::new("Second".to_string())).await.unwrap();
        remote
            .insert(&Actor::new("bob"), Survey::new("Other".to_string()))
            .await
            .unwrap();

        let listed: Vec<Survey> = remote.list(&actor(), &ListQuery::default()).await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|s| s.base.id).collect();
        assert_eq!(ids, vec![second.base.id, first.base.id]);

        let capped: Vec<Survey> = remote.list(&actor(), &ListQuery::with_limit(1)).await.unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let remote = MemoryRemote::new();
        let mut ghost = Survey::new("Ghost".to_string());
        ghost.base.id = Uuid::new_v4();
        let err = remote.update(&actor(), ghost).await.unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_is_owner_scoped() {
        let remote = MemoryRemote::new();
        let saved = remote.insert(&actor(), Survey::new("Pulse".to_string())).await.unwrap();
        let err = remote.update(&Actor::new("bob"), saved).await.unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_soft_delete_cascades_to_responses() {
        let remote = MemoryRemote::new();
        let survey = remote.insert(&actor(), Survey::new("Pulse".to_string())).await.unwrap();
        let mut response = SurveyResponse::new(survey.base.id);
        response.nps_score = Some(9);
        remote.insert(&actor(), response).await.unwrap();

        RemoteService::<Survey>::delete(&remote, &actor(), survey.base.id, DeleteMode::Soft)
            .await
            .unwrap();

        let surveys: Vec<Survey> = remote.list(&actor(), &ListQuery::default()).await.unwrap();
        let responses: Vec<SurveyResponse> =
            remote.list(&actor(), &ListQuery::default()).await.unwrap();
        assert!(surveys.is_empty());
        assert!(responses.is_empty());
        assert_eq!(remote.raw_count("survey_responses").await, 1);
    }

    #[tokio::test]
    async fn test_hard_delete_removes_rows() {
        let remote = MemoryRemote::new();
        let survey = remote.insert(&actor(), Survey::new("Pulse".to_string())).await.unwrap();
        RemoteService::<Survey>::delete(&remote, &actor(), survey.base.id, DeleteMode::Hard)
            .await
            .unwrap();
        assert_eq!(remote.raw_count("surveys").await, 0);
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let remote = MemoryRemote::new();
        remote
            .fail_next(RemoteOp::Insert, RemoteError::Rejected("quota exceeded".to_string()))
            .await;
        let err = remote
            .insert(&actor(), Survey::new("Pulse".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::Rejected("quota exceeded".to_string()));
        assert!(remote.insert(&actor(), Survey::new("Pulse".to_string())).await.is_ok());
    }

    #[tokio::test]
    async fn test_import_keeps_timestamps() {
        let remote = MemoryRemote::new();
        let mut old = Survey::new("Old".to_string());
        old.base.id = Uuid::new_v4();
        old.base.created_at = Utc::now() - chrono::Duration::days(30);
        old.status = SurveyStatus::Closed;
        remote.import(&actor(), vec![old.clone()]).await.unwrap();
        remote.insert(&actor(), Survey::new("New".to_string())).await.unwrap();

        let listed: Vec<Survey> = remote.list(&actor(), &ListQuery::default()).await.unwrap();
        assert_eq!(listed[1].base.id, old.base.id);
        assert_eq!(listed[1].base.created_at, old.base.created_at);
    }
}
