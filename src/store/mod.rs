//! In-memory record store: the single source of truth a view reads from.

use std::collections::HashSet;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entity::{Actor, Record};
use crate::remote::{ListQuery, RemoteResult, RemoteService, DEFAULT_PAGE_SIZE};

/// What the last load left in the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    NotLoaded,
    Loaded,
    /// The live collection was empty and fixtures are displayed instead.
    Fixture,
    /// The last load failed; whatever was there before is still displayed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub page_size: usize,
    /// Substitute fixtures when a load comes back empty.
    pub fixtures: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            fixtures: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(usize),
    Fixtures(usize),
    Failed(String),
}

impl LoadOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, LoadOutcome::Failed(_))
    }
}

/// A confirmed mutation applied while a load was in flight.
#[derive(Debug, Clone)]
enum Change<R> {
    Upserted(R),
    Removed(Uuid),
}

/// Handed out by [`RecordStore::begin_load`]; marks the store version the
/// fetch started from.
#[derive(Debug)]
#[must_use]
pub struct LoadTicket {
    since: u64,
}

/// Ordered collection of records, newest first.
#[derive(Debug, Clone)]
pub struct RecordStore<R: Record> {
    records: Vec<R>,
    version: u64,
    state: LoadState,
    loads_in_flight: usize,
    journal: Vec<(u64, Change<R>)>,
}

impl<R: Record> Default for RecordStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> RecordStore<R> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            version: 0,
            state: LoadState::NotLoaded,
            loads_in_flight: 0,
            journal: Vec::new(),
        }
    }

    /// Store seeded with `records` as if loaded.
    pub fn with_records(records: Vec<R>) -> Self {
        let mut store = Self::new();
        store.replace(records);
        store.state = LoadState::Loaded;
        store
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bumped on every content change.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn load_state(&self) -> &LoadState {
        &self.state
    }

    pub fn shows_fixtures(&self) -> bool {
        self.records.iter().any(|r| r.is_fixture())
    }

    pub fn get(&self, id: Uuid) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Fetch the actor's collection and apply it. See [`RecordStore::apply_load`].
    pub async fn load(
        &mut self,
        remote: &dyn RemoteService<R>,
        actor: Option<&Actor>,
        options: &LoadOptions,
    ) -> LoadOutcome {
        let fetched = fetch(remote, actor, options).await;
        self.apply_load(fetched, options)
    }

    /// Apply a fetch that no mutation could have raced with.
    pub fn apply_load(&mut self, fetched: RemoteResult<Vec<R>>, options: &LoadOptions) -> LoadOutcome {
        let ticket = self.begin_load();
        self.finish_load(ticket, fetched, options)
    }

    /// Start tracking a load whose request is about to be sent. Mutations
    /// confirmed from here on are replayed over the fetched collection.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.loads_in_flight += 1;
        LoadTicket { since: self.version }
    }

    /// Apply the result of [`fetch`] for `ticket`. A failed fetch keeps the
    /// current contents; an empty one falls back to fixtures when enabled.
    /// Creates, updates and deletes confirmed after the ticket was issued
    /// survive the refresh.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        fetched: RemoteResult<Vec<R>>,
        options: &LoadOptions,
    ) -> LoadOutcome {
        let outcome = self.reconcile(ticket.since, fetched, options);
        self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
        if self.loads_in_flight == 0 {
            self.journal.clear();
        }
        outcome
    }

    fn reconcile(&mut self, since: u64, fetched: RemoteResult<Vec<R>>, options: &LoadOptions) -> LoadOutcome {
        let records = match fetched {
            Ok(records) => records,
            Err(e) => {
                warn!(collection = R::COLLECTION, error = %e, "load failed, keeping stale records");
                let reason = e.to_string();
                self.state = LoadState::Failed(reason.clone());
                return LoadOutcome::Failed(reason);
            }
        };

        let replay: Vec<Change<R>> = self
            .journal
            .iter()
            .filter(|(version, _)| *version > since)
            .map(|(_, change)| change.clone())
            .collect();

        let restores = replay.iter().any(|change| matches!(change, Change::Upserted(_)));
        if records.is_empty() && options.fixtures && !restores {
            let fixtures = R::fixtures();
            let count = fixtures.len();
            info!(collection = R::COLLECTION, count, "collection empty, showing fixtures");
            self.replace(fixtures);
            self.state = LoadState::Fixture;
            return LoadOutcome::Fixtures(count);
        }

        let count = records.len();
        debug!(collection = R::COLLECTION, count, replayed = replay.len(), "loaded records");
        self.replace(records);
        self.state = LoadState::Loaded;
        for change in replay {
            match change {
                Change::Upserted(record) => {
                    let newer = self
                        .get(record.id())
                        .is_some_and(|fetched| fetched.base().updated_at > record.base().updated_at);
                    if !newer {
                        self.put(record);
                    }
                }
                Change::Removed(id) => {
                    self.take(id);
                }
            }
        }
        LoadOutcome::Loaded(self.records.len())
    }

    /// Swap the whole collection. Later duplicates of an id are dropped.
    pub fn replace(&mut self, records: Vec<R>) {
        let mut seen = HashSet::new();
        self.records = records.into_iter().filter(|r| seen.insert(r.id())).collect();
        self.version += 1;
    }

    /// Insert `record` at the front or replace the stored copy in place.
    ///
    /// Returns false when an identical record is already stored. A live
    /// record evicts any fixtures on display.
    pub fn upsert(&mut self, record: R) -> bool {
        if self.loads_in_flight > 0 && !record.is_fixture() {
            self.journal
                .push((self.version + 1, Change::Upserted(record.clone())));
        }
        self.put(record)
    }

    fn put(&mut self, record: R) -> bool {
        let evict = !record.is_fixture() && self.shows_fixtures();
        if evict {
            self.records.retain(|r| !r.is_fixture());
            self.state = LoadState::Loaded;
            self.version += 1;
        }

        match self.records.iter().position(|r| r.id() == record.id()) {
            Some(index) if self.records[index] == record => return evict,
            Some(index) => self.records[index] = record,
            None => self.records.insert(0, record),
        }
        self.version += 1;
        true
    }

    /// Remove by id, returning the removed record.
    pub fn remove(&mut self, id: Uuid) -> Option<R> {
        if self.loads_in_flight > 0 {
            self.journal.push((self.version + 1, Change::Removed(id)));
        }
        self.take(id)
    }

    fn take(&mut self, id: Uuid) -> Option<R> {
        let index = self.records.iter().position(|r| r.id() == id)?;
        self.version += 1;
        Some(self.records.remove(index))
    }
}

/// Request the actor's live collection. Without an actor this yields an
/// empty collection rather than an error.
pub async fn fetch<R: Record>(
    remote: &dyn RemoteService<R>,
    actor: Option<&Actor>,
    options: &LoadOptions,
) -> RemoteResult<Vec<R>> {
    match actor {
        Some(actor) => remote.list(actor, &ListQuery::with_limit(options.page_size)).await,
        None => {
            debug!(collection = R::COLLECTION, "no actor, skipping load");
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Flow, Survey, SurveyStatus};
    use crate::remote::{MemoryRemote, RemoteError, RemoteOp};

    fn persisted(title: &str) -> Survey {
        let mut survey = Survey::new(title.to_string());
        survey.base.id = Uuid::new_v4();
        survey
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut store = RecordStore::new();
        let survey = persisted("Pulse");

        assert!(store.upsert(survey.clone()));
        let version = store.version();
        let snapshot = store.records().to_vec();

        assert!(!store.upsert(survey));
        assert_eq!(store.records(), snapshot.as_slice());
        assert_eq!(store.version(), version);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let a = persisted("A");
        let b = persisted("B");
        let mut store = RecordStore::with_records(vec![a.clone(), b.clone()]);

        let mut changed = a.clone();
        changed.status = SurveyStatus::Active;
        assert!(store.upsert(changed));

        let ids: Vec<Uuid> = store.records().iter().map(|r| r.base.id).collect();
        assert_eq!(ids, vec![a.base.id, b.base.id]);
        assert_eq!(store.get(a.base.id).unwrap().status, SurveyStatus::Active);
    }

    #[test]
    fn test_upsert_new_goes_first() {
        let a = persisted("A");
        let mut store = RecordStore::with_records(vec![a.clone()]);
        let b = persisted("B");
        store.upsert(b.clone());
        assert_eq!(store.records()[0].base.id, b.base.id);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let a = persisted("A");
        let mut store = RecordStore::with_records(vec![a.clone()]);
        assert!(store.remove(a.base.id).is_some());
        let version = store.version();
        assert!(store.remove(a.base.id).is_none());
        assert_eq!(store.version(), version);
        assert!(store.get(a.base.id).is_none());
    }

    #[test]
    fn test_replace_drops_duplicate_ids() {
        let a = persisted("A");
        let store = RecordStore::with_records(vec![a.clone(), a.clone()]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_live_upsert_clears_fixtures() {
        let mut store: RecordStore<Flow> = RecordStore::new();
        store.apply_load(Ok(Vec::new()), &LoadOptions::default());
        assert_eq!(store.load_state(), &LoadState::Fixture);
        assert!(store.shows_fixtures());

        let mut flow = Flow::new("Real".to_string());
        flow.base.id = Uuid::new_v4();
        store.upsert(flow);

        assert_eq!(store.len(), 1);
        assert!(!store.shows_fixtures());
        assert_eq!(store.load_state(), &LoadState::Loaded);
    }

    #[test]
    fn test_mutations_during_load_survive_refresh() {
        let a = persisted("A");
        let b = persisted("B");
        let mut store = RecordStore::with_records(vec![a.clone(), b.clone()]);

        let ticket = store.begin_load();
        let c = persisted("C");
        store.upsert(c.clone());
        store.remove(b.base.id);
        // the fetch was answered before either mutation
        let outcome = store.finish_load(ticket, Ok(vec![a.clone(), b.clone()]), &LoadOptions::default());

        let ids: Vec<Uuid> = store.records().iter().map(|r| r.base.id).collect();
        assert_eq!(ids, vec![c.base.id, a.base.id]);
        assert_eq!(outcome, LoadOutcome::Loaded(2));
        assert!(store.journal.is_empty());
    }

    #[test]
    fn test_refresh_keeps_newer_fetched_copy() {
        let a = persisted("A");
        let mut store = RecordStore::with_records(vec![a.clone()]);

        let ticket = store.begin_load();
        store.upsert(a.clone());
        let mut newer = a.clone();
        newer.title = "A v2".to_string();
        newer.base.updated_at = a.base.updated_at + chrono::Duration::minutes(1);
        store.finish_load(ticket, Ok(vec![newer]), &LoadOptions::default());

        assert_eq!(store.get(a.base.id).unwrap().title, "A v2");
    }

    #[test]
    fn test_create_during_empty_load_replaces_fixtures() {
        let mut store: RecordStore<Flow> = RecordStore::new();
        let ticket = store.begin_load();
        let mut flow = Flow::new("Real".to_string());
        flow.base.id = Uuid::new_v4();
        store.upsert(flow.clone());

        let outcome = store.finish_load(ticket, Ok(Vec::new()), &LoadOptions::default());
        assert_eq!(outcome, LoadOutcome::Loaded(1));
        assert_eq!(store.records(), &[flow]);
        assert_eq!(store.load_state(), &LoadState::Loaded);
    }

    #[test]
    fn test_mutations_before_ticket_are_not_replayed() {
        let a = persisted("A");
        let b = persisted("B");
        let mut store = RecordStore::with_records(vec![a.clone()]);

        let outer = store.begin_load();
        store.upsert(b.clone());
        let inner = store.begin_load();
        store.finish_load(inner, Ok(vec![a.clone()]), &LoadOptions::default());
        assert_eq!(store.records(), &[a.clone()]);

        store.finish_load(outer, Ok(vec![a.clone()]), &LoadOptions::default());
        let ids: Vec<Uuid> = store.records().iter().map(|r| r.base.id).collect();
        assert_eq!(ids, vec![b.base.id, a.base.id]);
        assert!(store.journal.is_empty());
    }

    #[tokio::test]
    async fn test_load_without_actor_is_empty() {
        let remote = MemoryRemote::new();
        let mut store: RecordStore<Survey> = RecordStore::new();
        let options = LoadOptions {
            fixtures: false,
            ..LoadOptions::default()
        };

        let outcome = store.load(&remote, None, &options).await;
        assert_eq!(outcome, LoadOutcome::Loaded(0));
        assert!(store.is_empty());
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_load_falls_back_to_fixtures() {
        let remote = MemoryRemote::new();
        let mut store: RecordStore<Survey> = RecordStore::new();
        let outcome = store
            .load(&remote, Some(&Actor::new("alice")), &LoadOptions::default())
            .await;

        assert_eq!(outcome, LoadOutcome::Fixtures(Survey::fixtures().len()));
        assert!(store.records().iter().all(|r| r.is_fixture()));
    }

    #[tokio::test]
    async fn test_failed_load_keeps_stale_records() {
        let remote = MemoryRemote::new();
        let a = persisted("A");
        let mut store = RecordStore::with_records(vec![a.clone()]);

        remote
            .fail_next(RemoteOp::List, RemoteError::Unavailable("timeout".to_string()))
            .await;
        let outcome = store
            .load(&remote, Some(&Actor::new("alice")), &LoadOptions::default())
            .await;

        assert!(outcome.is_failure());
        assert_eq!(store.records(), &[a]);
        assert!(matches!(store.load_state(), LoadState::Failed(_)));
    }
}
