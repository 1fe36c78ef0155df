//! Collection view controller: one per dashboard collection.
//!
//! Owns the record store and wires it to the gateway, the active filters
//! and the memoized projection. Dropping the view drops the store, after
//! which responses to in-flight mutations are discarded.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::entity::{Actor, Record};
use crate::filter::Filters;
use crate::gateway::MutationGateway;
use crate::projection::ProjectionMemo;
use crate::remote::{DeleteMode, RemoteService};
use crate::store::{fetch, LoadOptions, LoadOutcome, LoadState, RecordStore};

pub struct CollectionView<R: Record> {
    store: Arc<Mutex<RecordStore<R>>>,
    remote: Arc<dyn RemoteService<R>>,
    gateway: MutationGateway<R>,
    filters: Filters<R>,
    memo: ProjectionMemo<R>,
    options: LoadOptions,
}

impl<R: Record> CollectionView<R> {
    pub fn new(remote: Arc<dyn RemoteService<R>>, options: LoadOptions, delete_mode: DeleteMode) -> Self {
        let store = Arc::new(Mutex::new(RecordStore::new()));
        let gateway = MutationGateway::new(Arc::clone(&remote), &store, delete_mode);
        Self {
            store,
            remote,
            gateway,
            filters: Filters::<R>::default(),
            memo: ProjectionMemo::new(),
            options,
        }
    }

    /// Refresh the store from the remote service. The store lock is not held
    /// while the request is in flight, so mutations confirmed meanwhile are
    /// carried over onto the fetched collection.
    pub async fn load(&self, actor: Option<&Actor>) -> LoadOutcome {
        let ticket = self.store.lock().await.begin_load();
        let fetched = fetch(&*self.remote, actor, &self.options).await;
        self.store.lock().await.finish_load(ticket, fetched, &self.options)
    }

    pub fn gateway(&self) -> &MutationGateway<R> {
        &self.gateway
    }

    pub fn filters(&self) -> &Filters<R> {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: Filters<R>) {
        self.filters = filters;
    }

    pub fn update_filters(&mut self, change: impl FnOnce(&mut Filters<R>)) {
        change(&mut self.filters);
    }

    pub fn clear_filters(&mut self) {
        self.filters = Filters::<R>::default();
    }

    pub async fn load_state(&self) -> LoadState {
        self.store.lock().await.load_state().clone()
    }

    /// Full store contents in display order.
    pub async fn records(&self) -> Vec<R> {
        self.store.lock().await.records().to_vec()
    }

    pub async fn get(&self, id: uuid::Uuid) -> Option<R> {
        self.store.lock().await.get(id).cloned()
    }

    /// Records passing the active filters, in store order.
    pub async fn projection(&mut self) -> Vec<R> {
        let store = self.store.lock().await;
        self.memo
            .project(&store, &self.filters)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Run an aggregation over the unfiltered store contents.
    pub async fn summarize<S>(&self, aggregate: impl FnOnce(&[R]) -> S) -> S {
        let store = self.store.lock().await;
        aggregate(store.records())
    }

    /// Number of times the projection was recomputed.
    pub fn projection_computations(&self) -> u64 {
        self.memo.computations()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Survey, SurveyStatus};
    use crate::remote::MemoryRemote;

    #[tokio::test]
    async fn test_projection_is_memoized_until_store_changes() {
        let remote = Arc::new(MemoryRemote::new());
        let actor = Actor::new("alice");
        remote
            .insert(&actor, Survey::new("Pulse".to_string()))
            .await
            .unwrap();

        let mut view: CollectionView<Survey> =
            CollectionView::new(remote, LoadOptions::default(), DeleteMode::Soft);
        view.load(Some(&actor)).await;

        assert_eq!(view.projection().await.len(), 1);
        assert_eq!(view.projection().await.len(), 1);
        assert_eq!(view.projection_computations(), 1);

        view.gateway()
            .create(Some(&actor), Survey::new("Churn".to_string()))
            .await
            .unwrap();
        assert_eq!(view.projection().await.len(), 2);
        assert_eq!(view.projection_computations(), 2);

        view.update_filters(|f| f.status = crate::filter::Selector::Only(SurveyStatus::Active));
        assert!(view.projection().await.is_empty());
        assert_eq!(view.records().await.len(), 2);
    }
}
