//! View projection: the filtered display sequence of a store.

use crate::entity::Record;
use crate::filter::{evaluate, Filters};
use crate::store::RecordStore;

/// Records accepted by every filter, in store order.
pub fn project<'a, R: Record>(records: &'a [R], filters: &Filters<R>) -> Vec<&'a R> {
    records.iter().filter(|r| evaluate(*r, filters)).collect()
}

/// Cache of the last projection, keyed on store version and filter set.
#[derive(Debug)]
pub struct ProjectionMemo<R: Record> {
    key: Option<(u64, Filters<R>)>,
    indices: Vec<usize>,
    computed: u64,
}

impl<R: Record> Default for ProjectionMemo<R> {
    fn default() -> Self {
        Self {
            key: None,
            indices: Vec::new(),
            computed: 0,
        }
    }
}

impl<R: Record> ProjectionMemo<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Projection of `store` under `filters`, recomputed only when either
    /// changed since the last call.
    pub fn project<'a>(&mut self, store: &'a RecordStore<R>, filters: &Filters<R>) -> Vec<&'a R> {
        let fresh = matches!(
            &self.key,
            Some((version, cached)) if *version == store.version() && cached == filters
        );
        if !fresh {
            self.indices = store
                .records()
                .iter()
                .enumerate()
                .filter(|(_, r)| evaluate(*r, filters))
                .map(|(i, _)| i)
                .collect();
            self.key = Some((store.version(), filters.clone()));
            self.computed += 1;
        }

        let records = store.records();
        self.indices.iter().filter_map(|&i| records.get(i)).collect()
    }

    /// How many times the projection was actually computed.
    pub fn computations(&self) -> u64 {
        self.computed
    }
}
