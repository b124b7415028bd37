//! Access to the voter collection.
//!
//! Handlers never talk to MongoDB directly: they receive a [`Voters`] request guard
//! wrapping the [`VoterStore`] placed in managed state at ignition.

use std::ops::Deref;
use std::sync::Arc;

use mongodb::bson::{Bson, Document};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::error::Result;
use crate::model::{
    meta::Choice,
    pagination::PageRequest,
    query::Conjunction,
    voter::{VoterChanges, VoterRecord},
};

mod executor;
#[cfg(test)]
mod memory;
mod mongo;

pub use executor::{fetch_list, fetch_page, Page, SortOrder};
#[cfg(test)]
pub use memory::MemoryStore;
pub use mongo::{ensure_indexes_exist, MongoStore};

/// How to order, window and project a `find`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindParams {
    pub sort: Document,
    pub skip: u64,
    /// `None` returns every match.
    pub limit: Option<u64>,
    pub projection: Option<Document>,
}

impl FindParams {
    pub fn sorted(sort: Document) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    pub fn page(sort: Document, page: &PageRequest) -> Self {
        Self {
            sort,
            skip: page.skip(),
            limit: Some(page.limit()),
            projection: None,
        }
    }

    pub fn with_projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }
}

/// The operations the census needs from its document store.
#[rocket::async_trait]
pub trait VoterStore: Send + Sync {
    /// Records matching `filter`, ordered and windowed by `params`.
    async fn find(&self, filter: &Conjunction, params: &FindParams) -> Result<Vec<VoterRecord>>;

    /// Number of records matching `filter`.
    async fn count(&self, filter: &Conjunction) -> Result<u64>;

    async fn find_one(&self, filter: &Conjunction) -> Result<Option<VoterRecord>>;

    /// Distinct values of `field` among records matching `filter`.
    async fn distinct(&self, field: &'static str, filter: &Conjunction) -> Result<Vec<Bson>>;

    /// Distinct `(code, name)` pairs among records matching `filter`, in no particular order.
    async fn group_pairs(
        &self,
        filter: &Conjunction,
        code_field: &'static str,
        name_field: &'static str,
    ) -> Result<Vec<Choice>>;

    /// Mean of the numeric `field` over records matching `filter`, if any have one.
    async fn average(&self, field: &'static str, filter: &Conjunction) -> Result<Option<f64>>;

    /// Insert a new record. A duplicate `sec_id` is a conflict.
    async fn insert(&self, voter: &VoterRecord) -> Result<()>;

    /// Apply `changes` to the first record matching `filter`, returning it as updated.
    async fn update(&self, filter: &Conjunction, changes: &VoterChanges) -> Result<Option<VoterRecord>>;
}

/// The store handle kept in Rocket's managed state.
pub type SharedStore = Arc<dyn VoterStore>;

/// Request guard giving a handler the voter store.
#[derive(Clone)]
pub struct Voters(SharedStore);

impl Voters {
    pub fn new(store: SharedStore) -> Self {
        Self(store)
    }
}

impl Deref for Voters {
    type Target = dyn VoterStore;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Voters {
    type Error = ();

    /// Fails with a 500 iff no store is managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        req.guard::<&State<SharedStore>>()
            .await
            .map(|store| Voters(store.inner().clone()))
    }
}
