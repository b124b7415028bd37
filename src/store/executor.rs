//! Runs compiled filters against the store.

use log::debug;
use mongodb::bson::{doc, Document};
use rocket::futures::future::try_join;

use super::{FindParams, VoterStore};
use crate::error::Result;
use crate::model::{pagination::PageRequest, query::Conjunction, voter::VoterRecord};

/// Orderings offered by the listing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// District, local body and ward, then name.
    Location,
    /// Name only.
    Name,
    /// Oldest voter first.
    AgeDescending,
}

impl SortOrder {
    pub fn to_document(self) -> Document {
        match self {
            Self::Location => doc! { "district_code": 1, "lb_code": 1, "ward_number": 1, "name": 1 },
            Self::Name => doc! { "name": 1 },
            Self::AgeDescending => doc! { "age": -1, "name": 1 },
        }
    }
}

/// One page of results with the total number of matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            total: 0,
        }
    }
}

/// Fetch one page and the total match count.
///
/// The two reads are issued concurrently and are not isolated from each other: a write
/// landing between them can make `total` disagree with what paging through `data` yields.
pub async fn fetch_page(
    store: &dyn VoterStore,
    filter: &Conjunction,
    page: &PageRequest,
    sort: SortOrder,
) -> Result<Page<VoterRecord>> {
    debug!("Searching voters with {}", filter.to_document());
    let params = FindParams::page(sort.to_document(), page);
    let (data, total) = try_join(store.find(filter, &params), store.count(filter)).await?;
    Ok(Page { data, total })
}

/// Fetch one page without counting.
pub async fn fetch_list(
    store: &dyn VoterStore,
    filter: &Conjunction,
    page: &PageRequest,
    sort: SortOrder,
) -> Result<Vec<VoterRecord>> {
    debug!("Listing voters with {}", filter.to_document());
    store
        .find(filter, &FindParams::page(sort.to_document(), page))
        .await
}
