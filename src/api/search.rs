use log::debug;
use rocket::{serde::json::Json, Route, State};

use crate::config::Config;
use crate::error::Result;
use crate::model::{
    pagination::PageRequest,
    query::{compile, Compiled, Conjunction, NameMatch, VoterFilters},
    response::ApiResponse,
    voter::VoterRecord,
};
use crate::store::{fetch_list, fetch_page, Page, SortOrder, Voters};

pub fn routes() -> Vec<Route> {
    routes![search, list_voters]
}

/// Paginated search over any combination of the filter fields.
///
/// A request carrying no usable filter gets an empty page without the store being
/// touched, so an accidental blank search never scans the whole census.
#[get("/search?<skip>&<limit>&<filters..>")]
async fn search(
    skip: Option<u64>,
    limit: Option<u64>,
    filters: VoterFilters,
    config: &State<Config>,
    voters: Voters,
) -> Result<Json<ApiResponse<Vec<VoterRecord>>>> {
    let page = PageRequest::new(skip, limit, config.search_page_size(), config.max_page_size())?;

    let page = match compile(&filters.normalize(), NameMatch::Substring) {
        Compiled::NoFilters => {
            debug!("Search without filters, returning nothing");
            Page::empty()
        }
        Compiled::Filter(filter) => fetch_page(&*voters, &filter, &page, SortOrder::Location).await?,
    };

    Ok(Json(ApiResponse::ok(page.data).with_total(page.total)))
}

/// Bulk listing by name. Without filters this pages through the whole census.
#[get("/voters?<skip>&<limit>&<filters..>")]
async fn list_voters(
    skip: Option<u64>,
    limit: Option<u64>,
    filters: VoterFilters,
    config: &State<Config>,
    voters: Voters,
) -> Result<Json<ApiResponse<Vec<VoterRecord>>>> {
    let page = PageRequest::new(skip, limit, config.list_page_size(), config.max_page_size())?;
    let filter = compile(&filters.normalize(), NameMatch::Prefix)
        .into_filter()
        .unwrap_or_else(Conjunction::new);

    let data = fetch_list(&*voters, &filter, &page, SortOrder::Name).await?;
    Ok(Json(ApiResponse::ok(data)))
}
