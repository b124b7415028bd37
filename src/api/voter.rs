use chrono::Utc;
use log::info;
use mongodb::bson::Document;
use rocket::{http::Status, serde::json::Json, Route};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{
    query::{escape_for_pattern_match, Conjunction, NonEmpty, Predicate},
    response::ApiResponse,
    voter::{fields, VoterChanges, VoterRecord},
};
use crate::store::{FindParams, SortOrder, VoterStore, Voters};

pub fn routes() -> Vec<Route> {
    routes![voter_detail, household, add_voter, update_voter, update_gender, map]
}

/// Find a voter by `sec_id`, falling back to a case-insensitive match of the whole key.
async fn find_voter(store: &dyn VoterStore, raw_sec_id: &str) -> Result<VoterRecord> {
    let sec_id = NonEmpty::new(raw_sec_id).ok_or_else(|| Error::BadRequest("Missing sec_id".to_string()))?;

    let exact = Conjunction::from(Predicate::equals(fields::SEC_ID, sec_id.as_str()));
    if let Some(voter) = store.find_one(&exact).await? {
        return Ok(voter);
    }

    let pattern = format!("^{}$", escape_for_pattern_match(&sec_id));
    let loose = Conjunction::from(Predicate::pattern(fields::SEC_ID, pattern));
    store
        .find_one(&loose)
        .await?
        .ok_or_else(|| Error::not_found("Voter not found"))
}

#[get("/voters/<sec_id>")]
async fn voter_detail(sec_id: &str, voters: Voters) -> Result<Json<ApiResponse<VoterRecord>>> {
    let voter = find_voter(&*voters, sec_id).await?;
    Ok(Json(ApiResponse::ok(voter)))
}

/// Everyone else living at the voter's house, oldest first.
#[get("/voters/<sec_id>/household")]
async fn household(sec_id: &str, voters: Voters) -> Result<Json<ApiResponse<Vec<VoterRecord>>>> {
    let voter = find_voter(&*voters, sec_id).await?;
    let members = match voter.household_filter() {
        Some(filter) => {
            voters
                .find(&filter, &FindParams::sorted(SortOrder::AgeDescending.to_document()))
                .await?
        }
        None => Vec::new(),
    };
    let count = members.len();
    Ok(Json(ApiResponse::ok(members).with_count(count)))
}

#[post("/voters/add", data = "<voter>", format = "json")]
async fn add_voter(
    voter: Json<VoterRecord>,
    voters: Voters,
) -> Result<(Status, Json<ApiResponse<VoterRecord>>)> {
    let voter = voter.into_inner().prepare_insert(Utc::now())?;
    voters.insert(&voter).await?;
    info!("Added voter {}", voter.sec_id);
    Ok((
        Status::Created,
        Json(ApiResponse::ok(voter).with_message("Voter added successfully")),
    ))
}

/// Replace the submitted fields of a voter. The `sec_id` itself can never change, and
/// a field of the wrong type rejects the whole update before anything is written.
#[put("/voters/update/<sec_id>", data = "<changes>", format = "json")]
async fn update_voter(
    sec_id: &str,
    changes: Json<Document>,
    voters: Voters,
) -> Result<Json<ApiResponse<VoterRecord>>> {
    let sec_id = NonEmpty::new(sec_id).ok_or_else(|| Error::BadRequest("Missing sec_id".to_string()))?;
    let changes = VoterChanges::new(changes.into_inner(), Utc::now())?;

    let filter = Conjunction::from(Predicate::equals(fields::SEC_ID, sec_id.as_str()));
    let voter = voters
        .update(&filter, &changes)
        .await?
        .ok_or_else(|| Error::not_found("Voter not found"))?;
    info!("Updated voter {sec_id}");
    Ok(Json(ApiResponse::ok(voter).with_message("Voter updated successfully")))
}

#[derive(Debug, Deserialize)]
struct GenderUpdate {
    sec_id: Option<String>,
    gender: Option<String>,
}

#[post("/voters/update-gender", data = "<request>", format = "json")]
async fn update_gender(
    request: Json<GenderUpdate>,
    voters: Voters,
) -> Result<Json<ApiResponse<VoterRecord>>> {
    let request = request.into_inner();
    let missing = || Error::BadRequest("sec_id and gender are required".to_string());
    let sec_id = NonEmpty::from_field(request.sec_id.as_deref()).ok_or_else(missing)?;
    let gender = NonEmpty::from_field(request.gender.as_deref()).ok_or_else(missing)?;

    let filter = Conjunction::from(Predicate::equals(fields::SEC_ID, sec_id.as_str()));
    let voter = voters
        .update(&filter, &VoterChanges::gender(gender, Utc::now())?)
        .await?
        .ok_or_else(|| Error::not_found("Voter not found"))?;
    Ok(Json(ApiResponse::ok(voter).with_message("Gender updated")))
}

/// Every geotagged voter.
#[get("/map")]
async fn map(voters: Voters) -> Result<Json<ApiResponse<Vec<VoterRecord>>>> {
    let filter = Conjunction::new()
        .with(Predicate::Present {
            field: fields::LATITUDE,
        })
        .with(Predicate::Present {
            field: fields::LONGITUDE,
        });
    let data = voters.find(&filter, &FindParams::default()).await?;
    let count = data.len();
    Ok(Json(ApiResponse::ok(data).with_count(count)))
}
