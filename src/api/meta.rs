use log::debug;
use rocket::{serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    meta::{others_filter, sort_choices, Choice, MetaQuery},
    response::ApiResponse,
    stats::{collect_stats, StatsScope, VoterStats},
    voter::{OtherVoter, VoterRecord},
};
use crate::store::{FindParams, Voters};

pub fn routes() -> Vec<Route> {
    routes![meta, others, voter_stats]
}

/// Options for the cascading district, local body, ward and booth selectors.
#[get("/voters/meta?<query..>")]
async fn meta(query: MetaQuery, voters: Voters) -> Result<Json<ApiResponse<Vec<Choice>>>> {
    let plan = query.plan()?;
    debug!("Listing {} choices with {}", plan.code_field, plan.scope.to_document());

    let mut choices = voters
        .group_pairs(&plan.scope, plan.code_field, plan.name_field)
        .await?;
    sort_choices(&mut choices, plan.order);
    Ok(Json(ApiResponse::ok(choices)))
}

/// Voters whose gender still needs curating.
#[get("/voters/others")]
async fn others(voters: Voters) -> Result<Json<ApiResponse<Vec<OtherVoter>>>> {
    let params = FindParams::default().with_projection(OtherVoter::projection());
    let data: Vec<OtherVoter> = voters
        .find(&others_filter(), &params)
        .await?
        .into_iter()
        .map(VoterRecord::into)
        .collect();
    let count = data.len();
    Ok(Json(ApiResponse::ok(data).with_count(count)))
}

#[get("/voters/stats?<scope..>")]
async fn voter_stats(scope: StatsScope, voters: Voters) -> Result<Json<ApiResponse<VoterStats>>> {
    let stats = collect_stats(&*voters, &scope).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{to_document, Bson};
    use rocket::{
        http::Status,
        local::asynchronous::{Client, LocalResponse},
        serde::json::serde_json,
    };
    use serde::de::DeserializeOwned;

    use crate::model::{response::ApiFailure, stats::FilterLevel};
    use crate::store::MemoryStore;

    use super::*;

    async fn read<T: DeserializeOwned>(response: LocalResponse<'_>) -> T {
        let raw_response = response.into_string().await.unwrap();
        serde_json::from_str(&raw_response).unwrap()
    }

    fn pair(code: &str, name: &str) -> Choice {
        Choice {
            code: Some(code.to_string()),
            name: Some(name.to_string()),
        }
    }

    async fn choices(client: &Client, uri: &str) -> Vec<Choice> {
        let response = client.get(uri).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        read::<ApiResponse<Vec<Choice>>>(response).await.data
    }

    #[backend_test(seeded)]
    async fn districts_sorted_by_name(client: Client) {
        assert_eq!(
            choices(&client, "/api/voters/meta?type=districts").await,
            vec![pair("08", "ERNAKULAM"), pair("07", "THRISSUR")]
        );
    }

    #[backend_test(seeded)]
    async fn local_bodies_sorted_by_name(client: Client) {
        assert_eq!(
            choices(&client, "/api/voters/meta?type=lbs").await,
            vec![pair("G08001", "Aluva"), pair("G07001", "Chalakudy")]
        );
    }

    #[backend_test(seeded)]
    async fn wards_within_district_sorted_by_code(client: Client) {
        assert_eq!(
            choices(&client, "/api/voters/meta?type=wards&district=08").await,
            vec![pair("014", "Thottakkattukara"), pair("14", "Thottakkattukara")]
        );
    }

    #[backend_test(seeded)]
    async fn booths_by_ward_or_local_body(client: Client) {
        assert_eq!(
            choices(&client, "/api/voters/meta?type=booths&lb=G08001").await,
            vec![pair("1", "Govt LP School"), pair("2", "Govt LP School")]
        );
        // Ward takes precedence over the local body.
        assert_eq!(
            choices(&client, "/api/voters/meta?type=booths&lb=G08001&ward=5").await,
            vec![pair("1", "Govt LP School")]
        );
    }

    #[backend_test(seeded)]
    async fn invalid_meta_requests_are_rejected(client: Client, store: MemoryStore) {
        for (uri, message) in [
            ("/api/voters/meta", "Missing type parameter"),
            ("/api/voters/meta?type=houses", "Invalid type"),
            ("/api/voters/meta?type=wards", "district required"),
            ("/api/voters/meta?type=booths&district=08", "ward or lb must be provided"),
        ] {
            let response = client.get(uri).dispatch().await;
            assert_eq!(Status::BadRequest, response.status());
            let body: ApiFailure = read(response).await;
            assert_eq!(body.error, message);
        }
        assert_eq!(store.calls(), 0);
    }

    #[backend_test]
    async fn others_lists_every_unknown_gender(client: Client, store: MemoryStore) {
        for (sec_id, gender) in [
            ("G1", Some(Bson::String("M".to_string()))),
            ("G2", Some(Bson::String("F".to_string()))),
            ("G3", Some(Bson::String(String::new()))),
            ("G4", Some(Bson::Null)),
            ("G5", Some(Bson::String("-".to_string()))),
            ("G6", Some(Bson::String("X".to_string()))),
            ("G7", None),
        ] {
            let mut voter = VoterRecord::example(sec_id, "Voter");
            voter.gender = None;
            let mut document = to_document(&voter).unwrap();
            if let Some(gender) = gender {
                document.insert("gender", gender);
            }
            store.insert_raw(document);
        }

        let response = client.get("/api/voters/others").dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let body: ApiResponse<Vec<OtherVoter>> = read(response).await;
        let found: Vec<&str> = body.data.iter().map(|v| v.sec_id.as_str()).collect();
        assert_eq!(found, vec!["G3", "G4", "G5", "G6", "G7"]);
        assert_eq!(body.count, Some(5));
        assert_eq!(body.data[3].gender.as_deref(), Some("X"));
        assert_eq!(body.data[3].guardian_name, "Raghavan");
    }

    #[backend_test(seeded)]
    async fn stats_for_the_whole_state(client: Client) {
        let response = client.get("/api/voters/stats").dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let stats = read::<ApiResponse<VoterStats>>(response).await.data;
        assert_eq!(stats.filter_level, FilterLevel::State);
        assert_eq!(stats.total_voters, 5);
        assert_eq!(stats.districts_count, 2);
        assert_eq!(stats.local_bodies_count, 2);
        assert_eq!(stats.male_count, 2);
        assert_eq!(stats.female_count, 2);
        assert_eq!(stats.other_gender_count, 1);
        assert_eq!(stats.with_phone, 1);
        assert_eq!(stats.with_location, 1);
        assert_eq!(stats.missing_location, 4);
        assert_eq!(stats.avg_age, Some(44.8));
    }

    #[backend_test(seeded)]
    async fn stats_for_one_booth(client: Client) {
        let response = client
            .get("/api/voters/stats?district=08&booth=2")
            .dispatch()
            .await;
        let stats = read::<ApiResponse<VoterStats>>(response).await.data;
        assert_eq!(stats.filter_level, FilterLevel::Booth);
        assert_eq!(stats.total_voters, 2);
        assert_eq!(stats.total_wards, 2);
        assert_eq!(stats.total_booths, 1);
    }
}
