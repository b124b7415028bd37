//! Census statistics for one administrative scope.

use log::debug;
use mongodb::bson::Bson;
use rocket::futures::future::{try_join3, try_join_all};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::query::{Conjunction, NonEmpty, Predicate};
use crate::model::voter::{fields, STANDARD_GENDERS};
use crate::store::VoterStore;

/// Query string of the stats endpoint. Every field narrows the scope.
#[derive(Debug, Clone, Default, FromForm)]
pub struct StatsScope {
    pub district: Option<String>,
    pub lb: Option<String>,
    pub ward: Option<String>,
    pub booth: Option<String>,
}

/// The most specific scope a stats request was narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterLevel {
    State,
    District,
    LocalBody,
    Ward,
    Booth,
}

impl StatsScope {
    fn district(&self) -> Option<NonEmpty> {
        NonEmpty::from_field(self.district.as_deref())
    }

    fn lb(&self) -> Option<NonEmpty> {
        NonEmpty::from_field(self.lb.as_deref())
    }

    fn ward(&self) -> Option<NonEmpty> {
        NonEmpty::from_field(self.ward.as_deref())
    }

    fn booth(&self) -> Option<NonEmpty> {
        NonEmpty::from_field(self.booth.as_deref())
    }

    pub fn level(&self) -> FilterLevel {
        if self.booth().is_some() {
            FilterLevel::Booth
        } else if self.ward().is_some() {
            FilterLevel::Ward
        } else if self.lb().is_some() {
            FilterLevel::LocalBody
        } else if self.district().is_some() {
            FilterLevel::District
        } else {
            FilterLevel::State
        }
    }

    /// Exact equality on every supplied scope field.
    pub fn filter(&self) -> Conjunction {
        [
            (fields::DISTRICT_CODE, self.district()),
            (fields::LB_CODE, self.lb()),
            (fields::WARD_NUMBER, self.ward()),
            (fields::BOOTH_NUMBER, self.booth()),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| Predicate::equals(field, v.into_inner())))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoterStats {
    pub filter_level: FilterLevel,
    pub total_voters: u64,
    pub total_wards: usize,
    pub total_booths: usize,
    pub districts_count: usize,
    pub local_bodies_count: usize,
    pub active_voters: u64,
    pub male_count: u64,
    pub female_count: u64,
    pub other_gender_count: u64,
    pub flagged_voters: u64,
    pub with_phone: u64,
    pub with_location: u64,
    pub missing_location: u64,
    pub avg_age: Option<f64>,
}

/// Round to one decimal place.
fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Gather every statistic for `scope`. All store reads are issued concurrently.
pub async fn collect_stats(store: &dyn VoterStore, scope: &StatsScope) -> Result<VoterStats> {
    let base = scope.filter();
    debug!("Collecting stats with {}", base.to_document());

    let narrowed = |predicate: Predicate| base.clone().with(predicate);
    let counted = [
        base.clone(),
        narrowed(Predicate::equals(fields::VOTER_STATUS, "active")),
        narrowed(Predicate::equals(fields::GENDER, "M")),
        narrowed(Predicate::equals(fields::GENDER, "F")),
        narrowed(Predicate::none_of(fields::GENDER, STANDARD_GENDERS)),
        narrowed(Predicate::equals(fields::IS_FLAGGED, true)),
        narrowed(Predicate::not_equals(fields::PHONE, Bson::Null)),
        base.clone()
            .with(Predicate::Present {
                field: fields::LATITUDE,
            })
            .with(Predicate::Present {
                field: fields::LONGITUDE,
            }),
    ];
    let distinct_fields = [
        fields::WARD_NUMBER,
        fields::BOOTH_NUMBER,
        fields::DISTRICT_CODE,
        fields::LB_CODE,
    ];

    let (counts, distincts, avg_age) = try_join3(
        try_join_all(counted.iter().map(|filter| store.count(filter))),
        try_join_all(distinct_fields.into_iter().map(|field| store.distinct(field, &base))),
        store.average(fields::AGE, &base),
    )
    .await?;

    let [total_voters, active_voters, male_count, female_count, other_gender_count, flagged_voters, with_phone, with_location] =
        <[u64; 8]>::try_from(counts).unwrap_or_default();
    let [total_wards, total_booths, districts_count, local_bodies_count] =
        <[Vec<Bson>; 4]>::try_from(distincts).map_or([0; 4], |lists| lists.map(|list| list.len()));

    Ok(VoterStats {
        filter_level: scope.level(),
        total_voters,
        total_wards,
        total_booths,
        districts_count,
        local_bodies_count,
        active_voters,
        male_count,
        female_count,
        other_gender_count,
        flagged_voters,
        with_phone,
        with_location,
        missing_location: total_voters.saturating_sub(with_location),
        avg_age: avg_age.map(round_tenth),
    })
}
