use chrono::{DateTime, Utc};
use mongodb::bson::{self, doc, from_document, to_document, Bson, Document};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::query::{Conjunction, NonEmpty, Predicate};

/// Document field names, shared by the compiler, the aggregator and the stores.
pub mod fields {
    pub const DISTRICT_CODE: &str = "district_code";
    pub const DISTRICT_NAME: &str = "district_name";
    pub const LB_CODE: &str = "lb_code";
    pub const LB_NAME: &str = "lb_name";
    pub const WARD_NUMBER: &str = "ward_number";
    pub const WARD_NAME: &str = "ward_name";
    pub const BOOTH_NUMBER: &str = "booth_number";
    pub const BOOTH_NAME: &str = "booth_name";
    pub const SEC_ID: &str = "sec_id";
    pub const NAME: &str = "name";
    pub const AGE: &str = "age";
    pub const GENDER: &str = "gender";
    pub const GUARDIAN_NAME: &str = "guardian_name";
    pub const HOUSE_NO: &str = "house_no";
    pub const HOUSE_NAME: &str = "house_name";
    pub const PHONE: &str = "phone";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const LOCATION: &str = "location";
    pub const VOTER_STATUS: &str = "voter_status";
    pub const IS_FLAGGED: &str = "is_flagged";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
}

/// The two gender codes that need no curation.
pub const STANDARD_GENDERS: [&str; 2] = ["M", "F"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoterStatus {
    Active,
    Inactive,
}

/// GeoJSON point mirroring a record's `latitude`/`longitude`. Coordinates are `[lon, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [Option<f64>; 2],
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [Some(longitude), Some(latitude)],
        }
    }
}

/// Audit timestamps stored as BSON dates.
///
/// Reads also accept RFC 3339 strings, which older imports wrote.
mod optional_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson::{serde_helpers::chrono_datetime_as_bson_datetime, Bson};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(date_time) => chrono_datetime_as_bson_datetime::serialize(date_time, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<Bson>::deserialize(deserializer)? {
            None | Some(Bson::Null) => Ok(None),
            Some(Bson::DateTime(date_time)) => Ok(Some(date_time.to_chrono())),
            Some(Bson::String(text)) => DateTime::parse_from_rfc3339(&text)
                .map(|date_time| Some(date_time.with_timezone(&Utc)))
                .map_err(D::Error::custom),
            Some(other) => Err(D::Error::custom(format!("expected a date, found {other}"))),
        }
    }
}

/// A voter as stored in the census collection.
///
/// Historical imports are inconsistent, so every field tolerates being missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoterRecord {
    // Administrative location.
    pub state: String,
    pub district_code: String,
    pub district_name: String,
    pub lb_code: String,
    pub lb_name: String,
    pub lb_type: String,
    pub ward_number: String,
    pub ward_name: String,
    pub booth_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booth_name: Option<String>,

    // Person.
    pub sec_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    pub guardian_name: String,

    // Household.
    pub house_no: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub house_name: Option<String>,

    // Contact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_phone: Option<String>,

    // Geotag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,

    // Status and audit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voter_status: Option<VoterStatus>,
    pub is_flagged: bool,
    #[serde(skip_serializing_if = "Option::is_none", with = "optional_bson_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", with = "optional_bson_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl VoterRecord {
    /// Validate a record submitted for insertion and stamp its audit fields.
    pub fn prepare_insert(mut self, now: DateTime<Utc>) -> Result<Self> {
        self.sec_id = NonEmpty::new(&self.sec_id)
            .ok_or_else(|| Error::BadRequest("Missing sec_id".to_string()))?
            .into_inner();
        if self.location.is_none() {
            if let (Some(lat), Some(lon)) = (self.latitude, self.longitude) {
                self.location = Some(GeoPoint::new(lon, lat));
            }
        }
        self.created_at = Some(now);
        self.updated_at = Some(now);
        Ok(self)
    }

    /// Filter selecting the other members of this voter's household.
    ///
    /// A household is every record sharing house number, ward, district and local
    /// body. Returns `None` if any of those is blank, since no household can be derived.
    pub fn household_filter(&self) -> Option<Conjunction> {
        let house_no = NonEmpty::new(&self.house_no)?;
        let ward_number = NonEmpty::new(&self.ward_number)?;
        let district_code = NonEmpty::new(&self.district_code)?;
        let lb_code = NonEmpty::new(&self.lb_code)?;
        Some(
            Conjunction::new()
                .with(Predicate::equals(fields::HOUSE_NO, house_no.into_inner()))
                .with(Predicate::equals(fields::WARD_NUMBER, ward_number.into_inner()))
                .with(Predicate::equals(fields::DISTRICT_CODE, district_code.into_inner()))
                .with(Predicate::equals(fields::LB_CODE, lb_code.into_inner()))
                .with(Predicate::not_equals(fields::SEC_ID, self.sec_id.as_str())),
        )
    }
}

/// The fields a client may change, typed exactly as in [`VoterRecord`].
///
/// Absent and `null` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VoterPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lb_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lb_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lb_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ward_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ward_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booth_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booth_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardian_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub house_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub house_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voter_status: Option<VoterStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_flagged: Option<bool>,
}

/// A validated partial update to a voter, ready to be `$set`.
#[derive(Debug, Clone, PartialEq)]
pub struct VoterChanges(Document);

impl VoterChanges {
    /// Fields the server owns. Submitted values for them are discarded.
    const SERVER_MANAGED: [&'static str; 4] = ["_id", fields::SEC_ID, fields::CREATED_AT, fields::UPDATED_AT];

    /// Build an update from arbitrary submitted fields.
    ///
    /// Identity and audit fields are dropped and the rest must decode as a
    /// [`VoterPatch`], otherwise nothing is written. `updated_at` is stamped, and a
    /// new latitude/longitude pair is mirrored into `location`.
    pub fn new(mut submitted: Document, now: DateTime<Utc>) -> Result<Self> {
        for field in Self::SERVER_MANAGED {
            submitted.remove(field);
        }

        let mut patch: VoterPatch =
            from_document(submitted).map_err(|e| Error::BadRequest(format!("Invalid update: {e}")))?;
        if let (Some(lat), Some(lon)) = (patch.latitude, patch.longitude) {
            patch.location = Some(GeoPoint::new(lon, lat));
        }

        let mut set = to_document(&patch).map_err(|e| Error::Internal(format!("Unencodable update: {e}")))?;
        set.insert(fields::UPDATED_AT, Bson::DateTime(bson::DateTime::from_chrono(now)));
        Ok(Self(set))
    }

    /// Change just the gender of a record.
    pub fn gender(gender: NonEmpty, now: DateTime<Utc>) -> Result<Self> {
        Self::new(doc! { "gender": gender.into_inner() }, now)
    }

    pub fn as_document(&self) -> &Document {
        &self.0
    }

    /// The `$set` update document.
    pub fn to_update(&self) -> Document {
        doc! { "$set": self.0.clone() }
    }
}

/// The slice of a record shown in the gender-curation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherVoter {
    pub sec_id: String,
    pub name: String,
    pub guardian_name: String,
    pub ward_number: String,
    pub booth_number: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

impl OtherVoter {
    /// Projection fetching exactly the fields of this view.
    pub fn projection() -> Document {
        doc! {
            "_id": 0,
            "sec_id": 1,
            "name": 1,
            "guardian_name": 1,
            "ward_number": 1,
            "booth_number": 1,
            "age": 1,
            "gender": 1,
        }
    }
}

impl From<VoterRecord> for OtherVoter {
    fn from(voter: VoterRecord) -> Self {
        Self {
            sec_id: voter.sec_id,
            name: voter.name,
            guardian_name: voter.guardian_name,
            ward_number: voter.ward_number,
            booth_number: voter.booth_number,
            age: voter.age,
            gender: voter.gender,
        }
    }
}
