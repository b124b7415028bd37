use log::debug;
use mongodb::{
    bson::{doc, from_document, Bson, Document},
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Database, IndexModel,
};
use rocket::{futures::TryStreamExt, http::Status};

use super::{FindParams, VoterStore};
use crate::error::{Error, Result};
use crate::model::{
    meta::Choice,
    mongodb::{is_duplicate_key_error, Coll},
    query::Conjunction,
    voter::{VoterChanges, VoterRecord},
};

/// [`VoterStore`] backed by the MongoDB `voters` collection.
pub struct MongoStore {
    voters: Coll<VoterRecord>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            voters: Coll::from_db(db),
        }
    }
}

#[rocket::async_trait]
impl VoterStore for MongoStore {
    async fn find(&self, filter: &Conjunction, params: &FindParams) -> Result<Vec<VoterRecord>> {
        let options = FindOptions::builder()
            .sort((!params.sort.is_empty()).then(|| params.sort.clone()))
            .skip(params.skip)
            .limit(params.limit.map(|limit| limit as i64))
            .projection(params.projection.clone())
            .build();
        let voters = self
            .voters
            .find(filter.to_document(), options)
            .await?
            .try_collect()
            .await?;
        Ok(voters)
    }

    async fn count(&self, filter: &Conjunction) -> Result<u64> {
        Ok(self.voters.count_documents(filter.to_document(), None).await?)
    }

    async fn find_one(&self, filter: &Conjunction) -> Result<Option<VoterRecord>> {
        Ok(self.voters.find_one(filter.to_document(), None).await?)
    }

    async fn distinct(&self, field: &'static str, filter: &Conjunction) -> Result<Vec<Bson>> {
        Ok(self.voters.distinct(field, filter.to_document(), None).await?)
    }

    async fn group_pairs(
        &self,
        filter: &Conjunction,
        code_field: &'static str,
        name_field: &'static str,
    ) -> Result<Vec<Choice>> {
        let pipeline = vec![
            doc! { "$match": filter.to_document() },
            doc! {
                "$group": {
                    "_id": { "code": format!("${code_field}"), "name": format!("${name_field}") }
                }
            },
            doc! { "$project": { "_id": 0, "code": "$_id.code", "name": "$_id.name" } },
        ];
        let groups: Vec<Document> = self.voters.aggregate(pipeline, None).await?.try_collect().await?;
        groups
            .into_iter()
            .map(|group| {
                from_document::<Choice>(group)
                    .map_err(|e| Error::Internal(format!("Malformed {code_field} group: {e}")))
            })
            .collect()
    }

    async fn average(&self, field: &'static str, filter: &Conjunction) -> Result<Option<f64>> {
        let pipeline = vec![
            doc! { "$match": filter.to_document() },
            doc! { "$group": { "_id": Bson::Null, "average": { "$avg": format!("${field}") } } },
        ];
        let groups: Vec<Document> = self.voters.aggregate(pipeline, None).await?.try_collect().await?;
        Ok(groups
            .first()
            .and_then(|group| group.get("average"))
            .and_then(Bson::as_f64))
    }

    async fn insert(&self, voter: &VoterRecord) -> Result<()> {
        match self.voters.insert_one(voter, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key_error(&e) => Err(Error::Status(
                Status::Conflict,
                format!("Voter with sec_id '{}' already exists", voter.sec_id),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, filter: &Conjunction, changes: &VoterChanges) -> Result<Option<VoterRecord>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(self
            .voters
            .find_one_and_update(filter.to_document(), changes.to_update(), options)
            .await?)
    }
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> std::result::Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let voters = Coll::<VoterRecord>::from_db(db);

    // The external key.
    let unique = IndexOptions::builder().unique(true).build();
    let sec_id_index = IndexModel::builder()
        .keys(doc! {"sec_id": 1})
        .options(unique)
        .build();

    // Location hierarchy, which also serves the default search ordering.
    let location_index = IndexModel::builder()
        .keys(doc! {"district_code": 1, "lb_code": 1, "ward_number": 1})
        .build();

    // Name listing and prefix search.
    let name_index = IndexModel::builder().keys(doc! {"name": 1}).build();

    voters
        .create_indexes([sec_id_index, location_index, name_index], None)
        .await?;

    Ok(())
}
