//! An in-process [`VoterStore`] for tests.
//!
//! Documents are kept as BSON and filtered by evaluating [`Predicate`]s with the same
//! semantics MongoDB gives their translated filter documents. Projections are not
//! applied: every stored field is returned.

use std::cmp::Ordering;
use std::sync::{
    atomic::{AtomicUsize, Ordering as AtomicOrdering},
    Arc, Mutex, MutexGuard,
};

use mongodb::bson::{from_document, to_document, Bson, Document};
use regex::RegexBuilder;
use rocket::http::Status;

use super::{FindParams, VoterStore};
use crate::error::{Error, Result};
use crate::model::{
    meta::Choice,
    query::{Conjunction, Predicate},
    voter::{fields, VoterChanges, VoterRecord},
};

/// Shared, cloneable in-memory voter collection.
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<Mutex<Vec<Document>>>,
    calls: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Store a raw document, bypassing [`VoterRecord`] serialization.
    pub fn insert_raw(&self, document: Document) {
        self.lock().push(document);
    }

    /// Store each record as-is.
    pub fn insert_all<'a>(&self, voters: impl IntoIterator<Item = &'a VoterRecord>) {
        let mut documents = self.lock();
        for voter in voters {
            documents.push(to_document(voter).unwrap());
        }
    }

    /// Number of store operations issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    /// Every stored document, in insertion order.
    pub fn documents(&self) -> Vec<Document> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Document>> {
        self.documents.lock().unwrap()
    }

    /// Record a call and return the documents matching `filter`.
    fn matching(&self, filter: &Conjunction) -> Vec<Document> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.lock()
            .iter()
            .filter(|document| matches_all(document, filter))
            .cloned()
            .collect()
    }
}

fn decode(document: Document) -> Result<VoterRecord> {
    from_document(document).map_err(|e| Error::Internal(format!("Malformed voter: {e}")))
}

/// MongoDB equality, where a null operand also matches a missing field.
fn field_equals(document: &Document, field: &str, value: &Bson) -> bool {
    match (document.get(field), value) {
        (None, Bson::Null) => true,
        (Some(stored), _) => stored == value,
        (None, _) => false,
    }
}

fn matches(document: &Document, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Equals { field, value } => field_equals(document, field, value),
        Predicate::NotEquals { field, value } => !field_equals(document, field, value),
        Predicate::OneOf { field, values } => values.iter().any(|v| field_equals(document, field, v)),
        Predicate::NoneOf { field, values } => !values.iter().any(|v| field_equals(document, field, v)),
        Predicate::Pattern {
            field,
            pattern,
            case_insensitive,
        } => match document.get(field) {
            Some(Bson::String(stored)) => RegexBuilder::new(pattern)
                .case_insensitive(*case_insensitive)
                .build()
                .map(|regex| regex.is_match(stored))
                .unwrap_or(false),
            _ => false,
        },
        Predicate::Missing { field } => !document.contains_key(field),
        Predicate::Present { field } => !matches!(document.get(field), None | Some(Bson::Null)),
        Predicate::AnyOf(alternatives) => alternatives.iter().any(|p| matches(document, p)),
    }
}

fn matches_all(document: &Document, filter: &Conjunction) -> bool {
    filter.clauses().iter().all(|p| matches(document, p))
}

/// Rank of a value in MongoDB's cross-type sort order (missing and null first).
fn type_rank(value: Option<&Bson>) -> u8 {
    match value {
        None | Some(Bson::Null) => 0,
        Some(Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => 1,
        Some(Bson::String(_)) => 2,
        Some(_) => 3,
    }
}

fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    match (a, b) {
        (Some(Bson::String(a)), Some(Bson::String(b))) => a.cmp(b),
        (Some(a), Some(b)) => match (as_number(a), as_number(b)) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => type_rank(Some(a)).cmp(&type_rank(Some(b))),
        },
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_documents(a: &Document, b: &Document, sort: &Document) -> Ordering {
    for (field, direction) in sort {
        let ordering = compare_values(a.get(field), b.get(field));
        let ordering = if direction.as_i32() == Some(-1) {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn as_text(value: Option<&Bson>) -> Option<String> {
    match value {
        Some(Bson::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

#[rocket::async_trait]
impl VoterStore for MemoryStore {
    async fn find(&self, filter: &Conjunction, params: &FindParams) -> Result<Vec<VoterRecord>> {
        let mut documents = self.matching(filter);
        documents.sort_by(|a, b| compare_documents(a, b, &params.sort));
        let limit = params.limit.map_or(usize::MAX, |limit| limit as usize);
        documents
            .into_iter()
            .skip(params.skip as usize)
            .take(limit)
            .map(decode)
            .collect()
    }

    async fn count(&self, filter: &Conjunction) -> Result<u64> {
        Ok(self.matching(filter).len() as u64)
    }

    async fn find_one(&self, filter: &Conjunction) -> Result<Option<VoterRecord>> {
        self.matching(filter).into_iter().next().map(decode).transpose()
    }

    async fn distinct(&self, field: &'static str, filter: &Conjunction) -> Result<Vec<Bson>> {
        let mut values = Vec::new();
        for document in self.matching(filter) {
            if let Some(value) = document.get(field) {
                if !values.contains(value) {
                    values.push(value.clone());
                }
            }
        }
        Ok(values)
    }

    async fn group_pairs(
        &self,
        filter: &Conjunction,
        code_field: &'static str,
        name_field: &'static str,
    ) -> Result<Vec<Choice>> {
        let mut choices: Vec<Choice> = Vec::new();
        for document in self.matching(filter) {
            let choice = Choice {
                code: as_text(document.get(code_field)),
                name: as_text(document.get(name_field)),
            };
            if !choices.contains(&choice) {
                choices.push(choice);
            }
        }
        Ok(choices)
    }

    async fn average(&self, field: &'static str, filter: &Conjunction) -> Result<Option<f64>> {
        let numbers: Vec<f64> = self
            .matching(filter)
            .iter()
            .filter_map(|document| document.get(field).and_then(as_number))
            .collect();
        if numbers.is_empty() {
            Ok(None)
        } else {
            Ok(Some(numbers.iter().sum::<f64>() / numbers.len() as f64))
        }
    }

    async fn insert(&self, voter: &VoterRecord) -> Result<()> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        let document = to_document(voter).map_err(|e| Error::Internal(format!("Unencodable voter: {e}")))?;
        let mut documents = self.lock();
        let sec_id = Bson::String(voter.sec_id.clone());
        if documents.iter().any(|d| field_equals(d, fields::SEC_ID, &sec_id)) {
            return Err(Error::Status(
                Status::Conflict,
                format!("Voter with sec_id '{}' already exists", voter.sec_id),
            ));
        }
        documents.push(document);
        Ok(())
    }

    async fn update(&self, filter: &Conjunction, changes: &VoterChanges) -> Result<Option<VoterRecord>> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        let updated = {
            let mut documents = self.lock();
            match documents.iter_mut().find(|d| matches_all(d, filter)) {
                Some(document) => {
                    for (field, value) in changes.as_document() {
                        document.insert(field.clone(), value.clone());
                    }
                    Some(document.clone())
                }
                None => None,
            }
        };
        updated.map(decode).transpose()
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;

    #[test]
    fn null_equality_matches_missing_fields() {
        let missing = doc! { "sec_id": "A" };
        let null = doc! { "sec_id": "B", "gender": Bson::Null };
        let set = doc! { "sec_id": "C", "gender": "M" };
        let predicate = Predicate::equals("gender", Bson::Null);

        assert!(matches(&missing, &predicate));
        assert!(matches(&null, &predicate));
        assert!(!matches(&set, &predicate));
    }

    #[test]
    fn none_of_matches_missing_fields() {
        let predicate = Predicate::none_of("gender", ["M", "F"]);
        assert!(matches(&doc! {}, &predicate));
        assert!(matches(&doc! { "gender": "X" }, &predicate));
        assert!(!matches(&doc! { "gender": "F" }, &predicate));
    }

    #[test]
    fn patterns_only_match_strings() {
        let predicate = Predicate::pattern("house_no", "^12(?:[A-Za-z]+)?$");
        assert!(matches(&doc! { "house_no": "12a" }, &predicate));
        assert!(!matches(&doc! { "house_no": 12 }, &predicate));
        assert!(!matches(&doc! {}, &predicate));
    }

    #[test]
    fn sort_puts_missing_values_first() {
        let sort = doc! { "name": 1 };
        let mut documents = vec![doc! { "name": "b" }, doc! {}, doc! { "name": "a" }];
        documents.sort_by(|a, b| compare_documents(a, b, &sort));
        assert_eq!(documents, vec![doc! {}, doc! { "name": "a" }, doc! { "name": "b" }]);
    }
}
