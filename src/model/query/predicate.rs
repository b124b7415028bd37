//! Typed query predicates.
//!
//! Handlers and the filter compiler only ever build [`Predicate`]s; the translation
//! into a MongoDB filter document happens once, in [`Conjunction::to_document`].

use std::collections::HashSet;

use mongodb::bson::{doc, Bson, Document};

/// A single condition on one field of a voter document.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Field equals the value exactly.
    Equals { field: &'static str, value: Bson },
    /// Field is anything except the value (including missing).
    NotEquals { field: &'static str, value: Bson },
    /// Field equals one of the values.
    OneOf {
        field: &'static str,
        values: Vec<Bson>,
    },
    /// Field equals none of the values (including missing).
    NoneOf {
        field: &'static str,
        values: Vec<Bson>,
    },
    /// Field is a string matching the pattern.
    Pattern {
        field: &'static str,
        pattern: String,
        case_insensitive: bool,
    },
    /// Field does not exist on the document.
    Missing { field: &'static str },
    /// Field exists and is not null.
    Present { field: &'static str },
    /// At least one of the inner predicates holds.
    AnyOf(Vec<Predicate>),
}

impl Predicate {
    pub fn equals(field: &'static str, value: impl Into<Bson>) -> Self {
        Self::Equals {
            field,
            value: value.into(),
        }
    }

    pub fn not_equals(field: &'static str, value: impl Into<Bson>) -> Self {
        Self::NotEquals {
            field,
            value: value.into(),
        }
    }

    pub fn one_of<I, V>(field: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        Self::OneOf {
            field,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn none_of<I, V>(field: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        Self::NoneOf {
            field,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// A case-insensitive pattern. The caller is responsible for escaping user input.
    pub fn pattern(field: &'static str, pattern: impl Into<String>) -> Self {
        Self::Pattern {
            field,
            pattern: pattern.into(),
            case_insensitive: true,
        }
    }

    /// The top-level key this predicate occupies in a filter document.
    fn key(&self) -> &'static str {
        match self {
            Self::Equals { field, .. }
            | Self::NotEquals { field, .. }
            | Self::OneOf { field, .. }
            | Self::NoneOf { field, .. }
            | Self::Pattern { field, .. }
            | Self::Missing { field }
            | Self::Present { field } => field,
            Self::AnyOf(_) => "$or",
        }
    }

    /// The value stored under [`Self::key`].
    fn condition(&self) -> Bson {
        match self {
            Self::Equals { value, .. } => value.clone(),
            Self::NotEquals { value, .. } => Bson::Document(doc! { "$ne": value.clone() }),
            Self::OneOf { values, .. } => Bson::Document(doc! { "$in": values.clone() }),
            Self::NoneOf { values, .. } => Bson::Document(doc! { "$nin": values.clone() }),
            Self::Pattern {
                pattern,
                case_insensitive,
                ..
            } => {
                let options = if *case_insensitive { "i" } else { "" };
                Bson::Document(doc! { "$regex": pattern.as_str(), "$options": options })
            }
            Self::Missing { .. } => Bson::Document(doc! { "$exists": false }),
            Self::Present { .. } => Bson::Document(doc! { "$exists": true, "$ne": Bson::Null }),
            Self::AnyOf(alternatives) => Bson::Array(
                alternatives
                    .iter()
                    .map(|p| Bson::Document(p.to_document()))
                    .collect(),
            ),
        }
    }

    /// This predicate as a standalone filter document.
    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        document.insert(self.key(), self.condition());
        document
    }
}

/// Predicates that must all hold. An empty conjunction matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conjunction {
    clauses: Vec<Predicate>,
}

impl Conjunction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Self::push`].
    pub fn with(mut self, predicate: Predicate) -> Self {
        self.push(predicate);
        self
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.clauses.push(predicate);
    }

    pub fn clauses(&self) -> &[Predicate] {
        &self.clauses
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Translate into a MongoDB filter document.
    ///
    /// Clauses on distinct keys are merged into one flat document. If two clauses share a
    /// key, the whole conjunction is emitted as `$and` so neither overwrites the other.
    pub fn to_document(&self) -> Document {
        let mut seen = HashSet::new();
        let distinct_keys = self.clauses.iter().all(|p| seen.insert(p.key()));

        if distinct_keys {
            let mut document = Document::new();
            for clause in &self.clauses {
                document.insert(clause.key(), clause.condition());
            }
            document
        } else {
            let parts: Vec<Document> = self.clauses.iter().map(Predicate::to_document).collect();
            doc! { "$and": parts }
        }
    }
}

impl From<Predicate> for Conjunction {
    fn from(predicate: Predicate) -> Self {
        Self::new().with(predicate)
    }
}

impl FromIterator<Predicate> for Conjunction {
    fn from_iter<I: IntoIterator<Item = Predicate>>(iter: I) -> Self {
        Self {
            clauses: iter.into_iter().collect(),
        }
    }
}
