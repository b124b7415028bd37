//! Compiles the filter fields of a search request into a [`Conjunction`].

use super::normalize::{escape_for_pattern_match, house_number_pattern, ward_variants, NonEmpty};
use super::predicate::{Conjunction, Predicate};
use crate::model::voter::fields;

/// Raw filter fields as they arrive in a query string.
#[derive(Debug, Clone, Default, FromForm)]
pub struct VoterFilters {
    pub district_code: Option<String>,
    pub lb_code: Option<String>,
    pub sec_id: Option<String>,
    pub booth_number: Option<String>,
    pub ward_number: Option<String>,
    pub name: Option<String>,
    pub house_name: Option<String>,
    pub house_no: Option<String>,
    pub phone: Option<String>,
    pub guardian_name: Option<String>,
}

impl VoterFilters {
    /// Drop every blank field.
    pub fn normalize(&self) -> NormalizedFilters {
        let field = |raw: &Option<String>| NonEmpty::from_field(raw.as_deref());
        NormalizedFilters {
            district_code: field(&self.district_code),
            lb_code: field(&self.lb_code),
            sec_id: field(&self.sec_id),
            booth_number: field(&self.booth_number),
            ward_number: field(&self.ward_number),
            name: field(&self.name),
            house_name: field(&self.house_name),
            house_no: field(&self.house_no),
            phone: field(&self.phone),
            guardian_name: field(&self.guardian_name),
        }
    }
}

/// Filter fields after normalization: `Some` means the filter was really supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedFilters {
    pub district_code: Option<NonEmpty>,
    pub lb_code: Option<NonEmpty>,
    pub sec_id: Option<NonEmpty>,
    pub booth_number: Option<NonEmpty>,
    pub ward_number: Option<NonEmpty>,
    pub name: Option<NonEmpty>,
    pub house_name: Option<NonEmpty>,
    pub house_no: Option<NonEmpty>,
    pub phone: Option<NonEmpty>,
    pub guardian_name: Option<NonEmpty>,
}

/// How the `name` filter is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    /// Names starting with the input.
    Prefix,
    /// Names containing the input anywhere.
    Substring,
}

/// Result of compiling a set of filters.
#[derive(Debug, Clone, PartialEq)]
pub enum Compiled {
    /// Nothing was supplied. Callers must not scan the whole collection for this.
    NoFilters,
    /// The supplied filters, all of which must hold.
    Filter(Conjunction),
}

impl Compiled {
    pub fn has_filters(&self) -> bool {
        matches!(self, Self::Filter(_))
    }

    /// The compiled filter, or `None` when nothing was supplied.
    pub fn into_filter(self) -> Option<Conjunction> {
        match self {
            Self::NoFilters => None,
            Self::Filter(filter) => Some(filter),
        }
    }
}

/// Case-insensitive match of the escaped input anywhere in the field.
fn contains(field: &'static str, value: &NonEmpty) -> Predicate {
    Predicate::pattern(field, escape_for_pattern_match(value))
}

/// Compile normalized filters into a single conjunction.
pub fn compile(filters: &NormalizedFilters, name_match: NameMatch) -> Compiled {
    let mut filter = Conjunction::new();

    // Exact matches first: these are the indexed fields.
    if let Some(district_code) = &filters.district_code {
        filter.push(Predicate::equals(fields::DISTRICT_CODE, district_code.as_str()));
    }
    if let Some(lb_code) = &filters.lb_code {
        filter.push(Predicate::equals(fields::LB_CODE, lb_code.as_str()));
    }
    if let Some(sec_id) = &filters.sec_id {
        filter.push(Predicate::equals(fields::SEC_ID, sec_id.as_str()));
    }
    if let Some(booth_number) = &filters.booth_number {
        filter.push(Predicate::equals(fields::BOOTH_NUMBER, booth_number.as_str()));
    }
    if let Some(ward_number) = &filters.ward_number {
        filter.push(Predicate::one_of(fields::WARD_NUMBER, ward_variants(ward_number)));
    }

    if let Some(name) = &filters.name {
        let escaped = escape_for_pattern_match(name);
        let pattern = match name_match {
            NameMatch::Prefix => format!("^{escaped}"),
            NameMatch::Substring => escaped,
        };
        filter.push(Predicate::pattern(fields::NAME, pattern));
    }
    if let Some(house_name) = &filters.house_name {
        filter.push(contains(fields::HOUSE_NAME, house_name));
    }
    if let Some(house_no) = &filters.house_no {
        filter.push(Predicate::pattern(fields::HOUSE_NO, house_number_pattern(house_no)));
    }
    if let Some(phone) = &filters.phone {
        filter.push(contains(fields::PHONE, phone));
    }
    if let Some(guardian_name) = &filters.guardian_name {
        filter.push(contains(fields::GUARDIAN_NAME, guardian_name));
    }

    if filter.is_empty() {
        Compiled::NoFilters
    } else {
        Compiled::Filter(filter)
    }
}
