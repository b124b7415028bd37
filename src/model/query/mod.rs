//! Turning search requests into store filters.

mod compiler;
mod normalize;
mod predicate;

pub use compiler::{compile, Compiled, NameMatch, NormalizedFilters, VoterFilters};
pub use normalize::{escape_for_pattern_match, house_number_pattern, split_house_suffix, ward_variants, NonEmpty};
pub use predicate::{Conjunction, Predicate};
