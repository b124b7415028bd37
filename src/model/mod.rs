pub mod meta;
pub mod mongodb;
pub mod pagination;
pub mod query;
pub mod response;
pub mod stats;
pub mod voter;
