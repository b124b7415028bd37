mod collection;
mod errors;

pub use collection::{Coll, MongoCollection};
pub use errors::is_duplicate_key_error;
