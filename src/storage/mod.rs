mod entries;
mod schema;
mod types;
mod websites;

pub use schema::Database;
pub use types::{Entry, NewEntry, StorageError, Website};
