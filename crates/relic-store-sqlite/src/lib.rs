//! SQLite implementation of [`relic_core::store::AssetStore`].

mod encode;
mod error;
mod schema;
mod store;


pub use error::{Error, Result};
pub use store::SqliteStore;
