//! Core types and pipeline stages for the relic register tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.
//!
//! The pipeline: a harvested [`raw::RawRecord`] batch is normalised by
//! [`tidy::tidy`] into [`asset::TidiedAsset`]s, compared against the live
//! [`asset::AssetVersion`] set by [`reconcile::plan`], and the resulting
//! version transitions are committed atomically through an
//! [`store::AssetStore`] backend.

pub mod asset;
pub mod change;
pub mod diff;
pub mod error;
pub mod raw;
pub mod reconcile;
pub mod store;
pub mod tidy;

pub use error::{Error, PassError, Result};
