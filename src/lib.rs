//! `openenc-core`: a tolerant S-57 Electronic Navigational Chart parser,
//! in-memory feature store, spatial indexer, and incremental updater over
//! the ISO/IEC 8211 record container.

pub mod catalog;
pub mod diagnostics;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod iso8211;
pub mod primitives;
pub mod s57;
pub mod session;
pub mod spatial;
pub mod store;

pub use diagnostics::{Collector, Severity, Warning, WarningCode};
pub use error::OpenEncError;
pub use feature::Feature;
pub use session::ParseSession;
pub use spatial::SpatialIndex;
pub use store::{FeatureStore, UpdateSummary};
