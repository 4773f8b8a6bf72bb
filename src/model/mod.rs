//! Persisted and wire-shaped record types.

mod cost;
mod history;
mod manifest;
mod package;
mod rating;

pub use cost::CostRecord;
pub use history::{HistoryAction, HistoryEntry};
pub use manifest::Manifest;
pub use package::{PackageRecord, PackageSource, SourceKind};
pub(crate) use package::encode_content;
pub use rating::QualityRating;
