//! Package identity and version-compatibility rules.

mod package_id;
mod version_rules;

pub use package_id::PackageId;
pub use version_rules::version_compatible;
