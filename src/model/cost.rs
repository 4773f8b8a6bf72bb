use serde::{Deserialize, Serialize};

/// Size accounting for one package, in megabytes.
///
/// Sizes of immutable packages never change, so records are cached
/// indefinitely once computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostRecord {
    /// Size of the package archive alone.
    pub standalone_cost: f64,

    /// Standalone size plus the cost of all transitive dependencies.
    pub total_cost: f64,
}

impl CostRecord {
    /// Round both figures to `decimals` decimal places.
    #[must_use]
    pub fn rounded(self, decimals: u32) -> Self {
        let factor = 10_f64.powi(decimals.cast_signed());
        Self {
            standalone_cost: (self.standalone_cost * factor).round() / factor,
            total_cost: (self.total_cost * factor).round() / factor,
        }
    }
}
