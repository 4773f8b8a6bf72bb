use crate::ident::PackageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Action recorded in the package history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    Create,
    Update,
    Download,
}

/// One append-only history log entry. Entries are never deleted except by a
/// full registry reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub package_id: PackageId,
    pub principal: String,
    pub action: HistoryAction,
    pub at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Record an action performed now by the given principal.
    #[must_use]
    pub fn now(package_id: PackageId, principal: impl Into<String>, action: HistoryAction) -> Self {
        Self {
            package_id,
            principal: principal.into(),
            action,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_serialize_screaming() {
        assert_eq!(serde_json::to_string(&HistoryAction::Create).unwrap(), "\"CREATE\"");
        assert_eq!(serde_json::to_string(&HistoryAction::Update).unwrap(), "\"UPDATE\"");
        assert_eq!(serde_json::to_string(&HistoryAction::Download).unwrap(), "\"DOWNLOAD\"");
    }
}
