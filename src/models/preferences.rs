use serde::{Deserialize, Serialize};

use super::SpiceLevel;

/// Structured preferences extracted from one user message.
///
/// Ephemeral: consumed by the filter builder and scorer, never persisted.
/// Tokens that don't exist in the catalog vocabulary simply match nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreferenceProfile {
    /// Requested spice ceiling; `None` means no preference.
    pub spice_level: Option<SpiceLevel>,
    pub genres: Vec<String>,
    pub content_warnings: Vec<String>,
    pub excluded_warnings: Vec<String>,
    pub minimum_rating: Option<f64>,
    pub keywords: Vec<String>,
}

/// The catalog's known tag and warning labels, most frequent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub tags: Vec<String>,
    pub warnings: Vec<String>,
}

impl Vocabulary {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.warnings.is_empty()
    }
}
