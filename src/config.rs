use serde::{Deserialize, Serialize};

use crate::error::ErrorPolicy;

pub const DEFAULT_CHILD_KEY: &str = "children";

/// The data-only part of a walk's options, loadable from any serde format.
///
/// Hooks cannot be expressed here; set those on the
/// [`TreeBuilder`](crate::TreeBuilder) and apply this with
/// [`TreeBuilder::config`](crate::TreeBuilder::config). Missing keys take
/// their defaults.
///
/// ```rust
/// let config: dirtree::WalkConfig = serde_json::from_str(
///     r#"{ "childKey": "items", "statErrors": "record", "skipPatterns": ["*.tmp"] }"#,
/// ).unwrap();
/// assert_eq!(config.child_key, "items");
/// assert_eq!(config.stat_errors, dirtree::ErrorPolicy::Record);
/// assert!(config.follow_links);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WalkConfig {
    pub child_key:      String,
    pub listing_errors: ErrorPolicy,
    pub stat_errors:    ErrorPolicy,
    pub follow_links:   bool,
    pub read_content:   bool,
    pub skip_patterns:  Vec<String>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            child_key:      DEFAULT_CHILD_KEY.to_owned(),
            listing_errors: ErrorPolicy::Ignore,
            stat_errors:    ErrorPolicy::Ignore,
            follow_links:   true,
            read_content:   false,
            skip_patterns:  Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config: WalkConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, WalkConfig::default());
    }

    #[test]
    fn policies_deserialize_lowercase() {
        let config: WalkConfig =
            serde_json::from_str(r#"{ "listingErrors": "throw", "statErrors": "record" }"#).unwrap();
        assert_eq!(config.listing_errors, ErrorPolicy::Throw);
        assert_eq!(config.stat_errors, ErrorPolicy::Record);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let result = serde_json::from_str::<WalkConfig>(r#"{ "statErrors": "explode" }"#);
        assert!(result.is_err());
    }
}
