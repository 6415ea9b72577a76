//! Layout manager configuration
//!
//! Defaults work out of the box. Hosts can override them in code through the
//! [`TextLayoutManagerBuilder`](crate::TextLayoutManagerBuilder), or at startup
//! through environment variables:
//!
//! ```bash
//! TEXTLM_CACHE=0 ./my_app                # no layout cache
//! TEXTLM_CACHE_CAPACITY=2048 ./my_app    # bigger cache
//! TEXTLM_ELLIPSIS="..." ./my_app         # ASCII ellipsis
//! ```

use crate::error::{Result, TextLayoutError};
use crate::hit_test::VerticalTieBreak;

/// Turns the layout cache on or off
pub const ENV_CACHE: &str = "TEXTLM_CACHE";
/// Number of layouts the cache keeps
pub const ENV_CACHE_CAPACITY: &str = "TEXTLM_CACHE_CAPACITY";
/// Text used as the truncation indicator
pub const ENV_ELLIPSIS: &str = "TEXTLM_ELLIPSIS";

pub const DEFAULT_CACHE_CAPACITY: usize = 512;
pub const DEFAULT_ELLIPSIS: &str = "\u{2026}";

/// Policy knobs for a [`TextLayoutManager`](crate::TextLayoutManager)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutConfig {
    pub cache_enabled: bool,
    pub cache_capacity: usize,
    /// Inserted where truncation hides text
    pub ellipsis: String,
    /// Which line a point exactly between two lines belongs to
    pub vertical_tie_break: VerticalTieBreak,
    /// Reject backend output that breaks the layout invariants
    pub validate_layouts: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            ellipsis: DEFAULT_ELLIPSIS.to_string(),
            vertical_tie_break: VerticalTieBreak::Upper,
            validate_layouts: true,
        }
    }
}

impl LayoutConfig {
    /// Defaults with the `TEXTLM_*` environment variables applied on top
    pub fn from_env() -> Result<Self> {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any key/value source
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup(ENV_CACHE) {
            self.cache_enabled = parse_flag(ENV_CACHE, &value)?;
            log::info!(
                "textlm layout cache {} via {ENV_CACHE}",
                if self.cache_enabled { "enabled" } else { "disabled" }
            );
        }

        if let Some(value) = lookup(ENV_CACHE_CAPACITY) {
            self.cache_capacity = value.trim().parse().map_err(|_| {
                TextLayoutError::Config(format!(
                    "{ENV_CACHE_CAPACITY} must be a non-negative integer, got {value:?}"
                ))
            })?;
            log::info!("textlm layout cache capacity set to {}", self.cache_capacity);
        }

        if let Some(value) = lookup(ENV_ELLIPSIS) {
            self.ellipsis = value;
        }

        Ok(self)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(TextLayoutError::Config(format!(
            "{name} must be a boolean flag, got {value:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_keeps_defaults() {
        let config = LayoutConfig::default().overlay(lookup(&[])).unwrap();
        assert_eq!(config, LayoutConfig::default());
        assert!(config.cache_enabled);
        assert_eq!(config.ellipsis, "\u{2026}");
    }

    #[test]
    fn overrides_apply() {
        let config = LayoutConfig::default()
            .overlay(lookup(&[
                (ENV_CACHE, "off"),
                (ENV_CACHE_CAPACITY, " 64 "),
                (ENV_ELLIPSIS, "..."),
            ]))
            .unwrap();
        assert!(!config.cache_enabled);
        assert_eq!(config.cache_capacity, 64);
        assert_eq!(config.ellipsis, "...");
    }

    #[test]
    fn malformed_values_are_errors() {
        let bad_flag = LayoutConfig::default().overlay(lookup(&[(ENV_CACHE, "maybe")]));
        assert!(matches!(bad_flag, Err(TextLayoutError::Config(_))));

        let bad_capacity =
            LayoutConfig::default().overlay(lookup(&[(ENV_CACHE_CAPACITY, "-3")]));
        assert!(matches!(bad_capacity, Err(TextLayoutError::Config(_))));
    }
}
