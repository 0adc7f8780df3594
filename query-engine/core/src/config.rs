use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Engine-wide settings, usually read from the `[engine]` table of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case", deny_unknown_fields)]
pub struct EngineConfig {
    /// Scheme, host and optional prefix every href starts with.
    pub base_url: String,
    pub default_page_size: usize,
    pub max_page_size: usize,
    /// Rows removed per round while reconciling relationships.
    pub reconcile_page_size: usize,
    /// Rows resolved per round while deleting by filter.
    pub delete_page_size: usize,
    /// Deepest dotted path `expands` accepts.
    pub max_expand_depth: usize,
    /// Words never accepted as parameter names, attribute names or unquoted values.
    pub reserved_words: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".to_owned(),
            default_page_size: 100,
            max_page_size: 1000,
            reconcile_page_size: 100,
            delete_page_size: 100,
            max_expand_depth: 10,
            reserved_words: ["select", "insert", "update", "delete", "drop", "union", "truncate", "exec", "explain"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl EngineConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn is_reserved(&self, word: &str) -> bool {
        self.reserved_words.iter().any(|w| w.eq_ignore_ascii_case(word))
    }

    pub fn validate(&self) -> crate::Result<()> {
        let sizes = [
            ("default_page_size", self.default_page_size),
            ("max_page_size", self.max_page_size),
            ("reconcile_page_size", self.reconcile_page_size),
            ("delete_page_size", self.delete_page_size),
            ("max_expand_depth", self.max_expand_depth),
        ];

        if let Some((name, _)) = sizes.iter().find(|(_, size)| *size == 0) {
            return Err(CoreError::ConfigurationError(format!("`{name}` must be greater than zero.")));
        }

        if self.default_page_size > self.max_page_size {
            return Err(CoreError::ConfigurationError(
                "`default_page_size` cannot exceed `max_page_size`.".to_owned(),
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(CoreError::ConfigurationError(format!(
                "`base_url` must be an http(s) url, got `{}`.",
                self.base_url
            )));
        }

        Ok(())
    }

    /// The base url without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
