//! Category keyword table
//!
//! The set of spending categories is a config artifact, not a compile-time
//! enum: adding a category is a config change that only requires rebuilding
//! the classifier's bootstrap model. Labels are validated value types that
//! can only be constructed through a loaded table, so a [`CategoryLabel`]
//! always names a category the table actually contains.
//!
//! ## Configuration Resolution
//!
//! 1. Explicit TOML file passed by the caller
//! 2. Embedded defaults (compiled into the binary)

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Embedded default table (compiled into binary)
const DEFAULT_TABLE: &str = include_str!("../../../config/categories.toml");

/// A validated category slug
///
/// Only a [`CategoryTable`] can mint these, so holding one proves the slug
/// exists in the table it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryLabel(String);

impl CategoryLabel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CategoryLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One category entry from the config table
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInfo {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TableFile {
    categories: Vec<CategoryInfo>,
}

/// The loaded category table, in declaration order
#[derive(Debug, Clone)]
pub struct CategoryTable {
    categories: Vec<CategoryInfo>,
}

impl CategoryTable {
    /// Load the embedded default table.
    pub fn builtin() -> Self {
        // The embedded table is validated by tests; a broken build-time
        // config should fail loudly at first use.
        Self::from_toml_str(DEFAULT_TABLE).expect("embedded category table is invalid")
    }

    /// Parse a table from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: TableFile =
            toml::from_str(text).map_err(|e| Error::Config(format!("invalid TOML: {}", e)))?;
        Self::from_entries(file.categories)
    }

    /// Load a table override from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn from_entries(categories: Vec<CategoryInfo>) -> Result<Self> {
        if categories.is_empty() {
            return Err(Error::Config("category table is empty".into()));
        }

        for cat in &categories {
            if cat.slug.is_empty() {
                return Err(Error::Config("category with empty slug".into()));
            }
            if cat.slug != cat.slug.to_lowercase() {
                return Err(Error::Config(format!(
                    "category slug must be lowercase: {}",
                    cat.slug
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for cat in &categories {
            if !seen.insert(cat.slug.as_str()) {
                return Err(Error::Config(format!("duplicate category slug: {}", cat.slug)));
            }
        }

        if !categories.iter().any(|c| c.slug == "other") {
            return Err(Error::Config(
                "category table must contain an 'other' fallback".into(),
            ));
        }

        Ok(Self { categories })
    }

    /// Look up a validated label for a slug.
    pub fn label(&self, slug: &str) -> Option<CategoryLabel> {
        self.categories
            .iter()
            .find(|c| c.slug == slug)
            .map(|c| CategoryLabel(c.slug.clone()))
    }

    /// The `other` fallback label.
    pub fn other(&self) -> CategoryLabel {
        CategoryLabel("other".into())
    }

    /// Categories in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &CategoryInfo> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn get(&self, slug: &str) -> Option<&CategoryInfo> {
        self.categories.iter().find(|c| c.slug == slug)
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::builtin()
    }
}
