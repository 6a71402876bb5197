use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{OnkyoError, Result};
use crate::protocol::InputSource;

const DEFAULT_SOURCES: &[(&str, &str)] = &[
    ("tv", "TV"),
    ("bd", "Bluray"),
    ("game", "Game"),
    ("aux1", "Aux1"),
    ("video1", "Video 1"),
    ("video2", "Video 2"),
    ("video3", "Video 3"),
    ("video4", "Video 4"),
    ("video5", "Video 5"),
    ("video6", "Video 6"),
    ("video7", "Video 7"),
    ("fm", "Radio"),
];

/// Receiver input aliases mapped to user-facing names
///
/// Serialized as a plain `{ "pc": "HTPC" }` map. A configured mapping
/// replaces the defaults entirely. Aliases are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct SourceMapping {
    names: BTreeMap<String, String>,
}

impl Default for SourceMapping {
    fn default() -> Self {
        DEFAULT_SOURCES
            .iter()
            .map(|(alias, name)| (*alias, *name))
            .collect()
    }
}

impl<A: Into<String>, N: Into<String>> FromIterator<(A, N)> for SourceMapping {
    fn from_iter<I: IntoIterator<Item = (A, N)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(alias, name)| (alias.into().to_ascii_lowercase(), name.into()))
                .collect(),
        }
    }
}

impl From<BTreeMap<String, String>> for SourceMapping {
    fn from(names: BTreeMap<String, String>) -> Self {
        names.into_iter().collect()
    }
}

impl From<SourceMapping> for BTreeMap<String, String> {
    fn from(mapping: SourceMapping) -> Self {
        mapping.names
    }
}

impl SourceMapping {
    /// A mapping with no entries
    #[must_use]
    pub fn empty() -> Self {
        Self {
            names: BTreeMap::new(),
        }
    }

    /// Add or replace one entry
    #[must_use]
    pub fn with(mut self, alias: impl Into<String>, name: impl Into<String>) -> Self {
        self.names
            .insert(alias.into().to_ascii_lowercase(), name.into());
        self
    }

    /// Friendly name for an input
    ///
    /// The first of the input's aliases that is mapped wins; unmapped inputs
    /// are shown by their aliases joined with `_`.
    #[must_use]
    pub fn friendly_name(&self, input: InputSource) -> String {
        let aliases = input.aliases();
        aliases
            .iter()
            .find_map(|alias| self.names.get(*alias).cloned())
            .unwrap_or_else(|| {
                if aliases.is_empty() {
                    input.to_string()
                } else {
                    aliases.join("_")
                }
            })
    }

    /// Resolve a friendly name or a raw alias to an input
    ///
    /// # Errors
    ///
    /// Returns `UnknownSource` if `name` is neither.
    pub fn resolve(&self, name: &str) -> Result<InputSource> {
        let alias = self
            .names
            .iter()
            .find(|(_, friendly)| friendly.as_str() == name)
            .or_else(|| {
                self.names
                    .iter()
                    .find(|(_, friendly)| friendly.eq_ignore_ascii_case(name))
            })
            .map_or(name, |(alias, _)| alias.as_str());

        InputSource::from_alias(alias).ok_or_else(|| OnkyoError::UnknownSource {
            name: name.to_string(),
        })
    }

    /// Friendly names, sorted
    #[must_use]
    pub fn source_list(&self) -> Vec<&str> {
        let mut list: Vec<&str> = self.names.values().map(String::as_str).collect();
        list.sort_unstable();
        list.dedup();
        list
    }

    /// Entries as `(alias, friendly name)`
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(a, n)| (a.as_str(), n.as_str()))
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when nothing is mapped
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Check every alias is a known receiver input
    ///
    /// # Errors
    ///
    /// Returns `Config` naming the first unknown alias.
    pub fn validate(&self) -> Result<()> {
        match self
            .names
            .keys()
            .find(|alias| InputSource::from_alias(alias).is_none())
        {
            Some(alias) => Err(OnkyoError::Config {
                message: format!("source {alias:?} is not a receiver input"),
            }),
            None => Ok(()),
        }
    }
}
