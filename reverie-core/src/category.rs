//! Fixed concept categories and the tag lookup table that feeds them.

use crate::error::{NetworkError, NetworkResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Coarse semantic category of a concept, used for novelty scoring
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// People, organisations, named things
    Entity,
    /// Feelings and moods
    Emotion,
    /// Verbs and events
    Action,
    /// Ideas without a physical referent
    Abstract,
    /// Locations
    Place,
    /// Moments, periods, durations
    Time,
    /// Physical things
    Object,
    /// Minted by the synthesizer
    Synthesized,
    /// No category known
    #[default]
    Unknown,
}

impl Category {
    /// Every category, in declaration order
    pub const ALL: [Self; 9] = [
        Self::Entity,
        Self::Emotion,
        Self::Action,
        Self::Abstract,
        Self::Place,
        Self::Time,
        Self::Object,
        Self::Synthesized,
        Self::Unknown,
    ];

    /// Stable lowercase label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Emotion => "emotion",
            Self::Action => "action",
            Self::Abstract => "abstract",
            Self::Place => "place",
            Self::Time => "time",
            Self::Object => "object",
            Self::Synthesized => "synthesized",
            Self::Unknown => "unknown",
        }
    }

    /// Display colour used by graph views
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Entity => "#4e79a7",
            Self::Emotion => "#e15759",
            Self::Action => "#f28e2b",
            Self::Abstract => "#b07aa1",
            Self::Place => "#59a14f",
            Self::Time => "#edc948",
            Self::Object => "#76b7b2",
            Self::Synthesized => "#ff9da7",
            Self::Unknown => "#9c9c9c",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == lowered)
            .ok_or_else(|| {
                NetworkError::invalid_parameter("category", format!("unknown category '{s}'"))
            })
    }
}

/// Maps free-form provenance tags onto [`Category`] values.
///
/// Tags are matched case-insensitively; unmapped tags resolve to
/// [`Category::Unknown`].
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    entries: HashMap<String, Category>,
}

impl CategoryTable {
    /// Build a table, rejecting empty or duplicate tags.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidParameter`] naming the first bad tag.
    pub fn new<I, S>(entries: I) -> NetworkResult<Self>
    where
        I: IntoIterator<Item = (S, Category)>,
        S: AsRef<str>,
    {
        let mut table = HashMap::new();
        for (tag, category) in entries {
            let key = tag.as_ref().trim().to_ascii_lowercase();
            if key.is_empty() {
                return Err(NetworkError::invalid_parameter(
                    "category_table",
                    "tags must not be empty",
                ));
            }
            if table.insert(key.clone(), category).is_some() {
                return Err(NetworkError::invalid_parameter(
                    "category_table",
                    format!("duplicate tag '{key}'"),
                ));
            }
        }
        Ok(Self { entries: table })
    }

    /// Resolve a tag to its category
    #[must_use]
    pub fn lookup(&self, tag: &str) -> Category {
        self.entries
            .get(&tag.trim().to_ascii_lowercase())
            .copied()
            .unwrap_or_default()
    }

    /// Number of mapped tags
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no tags are mapped
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_case_insensitively() {
        assert_eq!("Emotion".parse::<Category>().ok(), Some(Category::Emotion));
        assert_eq!(" place ".parse::<Category>().ok(), Some(Category::Place));
        assert!("colour".parse::<Category>().is_err());
    }

    #[test]
    fn table_rejects_duplicates_and_blanks() {
        assert!(CategoryTable::new([("feel", Category::Emotion), ("FEEL", Category::Action)]).is_err());
        assert!(CategoryTable::new([("  ", Category::Emotion)]).is_err());
    }

    #[test]
    fn table_falls_back_to_unknown() {
        let table = CategoryTable::new([("city", Category::Place), ("joy", Category::Emotion)])
            .unwrap();
        assert_eq!(table.lookup("CITY"), Category::Place);
        assert_eq!(table.lookup("river"), Category::Unknown);
        assert_eq!(table.len(), 2);
    }
}
