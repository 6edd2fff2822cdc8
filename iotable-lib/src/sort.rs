//! Sort directives and the per-column sort state machine.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sort direction for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9).
    Asc,
    /// Descending order (Z-A, 9-0).
    Desc,
}

impl SortOrder {
    /// Returns the direction as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Column-id to direction mapping, ordered by insertion.
///
/// The first entry is the primary sort key, later entries break ties. On the
/// wire it is a JSON object whose key order is the insertion order.
///
/// # Example
///
/// ```
/// use iotable_lib::{SortDirective, SortOrder};
///
/// let directive = SortDirective::desc("name").then_asc("id");
/// assert_eq!(directive.get("name"), Some(SortOrder::Desc));
/// assert_eq!(directive.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortDirective {
    entries: Vec<(String, SortOrder)>,
}

impl SortDirective {
    /// Creates an empty directive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an ascending directive on a column.
    pub fn asc(column_id: impl Into<String>) -> Self {
        Self::new().then_asc(column_id)
    }

    /// Creates a descending directive on a column.
    pub fn desc(column_id: impl Into<String>) -> Self {
        Self::new().then_desc(column_id)
    }

    /// Adds a secondary ascending key.
    pub fn then_asc(mut self, column_id: impl Into<String>) -> Self {
        self.insert(column_id, SortOrder::Asc);
        self
    }

    /// Adds a secondary descending key.
    pub fn then_desc(mut self, column_id: impl Into<String>) -> Self {
        self.insert(column_id, SortOrder::Desc);
        self
    }

    /// Sets the direction for a column, keeping its position if already present.
    pub fn insert(&mut self, column_id: impl Into<String>, order: SortOrder) {
        let column_id = column_id.into();
        match self.entries.iter_mut().find(|(id, _)| *id == column_id) {
            Some(entry) => entry.1 = order,
            None => self.entries.push((column_id, order)),
        }
    }

    /// Removes a column from the directive.
    pub fn remove(&mut self, column_id: &str) -> Option<SortOrder> {
        let pos = self.entries.iter().position(|(id, _)| id == column_id)?;
        Some(self.entries.remove(pos).1)
    }

    /// Returns the direction for a column.
    pub fn get(&self, column_id: &str) -> Option<SortOrder> {
        self.entries
            .iter()
            .find(|(id, _)| id == column_id)
            .map(|(_, order)| *order)
    }

    /// Drops every entry after the first.
    pub fn truncate_to_primary(&mut self) {
        self.entries.truncate(1);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates keys in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, SortOrder)> {
        self.entries.iter().map(|(id, order)| (id.as_str(), *order))
    }
}

impl FromIterator<(String, SortOrder)> for SortDirective {
    fn from_iter<I: IntoIterator<Item = (String, SortOrder)>>(iter: I) -> Self {
        let mut directive = Self::new();
        for (id, order) in iter {
            directive.insert(id, order);
        }
        directive
    }
}

impl Serialize for SortDirective {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, order) in &self.entries {
            map.serialize_entry(id, order)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SortDirective {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DirectiveVisitor;

        impl<'de> Visitor<'de> for DirectiveVisitor {
            type Value = SortDirective;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of column id to \"asc\" or \"desc\"")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SortDirective, A::Error> {
                let mut directive = SortDirective::new();
                while let Some((id, order)) = access.next_entry::<String, SortOrder>()? {
                    directive.insert(id, order);
                }
                Ok(directive)
            }
        }

        deserializer.deserialize_map(DirectiveVisitor)
    }
}

/// Tracks the active sort directive and advances it on header interaction.
///
/// Per column the cycle is `none -> asc -> desc -> none`. With multi-sort
/// enabled the third step removes the column from the directive and leaves
/// the other keys in place; in single-sort mode toggling a column first
/// clears every other column.
#[derive(Debug, Clone, Default)]
pub struct SortState {
    directive: SortDirective,
    multi_sort: bool,
}

impl SortState {
    /// Creates a sort state seeded with an initial directive.
    pub fn new(mut initial: SortDirective, multi_sort: bool) -> Self {
        if !multi_sort {
            initial.truncate_to_primary();
        }
        Self {
            directive: initial,
            multi_sort,
        }
    }

    /// Returns the current directive.
    pub fn directive(&self) -> &SortDirective {
        &self.directive
    }

    /// Advances the cycle for a column and returns its new direction.
    pub fn toggle(&mut self, column_id: &str) -> Option<SortOrder> {
        let current = self.directive.get(column_id);
        if !self.multi_sort {
            self.directive.clear();
        }
        let next = match current {
            None => Some(SortOrder::Asc),
            Some(SortOrder::Asc) => Some(SortOrder::Desc),
            Some(SortOrder::Desc) => None,
        };
        match next {
            Some(order) => self.directive.insert(column_id, order),
            None => {
                self.directive.remove(column_id);
            }
        }
        log::debug!("Sort toggled on '{column_id}': {current:?} -> {next:?}");
        next
    }

    /// Replaces the whole directive atomically.
    ///
    /// Returns `false` and changes nothing when the new directive equals the
    /// current one. In single-sort mode only the first key is kept.
    pub fn replace(&mut self, mut directive: SortDirective) -> bool {
        if !self.multi_sort {
            directive.truncate_to_primary();
        }
        if directive == self.directive {
            return false;
        }
        self.directive = directive;
        true
    }
}
