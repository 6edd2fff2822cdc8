//! Row selection tracking by identifier value.

use crate::row::Row;
use crate::value::Value;

/// Selection mode for the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// No selection allowed.
    #[default]
    None,
    /// At most one row selected at a time.
    Single,
    /// Any number of rows can be selected.
    Multi,
}

impl SelectionMode {
    /// Derives the mode from the grid options.
    ///
    /// Selection requires an identifier column; without one the grid is
    /// silently non-selectable.
    pub fn from_options(selection: bool, multi_select: bool, has_identifier: bool) -> Self {
        match (selection && has_identifier, multi_select) {
            (false, _) => SelectionMode::None,
            (true, false) => SelectionMode::Single,
            (true, true) => SelectionMode::Multi,
        }
    }
}

/// Tracks selected identifier values across view changes.
///
/// Only rows of the current view can be selected or deselected, since those
/// are the rows the change notifications carry. Ids are kept in selection
/// order.
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    mode: SelectionMode,
    selected: Vec<Value>,
}

impl SelectionTracker {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            selected: Vec::new(),
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn is_enabled(&self) -> bool {
        self.mode != SelectionMode::None
    }

    /// Selected identifier values in selection order.
    pub fn selected_ids(&self) -> &[Value] {
        &self.selected
    }

    pub fn is_selected(&self, id: &Value) -> bool {
        self.selected.contains(id)
    }

    /// Selects rows of the current view by id.
    ///
    /// `None` targets every row of the view. In single mode nothing is added
    /// once one id is selected. Returns the rows that were newly selected.
    pub fn select(&mut self, ids: Option<&[Value]>, view: &[Row], identifier: &str) -> Vec<Row> {
        if !self.is_enabled() {
            return Vec::new();
        }
        let targets = Self::targets(ids, view, identifier);
        let mut added = Vec::new();
        for id in targets {
            if self.mode == SelectionMode::Single && !self.selected.is_empty() {
                break;
            }
            if self.selected.contains(&id) {
                continue;
            }
            if let Some(row) = view.iter().find(|r| r.get(identifier) == &id) {
                added.push(row.clone());
                self.selected.push(id);
            }
        }
        added
    }

    /// Deselects rows of the current view by id.
    ///
    /// `None` targets every row of the view. Returns the rows that were
    /// actually deselected.
    pub fn deselect(&mut self, ids: Option<&[Value]>, view: &[Row], identifier: &str) -> Vec<Row> {
        if !self.is_enabled() {
            return Vec::new();
        }
        let targets = Self::targets(ids, view, identifier);
        let mut removed = Vec::new();
        for id in targets {
            let Some(pos) = self.selected.iter().position(|s| *s == id) else {
                continue;
            };
            if let Some(row) = view.iter().find(|r| r.get(identifier) == &id) {
                removed.push(row.clone());
                self.selected.remove(pos);
            }
        }
        removed
    }

    /// Drops ids without emitting anything (rows left the store).
    pub fn forget(&mut self, ids: &[Value]) {
        self.selected.retain(|id| !ids.contains(id));
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// True iff the view is non-empty and every row in it is selected.
    pub fn all_selected(&self, view: &[Row], identifier: &str) -> bool {
        !view.is_empty() && view.iter().all(|r| self.selected.contains(r.get(identifier)))
    }

    fn targets(ids: Option<&[Value]>, view: &[Row], identifier: &str) -> Vec<Value> {
        match ids {
            Some(ids) => ids.to_vec(),
            None => view.iter().map(|r| r.get(identifier).clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> Vec<Row> {
        (1..=3).map(|i| Row::new().with("id", i)).collect()
    }

    fn ids(values: &[i32]) -> Vec<Value> {
        values.iter().map(|v| Value::from(*v)).collect()
    }

    #[test]
    fn test_disabled_selection_is_noop() {
        let mut tracker = SelectionTracker::new(SelectionMode::None);
        assert!(tracker.select(None, &view(), "id").is_empty());
        assert!(tracker.selected_ids().is_empty());
    }

    #[test]
    fn test_mode_requires_identifier() {
        assert_eq!(SelectionMode::from_options(true, true, false), SelectionMode::None);
        assert_eq!(SelectionMode::from_options(true, false, true), SelectionMode::Single);
        assert_eq!(SelectionMode::from_options(false, true, true), SelectionMode::None);
    }

    #[test]
    fn test_single_select_cap() {
        let mut tracker = SelectionTracker::new(SelectionMode::Single);
        let added = tracker.select(Some(&ids(&[2, 3])), &view(), "id");
        assert_eq!(added.len(), 1);
        assert!(tracker.select(Some(&ids(&[1])), &view(), "id").is_empty());
        assert_eq!(tracker.selected_ids(), &ids(&[2])[..]);
    }

    #[test]
    fn test_multi_select_all_and_flag() {
        let mut tracker = SelectionTracker::new(SelectionMode::Multi);
        assert!(!tracker.all_selected(&view(), "id"));
        assert_eq!(tracker.select(None, &view(), "id").len(), 3);
        assert!(tracker.all_selected(&view(), "id"));
        // Already selected, nothing changes.
        assert!(tracker.select(Some(&ids(&[1])), &view(), "id").is_empty());
    }

    #[test]
    fn test_select_ignores_ids_outside_view() {
        let mut tracker = SelectionTracker::new(SelectionMode::Multi);
        assert!(tracker.select(Some(&ids(&[9])), &view(), "id").is_empty());
    }

    #[test]
    fn test_deselect_reports_changed_rows_only() {
        let mut tracker = SelectionTracker::new(SelectionMode::Multi);
        tracker.select(Some(&ids(&[1, 2])), &view(), "id");
        let removed = tracker.deselect(None, &view(), "id");
        assert_eq!(removed.len(), 2);
        assert!(tracker.deselect(None, &view(), "id").is_empty());
    }

    #[test]
    fn test_forget_prunes_silently() {
        let mut tracker = SelectionTracker::new(SelectionMode::Multi);
        tracker.select(None, &view(), "id");
        tracker.forget(&ids(&[1, 3]));
        assert_eq!(tracker.selected_ids(), &ids(&[2])[..]);
    }
}
