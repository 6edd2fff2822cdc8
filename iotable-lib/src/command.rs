//! Commands a host or render sink sends to the grid.

use crate::pagination::{PageSize, PageTarget};
use crate::row::Row;
use crate::sort::SortDirective;
use crate::value::Value;

/// A state-changing request, dispatched with `Grid::dispatch`.
///
/// Read-only queries go through the grid's typed accessors instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Append(Vec<Row>),
    Clear,
    /// Removes rows by id; `None` removes the selected rows.
    Remove(Option<Vec<Value>>),
    Reload,
    /// Searches immediately; `None` clears the phrase.
    Search(Option<String>),
    /// Raw search-field input, debounced.
    SearchInput { text: String, enter: bool },
    /// Replaces the sort directive; `None` clears it.
    Sort(Option<SortDirective>),
    /// Header click on a column.
    ToggleSort(String),
    GoToPage(PageTarget),
    SetPageSize(PageSize),
    Select(Option<Vec<Value>>),
    Deselect(Option<Vec<Value>>),
    ToggleSelectAll,
    SetColumnVisible { id: String, visible: bool },
    /// Click on a row of the current view, by position.
    ClickRow(usize),
}

impl Command {
    /// Short command name, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Append(_) => "append",
            Command::Clear => "clear",
            Command::Remove(_) => "remove",
            Command::Reload => "reload",
            Command::Search(_) => "search",
            Command::SearchInput { .. } => "search-input",
            Command::Sort(_) => "sort",
            Command::ToggleSort(_) => "toggle-sort",
            Command::GoToPage(_) => "go-to-page",
            Command::SetPageSize(_) => "set-page-size",
            Command::Select(_) => "select",
            Command::Deselect(_) => "deselect",
            Command::ToggleSelectAll => "toggle-select-all",
            Command::SetColumnVisible { .. } => "set-column-visible",
            Command::ClickRow(_) => "click-row",
        }
    }
}
