//! Render snapshots handed to a render sink.
//!
//! The grid never exposes its live state to the presentation layer. Each
//! render builds a [`GridView`]: an owned, read-only description of the
//! header, body and controls that a sink turns into markup, terminal output,
//! or anything else.

use serde::Serialize;

use crate::column::{Align, Column, ColumnRegistry};
use crate::options::{GridOptions, Mode, Navigation};
use crate::pagination::{Infos, PageSize, PagerItem, Pagination};
use crate::row::Row;
use crate::selection::{SelectionMode, SelectionTracker};
use crate::sort::{SortDirective, SortOrder};
use crate::value::Value;

/// Receives render snapshots.
pub trait RenderSink: Send {
    fn render(&mut self, view: &GridView);
}

impl<F: FnMut(&GridView) + Send> RenderSink for F {
    fn render(&mut self, view: &GridView) {
        self(view)
    }
}

/// A full snapshot of what the grid shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridView {
    pub navigation: Navigation,
    pub header: Vec<HeaderCell>,
    /// Select-all box; only offered with multi-select.
    pub select_all: Option<SelectAll>,
    /// Whether rows carry a selection box.
    pub selectable: bool,
    pub body: Body,
    pub pager: Vec<PagerItem>,
    pub infos: Infos,
    pub infos_text: String,
    pub row_counts: Vec<RowCountOption>,
    /// Empty when the picker is not offered.
    pub column_picker: Vec<ColumnPickerItem>,
    pub search: SearchBox,
    /// Refresh action label; server mode only.
    pub refresh: Option<String>,
    pub busy: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderCell {
    pub id: String,
    pub text: String,
    pub align: Align,
    pub css_class: String,
    pub width: Option<String>,
    /// Clicking the header toggles its sort.
    pub sortable: bool,
    pub sort: Option<SortOrder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectAll {
    pub checked: bool,
}

/// What the table body shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "content")]
pub enum Body {
    /// Nothing loaded yet; carries the loading label.
    Loading(String),
    /// Empty view or failed load; carries the no-results label.
    NoResults(String),
    Rows(Vec<BodyRow>),
}

impl Body {
    pub fn rows(&self) -> &[BodyRow] {
        match self {
            Body::Rows(rows) => rows,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyRow {
    /// Identifier value, when an identifier column exists.
    pub id: Option<Value>,
    pub cells: Vec<BodyCell>,
    /// Class from the status mapping.
    pub status_class: Option<String>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyCell {
    pub column_id: String,
    pub text: String,
    pub align: Align,
    pub css_class: String,
    pub width: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowCountOption {
    pub size: PageSize,
    pub label: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnPickerItem {
    pub id: String,
    pub text: String,
    pub visible: bool,
    /// False for the last visible column, which cannot be hidden.
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchBox {
    pub placeholder: String,
    pub phrase: String,
}

/// Borrowed grid state a snapshot is built from.
pub(crate) struct ViewSource<'a> {
    pub options: &'a GridOptions,
    pub columns: &'a ColumnRegistry,
    pub directive: &'a SortDirective,
    pub selection: &'a SelectionTracker,
    pub pagination: &'a Pagination,
    pub rows: &'a [Row],
    pub search_phrase: &'a str,
    pub busy: bool,
    pub loaded: bool,
    pub failed: bool,
}

impl ViewSource<'_> {
    pub(crate) fn build(&self) -> GridView {
        let options = self.options;
        let labels = &options.labels;
        let infos = self.pagination.infos();
        let identifier = self.columns.identifier_id();

        GridView {
            navigation: options.navigation,
            header: self.header(),
            select_all: self.select_all(identifier),
            selectable: self.selection.is_enabled(),
            body: self.body(identifier),
            pager: self.pagination.pager(options.padding),
            infos_text: labels.infos_text(&infos),
            infos,
            row_counts: self.row_counts(),
            column_picker: self.column_picker(),
            search: SearchBox {
                placeholder: labels.search.clone(),
                phrase: self.search_phrase.to_string(),
            },
            refresh: (options.mode == Mode::Server).then(|| labels.refresh.clone()),
            busy: self.busy,
        }
    }

    fn header(&self) -> Vec<HeaderCell> {
        self.columns
            .visible_columns()
            .map(|column| HeaderCell {
                id: column.id.clone(),
                text: column.text.clone(),
                align: column.header_align,
                css_class: column.header_css_class.clone(),
                width: column.width.clone(),
                sortable: self.options.sorting && column.sortable,
                sort: self.directive.get(&column.id),
            })
            .collect()
    }

    fn select_all(&self, identifier: Option<&str>) -> Option<SelectAll> {
        if self.selection.mode() != SelectionMode::Multi {
            return None;
        }
        let checked = identifier.is_some_and(|id| self.selection.all_selected(self.rows, id));
        Some(SelectAll { checked })
    }

    fn body(&self, identifier: Option<&str>) -> Body {
        let labels = &self.options.labels;
        if self.failed {
            return Body::NoResults(labels.no_results.clone());
        }
        if self.rows.is_empty() {
            return if self.loaded {
                Body::NoResults(labels.no_results.clone())
            } else {
                Body::Loading(labels.loading.clone())
            };
        }

        let visible: Vec<&Column> = self.columns.visible_columns().collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let id = identifier.map(|column| row.get(column).clone());
                let selected = id.as_ref().is_some_and(|id| self.selection.is_selected(id));
                BodyRow {
                    cells: visible.iter().map(|column| body_cell(column, row)).collect(),
                    status_class: self.options.status_class(row.status()).map(str::to_string),
                    selected,
                    id,
                }
            })
            .collect();
        Body::Rows(rows)
    }

    fn row_counts(&self) -> Vec<RowCountOption> {
        let current = self.pagination.size();
        self.options
            .row_counts
            .iter()
            .map(|size| RowCountOption {
                size: *size,
                label: match size {
                    PageSize::Rows(n) => n.to_string(),
                    PageSize::All => self.options.labels.all.clone(),
                },
                active: *size == current,
            })
            .collect()
    }

    fn column_picker(&self) -> Vec<ColumnPickerItem> {
        if !self.options.column_selection || self.columns.columns().len() <= 1 {
            return Vec::new();
        }
        let last_visible = self.columns.visible_count() <= 1;
        self.columns
            .columns()
            .iter()
            .filter(|c| c.visible_in_selection)
            .map(|c| ColumnPickerItem {
                id: c.id.clone(),
                text: c.text.clone(),
                visible: c.visible,
                enabled: !(c.visible && last_visible),
            })
            .collect()
    }
}

fn body_cell(column: &Column, row: &Row) -> BodyCell {
    BodyCell {
        column_id: column.id.clone(),
        text: column.cell_text(row),
        align: column.align,
        css_class: column.css_class.clone(),
        width: column.width.clone(),
    }
}
