//! The grid controller.
//!
//! [`Grid`] exclusively owns every piece of grid state: columns, rows, sort,
//! selection, pagination and the current view. Hosts change it only through
//! its operations (or [`Command`]s) and observe it through typed accessors,
//! render snapshots and [`GridEvent`]s.
//!
//! # Refresh cycle
//!
//! Every view-changing operation starts a refresh with a new generation
//! number. Local mode computes the view right away but only delivers it
//! through the completion channel, so the result lands on the next
//! [`Grid::pump`] (or [`Grid::settle`]). Server mode spawns one fetch per
//! refresh and cancels the previous one first. A completion whose generation
//! is not the latest is dropped without touching state.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::column::{Column, ColumnDef, ColumnRegistry};
use crate::command::Command;
use crate::error::{ConfigError, GridError, TransportError};
use crate::event::{GridEvent, Listener, LoadStatus};
use crate::options::{GridHooks, GridOptions, Mode};
use crate::pagination::{PageSize, PageTarget, Pagination};
use crate::remote::{DataSource, GridRequest, GridResponse, HttpDataSource, fetch_page};
use crate::render::{GridView, RenderSink, ViewSource};
use crate::row::{Row, RowStore};
use crate::search::SearchDebouncer;
use crate::selection::{SelectionMode, SelectionTracker};
use crate::sort::{SortDirective, SortState};
use crate::value::Value;
use crate::view::{ViewPipeline, ViewQuery, ViewResult};

/// Columns and initial rows a grid is built from.
///
/// `cells` holds raw cell text in column declaration order, the way it
/// would be read off existing table markup; each cell goes through its
/// column's converter. `rows` are already typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridSeed {
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub cells: Vec<Vec<String>>,
}

impl GridSeed {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_cells(mut self, cells: Vec<Vec<String>>) -> Self {
        self.cells = cells;
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self, GridError> {
        serde_json::from_str(text).map_err(|e| GridError::Seed(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GridError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::from)?;
        Self::from_json_str(&text)
    }
}

struct Completion {
    generation: u64,
    outcome: Outcome,
}

enum Outcome {
    Local(ViewResult),
    Remote {
        requested_page: usize,
        result: Result<GridResponse, TransportError>,
    },
}

/// Builder for [`Grid`].
///
/// # Example
///
/// ```
/// use iotable_lib::{ColumnDef, Grid, GridOptions, GridSeed, Row};
///
/// let seed = GridSeed::new(vec![ColumnDef::new("id").identifier(), ColumnDef::new("name")])
///     .with_rows(vec![Row::new().with("id", 1).with("name", "alice")]);
/// let mut grid = Grid::builder(seed).options(GridOptions::default()).build().unwrap();
/// grid.pump();
/// assert_eq!(grid.total_rows(), 1);
/// ```
pub struct GridBuilder {
    seed: GridSeed,
    options: GridOptions,
    hooks: GridHooks,
    source: Option<Arc<dyn DataSource>>,
    sink: Option<Box<dyn RenderSink>>,
    listeners: Vec<Listener>,
}

impl GridBuilder {
    pub fn options(mut self, options: GridOptions) -> Self {
        self.options = options;
        self
    }

    pub fn hooks(mut self, hooks: GridHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Overrides the HTTP source built from the `url` option in server mode.
    pub fn data_source(mut self, source: impl DataSource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn render_sink(mut self, sink: impl RenderSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Attaches a listener before construction so it also sees
    /// `Initialize` and `Initialized`.
    pub fn listener(mut self, listener: impl FnMut(&GridEvent) + Send + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Validates the configuration, registers columns, seeds rows and
    /// schedules the first refresh.
    pub fn build(self) -> Result<Grid, GridError> {
        let options = self.options;
        options.validate()?;

        let (columns, initial_sort) = ColumnRegistry::register(
            self.seed.columns,
            &self.hooks.converters,
            &self.hooks.formatters,
            options.multi_sort,
        )?;
        let identifier = columns.identifier_id().map(str::to_string);

        let (source, runtime) = match options.mode {
            Mode::Local => (None, None),
            Mode::Server => {
                let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
                let source = match self.source {
                    Some(source) => source,
                    None => Arc::new(
                        HttpDataSource::builder(options.url.clone())
                            .method(options.method)
                            .build()?,
                    ) as Arc<dyn DataSource>,
                };
                (Some(source), Some(runtime))
            }
        };

        let selection_mode =
            SelectionMode::from_options(options.selection, options.multi_select, identifier.is_some());
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let mut grid = Grid {
            columns,
            store: RowStore::new(identifier),
            sort: SortState::new(initial_sort, options.multi_sort),
            selection: SelectionTracker::new(selection_mode),
            pagination: Pagination::new(options.rows_per_page),
            search_phrase: String::new(),
            debouncer: SearchDebouncer::new(options.search.delay(), options.search.characters),
            current: Vec::new(),
            busy: false,
            loaded: false,
            failed: false,
            last_error: None,
            generation: 0,
            inflight: None,
            completions_tx,
            completions_rx,
            source,
            runtime,
            hooks: self.hooks,
            sink: self.sink,
            listeners: self.listeners,
            options,
        };

        grid.emit(GridEvent::Initialize);
        grid.seed_rows(self.seed.rows, self.seed.cells);
        grid.render();
        grid.emit(GridEvent::Initialized);
        info!(
            "Grid initialized: {} columns, {:?} mode, selection {:?}",
            grid.columns.columns().len(),
            grid.options.mode,
            selection_mode
        );

        grid.refresh();
        Ok(grid)
    }
}

/// A single data grid.
pub struct Grid {
    options: GridOptions,
    hooks: GridHooks,
    columns: ColumnRegistry,
    store: RowStore,
    sort: SortState,
    selection: SelectionTracker,
    pagination: Pagination,
    search_phrase: String,
    debouncer: SearchDebouncer,

    /// Rows of the current view.
    current: Vec<Row>,
    busy: bool,
    /// At least one refresh completed.
    loaded: bool,
    /// The latest refresh failed.
    failed: bool,
    last_error: Option<TransportError>,

    generation: u64,
    inflight: Option<CancellationToken>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    source: Option<Arc<dyn DataSource>>,
    runtime: Option<Handle>,

    sink: Option<Box<dyn RenderSink>>,
    listeners: Vec<Listener>,
}

impl Grid {
    pub fn builder(seed: GridSeed) -> GridBuilder {
        GridBuilder {
            seed,
            options: GridOptions::default(),
            hooks: GridHooks::default(),
            source: None,
            sink: None,
            listeners: Vec::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn columns(&self) -> &[Column] {
        self.columns.columns()
    }

    pub fn current_page(&self) -> usize {
        self.pagination.current()
    }

    pub fn current_rows(&self) -> &[Row] {
        &self.current
    }

    pub fn page_size(&self) -> PageSize {
        self.pagination.size()
    }

    pub fn search_phrase(&self) -> &str {
        &self.search_phrase
    }

    pub fn selected_ids(&self) -> &[Value] {
        self.selection.selected_ids()
    }

    pub fn sort_directive(&self) -> &SortDirective {
        self.sort.directive()
    }

    pub fn total_pages(&self) -> usize {
        self.pagination.total_pages()
    }

    pub fn total_rows(&self) -> usize {
        self.pagination.total_rows()
    }

    /// True between a refresh starting and its result being applied.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// The failure of the latest refresh, if it failed.
    pub fn last_error(&self) -> Option<&TransportError> {
        self.last_error.as_ref()
    }

    /// Every row held locally, in insertion order. Empty in server mode.
    pub fn all_rows(&self) -> &[Row] {
        self.store.all()
    }

    /// When a debounced search is due, if one is pending.
    pub fn search_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Builds a render snapshot of the current state.
    pub fn view(&self) -> GridView {
        ViewSource {
            options: &self.options,
            columns: &self.columns,
            directive: self.sort.directive(),
            selection: &self.selection,
            pagination: &self.pagination,
            rows: &self.current,
            search_phrase: &self.search_phrase,
            busy: self.busy,
            loaded: self.loaded,
            failed: self.failed,
        }
        .build()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&GridEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn set_render_sink(&mut self, sink: impl RenderSink + 'static) {
        self.sink = Some(Box::new(sink));
        self.render();
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Applies a command.
    pub fn dispatch(&mut self, command: Command) -> Result<(), GridError> {
        debug!("Dispatching {}", command.name());
        match command {
            Command::Append(rows) => {
                self.append(rows);
            }
            Command::Clear => {
                self.clear();
            }
            Command::Remove(ids) => {
                self.remove(ids.as_deref());
            }
            Command::Reload => self.reload(),
            Command::Search(phrase) => {
                self.search(phrase.as_deref().unwrap_or_default());
            }
            Command::SearchInput { text, enter } => {
                self.search_input(&text, enter);
            }
            Command::Sort(directive) => {
                self.sort(directive);
            }
            Command::ToggleSort(column_id) => {
                self.toggle_sort(&column_id);
            }
            Command::GoToPage(target) => {
                self.go_to_page(target);
            }
            Command::SetPageSize(size) => {
                self.set_page_size(size);
            }
            Command::Select(ids) => {
                self.select(ids.as_deref());
            }
            Command::Deselect(ids) => {
                self.deselect(ids.as_deref());
            }
            Command::ToggleSelectAll => {
                self.toggle_select_all();
            }
            Command::SetColumnVisible { id, visible } => {
                self.set_column_visible(&id, visible)?;
            }
            Command::ClickRow(index) => {
                self.click_row(index);
            }
        }
        Ok(())
    }

    /// Appends rows in local mode and returns how many were accepted.
    ///
    /// Rows whose identifier is already present are skipped.
    pub fn append(&mut self, rows: Vec<Row>) -> usize {
        if !self.is_local("append") {
            return 0;
        }
        let appended = self.store.append_all(rows);
        if appended.is_empty() {
            return 0;
        }
        let count = appended.len();
        debug!("Appended {count} rows");
        self.pagination.reset();
        self.refresh();
        self.emit(GridEvent::Appended(appended));
        count
    }

    /// Removes every local row and returns how many there were.
    pub fn clear(&mut self) -> usize {
        if !self.is_local("clear") {
            return 0;
        }
        let removed = self.store.clear();
        if removed.is_empty() {
            return 0;
        }
        let count = removed.len();
        self.forget_selected(&removed);
        self.pagination.reset();
        self.refresh();
        self.emit(GridEvent::Cleared(removed));
        count
    }

    /// Removes local rows by id; `None` removes the selected rows.
    pub fn remove(&mut self, ids: Option<&[Value]>) -> usize {
        if !self.is_local("remove") {
            return 0;
        }
        let ids = match ids {
            Some(ids) => ids.to_vec(),
            None => self.selection.selected_ids().to_vec(),
        };
        let removed = self.store.remove_by_ids(&ids);
        if removed.is_empty() {
            return 0;
        }
        let count = removed.len();
        self.forget_selected(&removed);
        self.pagination.reset();
        self.refresh();
        self.emit(GridEvent::Removed(removed));
        count
    }

    /// Returns to the first page and refreshes.
    pub fn reload(&mut self) {
        self.pagination.reset();
        self.refresh();
    }

    /// Searches for a phrase right away. An unchanged phrase is a no-op.
    pub fn search(&mut self, phrase: &str) -> bool {
        self.debouncer.cancel();
        if self.search_phrase == phrase {
            trace!("Search phrase unchanged");
            return false;
        }
        debug!("Searching for '{phrase}'");
        self.search_phrase = phrase.to_string();
        self.pagination.reset();
        self.refresh();
        true
    }

    /// Feeds search-field input through the debouncer.
    pub fn search_input(&mut self, text: &str, enter: bool) -> bool {
        self.search_input_at(text, enter, Instant::now())
    }

    /// Like [`Grid::search_input`] with an explicit clock.
    pub fn search_input_at(&mut self, text: &str, enter: bool, now: Instant) -> bool {
        self.debouncer.input(text, enter, now)
    }

    /// Runs a debounced search whose deadline has passed.
    pub fn poll_search(&mut self, now: Instant) -> bool {
        match self.debouncer.poll(now) {
            Some(phrase) => self.search(&phrase),
            None => false,
        }
    }

    /// Replaces the sort directive; `None` clears it.
    ///
    /// Unknown column ids are dropped from the directive. Returns `false`
    /// when the result equals the current directive.
    pub fn sort(&mut self, directive: Option<SortDirective>) -> bool {
        let directive: SortDirective = directive
            .unwrap_or_default()
            .iter()
            .filter(|(column_id, _)| {
                let known = self.columns.lookup(column_id).is_ok();
                if !known {
                    debug!("Dropping unknown sort column '{column_id}'");
                }
                known
            })
            .map(|(column_id, order)| (column_id.to_string(), order))
            .collect();
        if !self.sort.replace(directive) {
            trace!("Sort directive unchanged");
            return false;
        }
        debug!("Sort directive set to {:?}", self.sort.directive());
        self.pagination.reset();
        self.refresh();
        true
    }

    /// Advances a column's sort on header interaction.
    ///
    /// Returns `false` when sorting is off or the column is unknown or not
    /// sortable.
    pub fn toggle_sort(&mut self, column_id: &str) -> bool {
        let sortable = match self.columns.lookup(column_id) {
            Ok(column) => self.options.sorting && column.sortable,
            Err(_) => false,
        };
        if !sortable {
            debug!("Column '{column_id}' is not sortable");
            return false;
        }
        self.sort.toggle(column_id);
        self.pagination.reset();
        self.refresh();
        true
    }

    /// Navigates the pager. Returns `false` if the page did not change.
    pub fn go_to_page(&mut self, target: PageTarget) -> bool {
        if !self.pagination.navigate(target) {
            return false;
        }
        debug!("Moved to page {}", self.pagination.current());
        self.refresh();
        true
    }

    /// Changes the page size and returns to the first page.
    ///
    /// A zero row count is ignored.
    pub fn set_page_size(&mut self, size: PageSize) -> bool {
        if !self.pagination.set_size(size) {
            return false;
        }
        debug!("Page size set to {size:?}");
        self.refresh();
        true
    }

    /// Selects rows of the current view; `None` selects the whole view.
    pub fn select(&mut self, ids: Option<&[Value]>) -> usize {
        let Some(identifier) = self.columns.identifier_id() else {
            return 0;
        };
        let selected = self.selection.select(ids, &self.current, identifier);
        if selected.is_empty() {
            return 0;
        }
        let count = selected.len();
        self.render();
        self.emit(GridEvent::Selected(selected));
        count
    }

    /// Deselects rows of the current view; `None` deselects the whole view.
    pub fn deselect(&mut self, ids: Option<&[Value]>) -> usize {
        let Some(identifier) = self.columns.identifier_id() else {
            return 0;
        };
        let deselected = self.selection.deselect(ids, &self.current, identifier);
        if deselected.is_empty() {
            return 0;
        }
        let count = deselected.len();
        self.render();
        self.emit(GridEvent::Deselected(deselected));
        count
    }

    /// Flips the select-all box. Only available with multi-select.
    pub fn toggle_select_all(&mut self) -> bool {
        if self.selection.mode() != SelectionMode::Multi {
            return false;
        }
        let Some(identifier) = self.columns.identifier_id() else {
            return false;
        };
        if self.selection.all_selected(&self.current, identifier) {
            self.deselect(None) > 0
        } else {
            self.select(None) > 0
        }
    }

    /// Shows or hides a column, then refreshes.
    ///
    /// Hiding the last visible column is refused with `Ok(false)`.
    pub fn set_column_visible(&mut self, id: &str, visible: bool) -> Result<bool, GridError> {
        if !self.columns.set_visible(id, visible)? {
            return Ok(false);
        }
        debug!("Column '{id}' visible: {visible}");
        self.refresh();
        Ok(true)
    }

    /// Handles a click on the row at `index` of the current view.
    ///
    /// With row selection on, the click toggles the row's selection; in
    /// single-select mode selecting a row replaces the previous one.
    pub fn click_row(&mut self, index: usize) -> bool {
        let Some(row) = self.current.get(index).cloned() else {
            return false;
        };

        if self.options.row_select
            && self.selection.is_enabled()
            && let Some(identifier) = self.columns.identifier_id()
        {
            let id = row.get(identifier).clone();
            if self.selection.is_selected(&id) {
                self.deselect(Some(std::slice::from_ref(&id)));
            } else {
                if self.selection.mode() == SelectionMode::Single {
                    let previous = self.selection.selected_ids().to_vec();
                    self.deselect(Some(&previous));
                    self.selection.forget(&previous);
                }
                self.select(Some(std::slice::from_ref(&id)));
            }
        }

        self.emit(GridEvent::Click { row });
        true
    }

    // =========================================================================
    // Refresh cycle
    // =========================================================================

    /// Applies every completion that has already arrived.
    ///
    /// Returns how many were applied; stale ones are dropped and not counted.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            if self.apply(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Waits until the latest refresh has been applied.
    pub async fn settle(&mut self) {
        while self.busy {
            match self.completions_rx.recv().await {
                Some(completion) => {
                    self.apply(completion);
                }
                None => break,
            }
        }
    }

    fn refresh(&mut self) {
        self.generation += 1;
        let generation = self.generation;
        if let Some(token) = self.inflight.take() {
            debug!("Cancelling superseded fetch");
            token.cancel();
        }

        self.busy = true;
        self.emit(GridEvent::Load);

        match self.options.mode {
            Mode::Local => {
                let result = ViewPipeline::compute(
                    self.store.all(),
                    self.columns.columns(),
                    ViewQuery {
                        phrase: &self.search_phrase,
                        directive: self.sort.directive(),
                        page: self.pagination.current(),
                        size: self.pagination.size(),
                        case_sensitive: self.options.case_sensitive,
                    },
                );
                self.deliver(Completion {
                    generation,
                    outcome: Outcome::Local(result),
                });
            }
            Mode::Server => self.spawn_fetch(generation),
        }
    }

    fn spawn_fetch(&mut self, generation: u64) {
        let (Some(source), Some(runtime)) = (self.source.clone(), self.runtime.clone()) else {
            warn!("Server mode without a data source");
            return;
        };
        let requested_page = self.pagination.current();
        let request = GridRequest::new(
            requested_page,
            self.pagination.size(),
            self.sort.directive().clone(),
            self.search_phrase.clone(),
        )
        .with_extensions(&self.options.post);
        let request_handler = self.hooks.request_handler.clone();
        let response_handler = self.hooks.response_handler.clone();
        let tx = self.completions_tx.clone();
        let token = CancellationToken::new();
        self.inflight = Some(token.clone());

        debug!("Fetching page {requested_page} (generation {generation})");
        runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    trace!("Fetch for generation {generation} cancelled");
                }
                result = fetch_page(
                    source.as_ref(),
                    &request,
                    request_handler.as_ref(),
                    response_handler.as_ref(),
                ) => {
                    let completion = Completion {
                        generation,
                        outcome: Outcome::Remote { requested_page, result },
                    };
                    if tx.send(completion).is_err() {
                        trace!("Grid dropped before fetch completed");
                    }
                }
            }
        });
    }

    fn deliver(&self, completion: Completion) {
        if self.completions_tx.send(completion).is_err() {
            warn!("Completion channel closed");
        }
    }

    /// Applies a completion if it belongs to the latest refresh.
    fn apply(&mut self, completion: Completion) -> bool {
        if completion.generation != self.generation {
            debug!(
                "Discarding stale completion {} (latest {})",
                completion.generation, self.generation
            );
            return false;
        }
        self.inflight = None;
        self.busy = false;
        self.loaded = true;

        match completion.outcome {
            Outcome::Local(view) => self.update(view.rows, view.total),
            Outcome::Remote {
                requested_page,
                result: Ok(response),
            } => {
                let total = response.total_rows();
                self.pagination
                    .set_current(response.current.unwrap_or(requested_page));
                self.update(response.rows, total);
            }
            Outcome::Remote { result: Err(err), .. } => {
                warn!("Row fetch failed: {err}");
                self.failed = true;
                self.last_error = Some(err);
                self.render();
                self.emit(GridEvent::Loaded(LoadStatus::Failed));
            }
        }
        true
    }

    fn update(&mut self, rows: Vec<Row>, total: usize) {
        self.current = rows;
        self.pagination.set_total_rows(total);
        self.failed = false;
        self.last_error = None;
        if !self.options.keep_selection {
            self.selection.clear();
        }
        trace!(
            "View updated: {} rows, {} total, page {}/{}",
            self.current.len(),
            total,
            self.pagination.current(),
            self.pagination.total_pages()
        );
        self.render();
        self.emit(GridEvent::Loaded(LoadStatus::Success));
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn seed_rows(&mut self, rows: Vec<Row>, cells: Vec<Vec<String>>) {
        if self.options.mode == Mode::Server {
            if !rows.is_empty() || !cells.is_empty() {
                debug!("Ignoring seed rows in server mode");
            }
            return;
        }
        let column_count = self.columns.columns().len();
        let converted: Vec<Row> = cells
            .iter()
            .map(|record| {
                if record.len() > column_count {
                    warn!("Seed row has {} cells for {column_count} columns", record.len());
                }
                let pairs = self
                    .columns
                    .columns()
                    .iter()
                    .zip(record)
                    .map(|(column, raw)| (column.id.as_str(), raw.as_str()));
                self.columns.row_from_raw(pairs)
            })
            .collect();

        let offered = rows.len() + converted.len();
        let accepted = self.store.append_all(rows.into_iter().chain(converted)).len();
        if accepted < offered {
            debug!("Dropped {} seed rows with duplicate identifiers", offered - accepted);
        }
        self.pagination.set_total_rows(self.store.len());
    }

    fn is_local(&self, operation: &str) -> bool {
        if self.options.mode == Mode::Local {
            return true;
        }
        debug!("Ignoring {operation} in server mode");
        false
    }

    fn forget_selected(&mut self, rows: &[Row]) {
        if let Some(identifier) = self.columns.identifier_id() {
            let ids: Vec<Value> = rows.iter().map(|r| r.get(identifier).clone()).collect();
            self.selection.forget(&ids);
        }
    }

    fn render(&mut self) {
        if self.sink.is_none() {
            return;
        }
        let view = self.view();
        if let Some(sink) = self.sink.as_mut() {
            sink.render(&view);
        }
    }

    fn emit(&mut self, event: GridEvent) {
        debug!("Event: {}", event.name());
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

impl Drop for Grid {
    fn drop(&mut self) {
        if let Some(token) = self.inflight.take() {
            debug!("Grid dropped, cancelling in-flight fetch");
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventLog;
    use crate::render::Body;
    use crate::sort::SortOrder;

    fn seed() -> GridSeed {
        GridSeed::new(vec![
            ColumnDef::new("id").identifier().converter("numeric").searchable(false),
            ColumnDef::new("name"),
        ])
        .with_cells(
            ["a", "b", "c", "d", "e"]
                .iter()
                .enumerate()
                .map(|(i, name)| vec![(i + 1).to_string(), name.to_string()])
                .collect(),
        )
    }

    fn grid(options: GridOptions) -> (Grid, EventLog) {
        let log = EventLog::new();
        let mut grid = Grid::builder(seed())
            .options(options.with_rows_per_page(PageSize::Rows(2)))
            .listener(log.listener())
            .build()
            .unwrap();
        grid.pump();
        (grid, log)
    }

    fn ids(grid: &Grid) -> Vec<Value> {
        grid.current_rows().iter().map(|r| r.get("id").clone()).collect()
    }

    fn values(ids: &[i32]) -> Vec<Value> {
        ids.iter().map(|i| Value::from(*i)).collect()
    }

    #[test]
    fn test_lifecycle_events_on_build() {
        let (grid, log) = grid(GridOptions::default());
        assert_eq!(log.names(), vec!["initialize", "initialized", "load", "loaded"]);
        assert_eq!(grid.total_rows(), 5);
        assert_eq!(grid.total_pages(), 3);
        assert_eq!(ids(&grid), values(&[1, 2]));
    }

    #[test]
    fn test_result_is_deferred_until_pumped() {
        let mut grid = Grid::builder(seed()).build().unwrap();
        assert!(grid.is_busy());
        assert!(grid.current_rows().is_empty());
        assert!(matches!(grid.view().body, Body::Loading(_)));
        assert_eq!(grid.pump(), 1);
        assert!(!grid.is_busy());
        assert_eq!(grid.current_rows().len(), 5);
    }

    #[test]
    fn test_latest_local_refresh_wins() {
        let (mut grid, _) = grid(GridOptions::default());
        grid.go_to_page(PageTarget::Number(2));
        grid.go_to_page(PageTarget::Number(3));
        assert_eq!(grid.pump(), 1);
        assert_eq!(ids(&grid), values(&[5]));
    }

    #[test]
    fn test_search_resets_page_and_filters() {
        let (mut grid, _) = grid(GridOptions::default());
        grid.go_to_page(PageTarget::Last);
        grid.pump();
        assert!(grid.search("c"));
        assert!(!grid.search("c"));
        grid.pump();
        assert_eq!(grid.current_page(), 1);
        assert_eq!(ids(&grid), values(&[3]));
        assert_eq!(grid.total_rows(), 1);
    }

    #[test]
    fn test_toggle_sort_cycles_and_respects_sortable() {
        let (mut grid, _) = grid(GridOptions::default());
        assert!(grid.toggle_sort("name"));
        assert!(grid.toggle_sort("name"));
        grid.pump();
        assert_eq!(grid.sort_directive().get("name"), Some(SortOrder::Desc));
        assert_eq!(ids(&grid), values(&[5, 4]));
        assert!(!grid.toggle_sort("nope"));
        assert!(grid.dispatch(Command::ToggleSort("nope".into())).is_ok());
    }

    #[test]
    fn test_sort_value_equality_short_circuit() {
        let (mut grid, log) = grid(GridOptions::default());
        assert!(grid.sort(Some(SortDirective::desc("name"))));
        grid.pump();
        log.take();
        assert!(!grid.sort(Some(SortDirective::desc("name"))));
        assert!(log.take().is_empty());
    }

    #[test]
    fn test_sort_drops_unknown_columns() {
        let (mut grid, log) = grid(GridOptions::default().with_multi_sort(true));
        assert!(grid.sort(Some(SortDirective::desc("missing").then_desc("name"))));
        grid.pump();
        assert_eq!(grid.sort_directive(), &SortDirective::desc("name"));
        assert_eq!(ids(&grid), values(&[5, 4]));
        log.take();

        // Only unknown ids left: nothing changes.
        assert!(!grid.sort(Some(SortDirective::desc("name").then_asc("nope"))));
        assert!(log.take().is_empty());

        assert!(grid.dispatch(Command::Sort(Some(SortDirective::asc("nope")))).is_ok());
        grid.pump();
        assert!(grid.sort_directive().is_empty());
        assert_eq!(ids(&grid), values(&[1, 2]));
    }

    #[test]
    fn test_append_rejects_duplicates_and_emits_accepted() {
        let (mut grid, log) = grid(GridOptions::default());
        log.take();
        let accepted = grid.append(vec![
            Row::new().with("id", 6).with("name", "f"),
            Row::new().with("id", 1).with("name", "dup"),
        ]);
        assert_eq!(accepted, 1);
        assert_eq!(grid.append(vec![Row::new().with("id", 6)]), 0);
        grid.pump();
        assert_eq!(grid.total_rows(), 6);
        let events = log.take();
        assert!(events.contains(&GridEvent::Appended(vec![Row::new().with("id", 6).with("name", "f")])));
    }

    #[test]
    fn test_remove_defaults_to_selection() {
        let (mut grid, log) = grid(GridOptions::default().with_selection(true));
        assert_eq!(grid.select(Some(&values(&[1, 9]))), 1);
        assert_eq!(grid.remove(None), 1);
        assert!(grid.selected_ids().is_empty());
        grid.pump();
        assert_eq!(grid.total_rows(), 4);
        assert!(log.names().contains(&"removed"));
    }

    #[test]
    fn test_selection_cleared_on_refresh_unless_kept() {
        let (mut grid, _) = grid(GridOptions::default().with_selection(true));
        grid.select(None);
        grid.reload();
        grid.pump();
        assert!(grid.selected_ids().is_empty());

        let (mut grid, _) = grid_kept();
        grid.select(None);
        grid.go_to_page(PageTarget::Next);
        grid.pump();
        assert_eq!(grid.selected_ids(), &values(&[1, 2])[..]);
    }

    fn grid_kept() -> (Grid, EventLog) {
        grid(GridOptions::default().with_selection(true).with_keep_selection(true))
    }

    #[test]
    fn test_single_select_cap_and_row_click_replace() {
        let (mut grid, log) = grid(GridOptions::default().with_selection(false).with_row_select(true));
        assert_eq!(grid.select(None), 1);
        assert_eq!(grid.select(Some(&values(&[2]))), 0);
        assert_eq!(grid.selected_ids(), &values(&[1])[..]);

        log.take();
        assert!(grid.click_row(1));
        assert_eq!(grid.selected_ids(), &values(&[2])[..]);
        assert_eq!(log.names(), vec!["deselected", "selected", "click"]);

        grid.click_row(1);
        assert!(grid.selected_ids().is_empty());
    }

    #[test]
    fn test_selection_disabled_without_identifier() {
        let seed = GridSeed::new(vec![ColumnDef::new("name")]).with_rows(vec![Row::new().with("name", "x")]);
        let mut grid = Grid::builder(seed)
            .options(GridOptions::default().with_selection(true))
            .build()
            .unwrap();
        grid.pump();
        assert_eq!(grid.select(None), 0);
        assert_eq!(grid.remove(Some(&[Value::from("x")])), 0);
    }

    #[test]
    fn test_toggle_select_all() {
        let (mut grid, _) = grid(GridOptions::default().with_selection(true));
        assert!(grid.toggle_select_all());
        assert_eq!(grid.view().select_all.map(|s| s.checked), Some(true));
        assert!(grid.toggle_select_all());
        assert!(grid.selected_ids().is_empty());
    }

    #[test]
    fn test_page_size_change_resets_to_first_page() {
        let (mut grid, _) = grid(GridOptions::default());
        grid.go_to_page(PageTarget::Last);
        grid.pump();
        assert!(grid.set_page_size(PageSize::All));
        grid.pump();
        assert_eq!(grid.current_page(), 1);
        assert_eq!(grid.total_pages(), 1);
        assert_eq!(grid.current_rows().len(), 5);
    }

    #[test]
    fn test_zero_page_size_is_ignored() {
        let (mut grid, log) = grid(GridOptions::default());
        grid.go_to_page(PageTarget::Number(2));
        grid.pump();
        log.take();
        assert!(!grid.set_page_size(PageSize::Rows(0)));
        assert!(grid.dispatch(Command::SetPageSize(PageSize::Rows(0))).is_ok());
        assert_eq!(grid.pump(), 0);
        assert!(log.take().is_empty());
        assert_eq!(grid.page_size(), PageSize::Rows(2));
        assert_eq!(grid.current_page(), 2);
        assert_eq!(grid.total_pages(), 3);
        assert_eq!(ids(&grid), values(&[3, 4]));
        assert_eq!(grid.view().infos.start, 3);
    }

    #[test]
    fn test_hidden_column_is_not_searched() {
        let (mut grid, _) = grid(GridOptions::default());
        assert!(grid.set_column_visible("name", false).unwrap());
        grid.search("c");
        grid.pump();
        assert_eq!(grid.total_rows(), 0);
        assert!(!grid.set_column_visible("id", false).unwrap());
    }

    #[test]
    fn test_debounced_search() {
        let (mut grid, _) = grid(GridOptions::default());
        let start = Instant::now();
        assert!(grid.search_input_at("e", false, start));
        let due = start + std::time::Duration::from_millis(250);
        assert_eq!(grid.search_deadline(), Some(due));
        assert!(!grid.poll_search(start));
        assert!(grid.poll_search(due));
        assert_eq!(grid.search_deadline(), None);
        grid.pump();
        assert_eq!(ids(&grid), values(&[5]));
    }

    #[test]
    fn test_dispatch_routes_commands() {
        let (mut grid, _) = grid(GridOptions::default());
        grid.dispatch(Command::Sort(Some(SortDirective::desc("id")))).unwrap();
        grid.dispatch(Command::GoToPage(PageTarget::Next)).unwrap();
        grid.pump();
        assert_eq!(ids(&grid), values(&[3, 2]));
        grid.dispatch(Command::Clear).unwrap();
        grid.pump();
        assert_eq!(grid.total_rows(), 0);
        assert!(matches!(grid.view().body, Body::NoResults(_)));
    }

    #[test]
    fn test_render_sink_receives_snapshots() {
        let rendered = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink_rendered = Arc::clone(&rendered);
        let mut grid = Grid::builder(seed())
            .render_sink(move |view: &GridView| sink_rendered.lock().unwrap().push(view.body.rows().len()))
            .build()
            .unwrap();
        grid.pump();
        assert_eq!(rendered.lock().unwrap().last(), Some(&5));
    }

    #[test]
    fn test_server_mode_requires_runtime() {
        let result = Grid::builder(seed())
            .options(GridOptions::default().server("http://127.0.0.1:9/rows"))
            .build();
        assert!(matches!(
            result,
            Err(GridError::Configuration(ConfigError::NoRuntime))
        ));
    }
}
