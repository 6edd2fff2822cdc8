//! Grid options and non-serialisable hooks.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use url::Url;

use crate::column::{Converter, ConverterSet, Formatter, FormatterSet};
use crate::error::ConfigError;
use crate::pagination::{Infos, PageSize};
use crate::remote::{Method, RequestHandler, ResponseHandler};

/// Where rows come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Rows live in memory; the grid filters, sorts and pages them.
    #[default]
    Local,
    /// Every view change is a request to a remote endpoint.
    Server,
}

/// Where the header/footer navigation bars are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Navigation {
    None,
    Top,
    Bottom,
    #[default]
    Both,
}

impl Navigation {
    pub fn header(&self) -> bool {
        matches!(self, Navigation::Top | Navigation::Both)
    }

    pub fn footer(&self) -> bool {
        matches!(self, Navigation::Bottom | Navigation::Both)
    }
}

/// Search field debounce settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchSettings {
    /// Delay before a typed phrase is searched.
    pub delay_ms: u64,
    /// Minimum phrase length that triggers a search without Enter.
    pub characters: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            delay_ms: 250,
            characters: 1,
        }
    }
}

impl SearchSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// User-facing texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Labels {
    /// Row-count picker entry for "all rows".
    pub all: String,
    /// Range label with `{start}`, `{end}` and `{total}` placeholders.
    pub infos: String,
    pub loading: String,
    pub no_results: String,
    pub refresh: String,
    pub search: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            all: "All".into(),
            infos: "Showing {start} to {end} of {total} entries".into(),
            loading: "Loading..".into(),
            no_results: "No results found!".into(),
            refresh: "Refresh".into(),
            search: "Search".into(),
        }
    }
}

impl Labels {
    /// Fills the infos template.
    pub fn infos_text(&self, infos: &Infos) -> String {
        self.infos
            .replace("{start}", &infos.start.to_string())
            .replace("{end}", &infos.end.to_string())
            .replace("{total}", &infos.total.to_string())
    }
}

fn default_status_mapping() -> BTreeMap<i64, String> {
    [(0, "success"), (1, "info"), (2, "warning"), (3, "danger")]
        .into_iter()
        .map(|(status, class)| (status, class.to_string()))
        .collect()
}

/// Serialisable grid configuration.
///
/// Every field has a default, so an options file only needs the keys it
/// changes:
///
/// ```json
/// { "mode": "server", "url": "https://example.com/rows", "selection": true }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridOptions {
    pub navigation: Navigation,
    /// Pages shown on either side of the current page in the pager.
    pub padding: usize,
    pub column_selection: bool,
    /// Choices of the row-count picker.
    #[serde(alias = "resultCount")]
    pub row_counts: Vec<PageSize>,
    pub rows_per_page: PageSize,
    pub selection: bool,
    pub multi_select: bool,
    /// Clicking a row toggles its selection.
    pub row_select: bool,
    /// Keep the selection across refreshes.
    pub keep_selection: bool,
    pub sorting: bool,
    pub multi_sort: bool,
    pub search: SearchSettings,
    pub case_sensitive: bool,
    pub mode: Mode,
    pub url: String,
    pub method: Method,
    /// Static request extensions, merged into every server request.
    pub post: Map<String, Json>,
    pub labels: Labels,
    /// Row status code to row class.
    pub status_mapping: BTreeMap<i64, String>,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            navigation: Navigation::Both,
            padding: 2,
            column_selection: true,
            row_counts: vec![
                PageSize::Rows(10),
                PageSize::Rows(25),
                PageSize::Rows(50),
                PageSize::Rows(100),
                PageSize::All,
            ],
            rows_per_page: PageSize::Rows(10),
            selection: false,
            multi_select: false,
            row_select: false,
            keep_selection: false,
            sorting: true,
            multi_sort: false,
            search: SearchSettings::default(),
            case_sensitive: true,
            mode: Mode::Local,
            url: String::new(),
            method: Method::Post,
            post: Map::new(),
            labels: Labels::default(),
            status_mapping: default_status_mapping(),
        }
    }
}

impl GridOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads options from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Switches to server mode against `url`.
    pub fn server(mut self, url: impl Into<String>) -> Self {
        self.mode = Mode::Server;
        self.url = url.into();
        self
    }

    pub fn with_rows_per_page(mut self, size: PageSize) -> Self {
        self.rows_per_page = size;
        self
    }

    /// Enables selection, single or multi.
    pub fn with_selection(mut self, multi_select: bool) -> Self {
        self.selection = true;
        self.multi_select = multi_select;
        self
    }

    pub fn with_row_select(mut self, row_select: bool) -> Self {
        self.row_select = row_select;
        self
    }

    pub fn with_keep_selection(mut self, keep: bool) -> Self {
        self.keep_selection = keep;
        self
    }

    pub fn with_multi_sort(mut self, multi_sort: bool) -> Self {
        self.multi_sort = multi_sort;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_post(mut self, post: Map<String, Json>) -> Self {
        self.post = post;
        self
    }

    /// Checks the options for fatal misconfiguration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode == Mode::Server {
            if self.url.trim().is_empty() {
                return Err(ConfigError::MissingUrl);
            }
            Url::parse(&self.url).map_err(|e| ConfigError::invalid_url(&self.url, e.to_string()))?;
        }
        for size in std::iter::once(&self.rows_per_page).chain(&self.row_counts) {
            if *size == PageSize::Rows(0) {
                return Err(ConfigError::InvalidPageSize(0));
            }
        }
        Ok(())
    }

    /// Row class for a status code, if mapped.
    pub fn status_class(&self, status: Option<i64>) -> Option<&str> {
        status.and_then(|s| self.status_mapping.get(&s)).map(String::as_str)
    }
}

/// Code hooks that cannot live in an options file.
#[derive(Debug, Clone, Default)]
pub struct GridHooks {
    pub converters: ConverterSet,
    pub formatters: FormatterSet,
    pub request_handler: Option<RequestHandler>,
    pub response_handler: Option<ResponseHandler>,
}

impl GridHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a converter by key.
    pub fn with_converter(mut self, key: impl Into<String>, converter: impl Converter + 'static) -> Self {
        self.converters.insert(key, converter);
        self
    }

    /// Registers a formatter by key.
    pub fn with_formatter(
        mut self,
        key: impl Into<String>,
        f: impl Fn(&crate::column::Column, &crate::row::Row) -> String + Send + Sync + 'static,
    ) -> Self {
        self.formatters.insert(key, Formatter::new(f));
        self
    }

    pub fn with_request_handler(mut self, f: impl Fn(Json) -> Json + Send + Sync + 'static) -> Self {
        self.request_handler = Some(RequestHandler::new(f));
        self
    }

    pub fn with_response_handler(
        mut self,
        f: impl Fn(Json) -> Result<Json, String> + Send + Sync + 'static,
    ) -> Self {
        self.response_handler = Some(ResponseHandler::new(f));
        self
    }
}
