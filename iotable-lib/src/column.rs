//! Column definitions, converters and the column registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::error::GridError;
use crate::row::Row;
use crate::sort::{SortDirective, SortOrder};
use crate::value::Value;

// =============================================================================
// Converters
// =============================================================================

/// Maps raw cell text to a typed value and back to display text.
pub trait Converter: Send + Sync + fmt::Debug {
    /// Converts seed text into a value.
    fn from_raw(&self, raw: &str) -> Value;

    /// Converts a value into display text.
    fn to_display(&self, value: &Value) -> String;
}

/// Identity converter; the default for every column.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl Converter for StringConverter {
    fn from_raw(&self, raw: &str) -> Value {
        Value::Text(raw.to_string())
    }

    fn to_display(&self, value: &Value) -> String {
        value.to_string()
    }
}

/// Parses cell text as a number. Unparseable text becomes `Null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericConverter;

impl Converter for NumericConverter {
    fn from_raw(&self, raw: &str) -> Value {
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|n| !n.is_nan())
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }

    fn to_display(&self, value: &Value) -> String {
        value.to_string()
    }
}

/// Converters by key. `string` and `numeric` are always present; unknown
/// keys resolve to `string`.
#[derive(Debug, Clone)]
pub struct ConverterSet {
    converters: HashMap<String, Arc<dyn Converter>>,
}

impl Default for ConverterSet {
    fn default() -> Self {
        let mut converters: HashMap<String, Arc<dyn Converter>> = HashMap::new();
        converters.insert("string".into(), Arc::new(StringConverter));
        converters.insert("numeric".into(), Arc::new(NumericConverter));
        Self { converters }
    }
}

impl ConverterSet {
    /// Registers (or replaces) a converter under a key.
    pub fn insert(&mut self, key: impl Into<String>, converter: impl Converter + 'static) {
        self.converters.insert(key.into(), Arc::new(converter));
    }

    /// Resolves a converter, falling back to `string`.
    pub fn resolve(&self, key: Option<&str>) -> (String, Arc<dyn Converter>) {
        match key.and_then(|k| self.converters.get(k).map(|c| (k, c))) {
            Some((k, c)) => (k.to_string(), Arc::clone(c)),
            None => ("string".to_string(), Arc::new(StringConverter)),
        }
    }
}

// =============================================================================
// Formatters
// =============================================================================

type FormatFn = dyn Fn(&Column, &Row) -> String + Send + Sync;

/// Custom cell formatter: `(column, row) -> display text`.
///
/// Formatters only affect rendering; search always matches against the
/// converter's display text.
#[derive(Clone)]
pub struct Formatter(Arc<FormatFn>);

impl Formatter {
    pub fn new(f: impl Fn(&Column, &Row) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn format(&self, column: &Column, row: &Row) -> String {
        (self.0)(column, row)
    }
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Formatter(..)")
    }
}

/// Formatters by key.
#[derive(Debug, Clone, Default)]
pub struct FormatterSet {
    formatters: HashMap<String, Formatter>,
}

impl FormatterSet {
    pub fn insert(&mut self, key: impl Into<String>, formatter: Formatter) {
        self.formatters.insert(key.into(), formatter);
    }

    pub fn get(&self, key: &str) -> Option<Formatter> {
        self.formatters.get(key).cloned()
    }
}

// =============================================================================
// Column definitions
// =============================================================================

/// Horizontal alignment of a cell or header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Column width as given in the seed: a pixel count or a CSS length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Width {
    Pixels(f64),
    Css(String),
}

impl Width {
    /// Returns the CSS form, e.g. `"120px"`.
    pub fn to_css(&self) -> String {
        match self {
            Width::Pixels(px) => format!("{}px", Value::Number(*px)),
            Width::Css(s) => s.clone(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Column metadata as consumed once from the seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    /// Unique column id; also the row key.
    pub id: String,
    /// Header label. Defaults to the id.
    #[serde(default)]
    pub text: Option<String>,
    /// Converter key (`string`, `numeric`, or a custom one).
    #[serde(default, alias = "type")]
    pub converter: Option<String>,
    /// Marks the unique row key. Only the first flagged column wins.
    #[serde(default)]
    pub identifier: bool,
    #[serde(default)]
    pub align: Align,
    #[serde(default)]
    pub header_align: Align,
    #[serde(default)]
    pub css_class: String,
    #[serde(default)]
    pub header_css_class: String,
    /// Formatter key.
    #[serde(default)]
    pub formatter: Option<String>,
    /// Initial sort order.
    #[serde(default, alias = "initialOrder")]
    pub order: Option<SortOrder>,
    #[serde(default = "default_true")]
    pub searchable: bool,
    #[serde(default = "default_true")]
    pub sortable: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub visible_in_selection: bool,
    #[serde(default)]
    pub width: Option<Width>,
}

impl ColumnDef {
    /// Creates a column definition with default flags.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: None,
            converter: None,
            identifier: false,
            align: Align::Left,
            header_align: Align::Left,
            css_class: String::new(),
            header_css_class: String::new(),
            formatter: None,
            order: None,
            searchable: true,
            sortable: true,
            visible: true,
            visible_in_selection: true,
            width: None,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn converter(mut self, key: impl Into<String>) -> Self {
        self.converter = Some(key.into());
        self
    }

    pub fn identifier(mut self) -> Self {
        self.identifier = true;
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn formatter(mut self, key: impl Into<String>) -> Self {
        self.formatter = Some(key.into());
        self
    }

    pub fn width(mut self, width: Width) -> Self {
        self.width = Some(width);
        self
    }
}

/// A registered grid column.
#[derive(Clone)]
pub struct Column {
    pub id: String,
    pub text: String,
    pub converter_key: String,
    pub converter: Arc<dyn Converter>,
    pub identifier: bool,
    pub align: Align,
    pub header_align: Align,
    pub css_class: String,
    pub header_css_class: String,
    pub formatter: Option<Formatter>,
    pub order: Option<SortOrder>,
    pub searchable: bool,
    pub sortable: bool,
    pub visible: bool,
    pub visible_in_selection: bool,
    /// Width in CSS form.
    pub width: Option<String>,
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("id", &self.id)
            .field("converter", &self.converter_key)
            .field("identifier", &self.identifier)
            .field("order", &self.order)
            .field("searchable", &self.searchable)
            .field("sortable", &self.sortable)
            .field("visible", &self.visible)
            .finish_non_exhaustive()
    }
}

impl Column {
    /// Converter display text for a value.
    pub fn display(&self, value: &Value) -> String {
        self.converter.to_display(value)
    }

    /// Rendered text for this column's cell in a row.
    pub fn cell_text(&self, row: &Row) -> String {
        match &self.formatter {
            Some(formatter) => formatter.format(self, row),
            None => self.display(row.get(&self.id)),
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Column definitions in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    columns: Vec<Column>,
    identifier: Option<usize>,
}

impl ColumnRegistry {
    /// Parses column metadata once, in declaration order.
    ///
    /// The first column flagged as identifier wins; later flags are cleared.
    /// Without multi-sort only the first column with an initial order keeps
    /// it. Returns the registry and the initial sort directive.
    pub fn register(
        defs: Vec<ColumnDef>,
        converters: &ConverterSet,
        formatters: &FormatterSet,
        multi_sort: bool,
    ) -> Result<(Self, SortDirective), GridError> {
        let mut registry = Self::default();
        let mut directive = SortDirective::new();

        for def in defs {
            if def.id.is_empty() {
                return Err(GridError::Seed("column id must not be empty".into()));
            }
            if registry.columns.iter().any(|c| c.id == def.id) {
                return Err(GridError::Seed(format!("duplicate column id '{}'", def.id)));
            }

            let identifier = def.identifier && registry.identifier.is_none();
            let order = if multi_sort || directive.is_empty() {
                def.order
            } else {
                None
            };
            let (converter_key, converter) = converters.resolve(def.converter.as_deref());
            let formatter = def.formatter.as_deref().and_then(|k| formatters.get(k));

            if let Some(order) = order {
                directive.insert(def.id.clone(), order);
            }
            if identifier {
                registry.identifier = Some(registry.columns.len());
            }

            registry.columns.push(Column {
                text: def.text.unwrap_or_else(|| def.id.clone()),
                id: def.id,
                converter_key,
                converter,
                identifier,
                align: def.align,
                header_align: def.header_align,
                css_class: def.css_class,
                header_css_class: def.header_css_class,
                formatter,
                order,
                searchable: def.searchable,
                sortable: def.sortable,
                visible: def.visible,
                visible_in_selection: def.visible_in_selection,
                width: def.width.map(|w| w.to_css()),
            });
        }

        log::debug!(
            "Registered {} columns (identifier: {:?})",
            registry.columns.len(),
            registry.identifier_id()
        );
        Ok((registry, directive))
    }

    /// Looks up a column by id.
    pub fn lookup(&self, id: &str) -> Result<&Column, GridError> {
        self.columns
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| GridError::column_not_found(id))
    }

    /// All columns in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Visible columns in declaration order.
    pub fn visible_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.visible)
    }

    pub fn visible_count(&self) -> usize {
        self.visible_columns().count()
    }

    /// The identifier column, if any.
    pub fn identifier(&self) -> Option<&Column> {
        self.identifier.map(|i| &self.columns[i])
    }

    pub fn identifier_id(&self) -> Option<&str> {
        self.identifier().map(|c| c.id.as_str())
    }

    /// Toggles a column's visibility.
    ///
    /// Returns `Ok(true)` if the visibility changed. Hiding the last visible
    /// column is refused and returns `Ok(false)`.
    pub fn set_visible(&mut self, id: &str, visible: bool) -> Result<bool, GridError> {
        let visible_count = self.visible_count();
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| GridError::column_not_found(id))?;

        if column.visible == visible {
            return Ok(false);
        }
        if !visible && visible_count <= 1 {
            log::debug!("Refusing to hide last visible column '{id}'");
            return Ok(false);
        }
        column.visible = visible;
        Ok(true)
    }

    /// Converts a raw text record (seed markup cells) into a row.
    pub fn row_from_raw<'a>(&self, cells: impl IntoIterator<Item = (&'a str, &'a str)>) -> Row {
        let mut row = Row::new();
        for (id, raw) in cells {
            match self.columns.iter().find(|c| c.id == id) {
                Some(column) => row.insert(id, column.converter.from_raw(raw)),
                None => row.insert(id, Value::from(raw)),
            }
        }
        row
    }
}
