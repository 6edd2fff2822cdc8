//! Data grid state and rendering engine
//!
//! Owns the column and row state of one interactive table, computes its
//! filtered, sorted and paged view (locally or through a remote source), and
//! hands read-only render snapshots to a render sink.

pub mod column;
pub mod command;
pub mod error;
pub mod event;
pub mod options;
pub mod pagination;
pub mod registry;
pub mod remote;
pub mod render;
pub mod row;
pub mod search;
pub mod selection;
pub mod sort;
pub mod view;

mod grid;
mod value;

pub use column::{Align, ColumnDef, Converter};
pub use command::Command;
pub use error::GridError;
pub use event::GridEvent;
pub use grid::*;
pub use options::{GridHooks, GridOptions, Mode};
pub use pagination::{PageSize, PageTarget};
pub use registry::{GridHandle, GridRegistry};
pub use row::Row;
pub use sort::{SortDirective, SortOrder};
pub use value::Value;
