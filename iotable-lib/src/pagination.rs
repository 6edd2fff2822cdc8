//! Pagination state, pager window and "showing x to y" infos.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Rows per page, or every row on one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum PageSize {
    /// A fixed number of rows (always >= 1).
    Rows(usize),
    /// Every row on a single page; `-1` on the wire.
    All,
}

impl PageSize {
    /// Wire marker for [`PageSize::All`].
    pub const ALL_MARKER: i64 = -1;

    /// Returns the row count, or `None` for `All`.
    pub fn rows(&self) -> Option<usize> {
        match self {
            PageSize::Rows(n) => Some(*n),
            PageSize::All => None,
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::Rows(10)
    }
}

impl TryFrom<i64> for PageSize {
    type Error = ConfigError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            Self::ALL_MARKER => Ok(PageSize::All),
            n if n >= 1 => Ok(PageSize::Rows(n as usize)),
            n => Err(ConfigError::InvalidPageSize(n)),
        }
    }
}

impl From<PageSize> for i64 {
    fn from(size: PageSize) -> Self {
        match size {
            PageSize::Rows(n) => n as i64,
            PageSize::All => PageSize::ALL_MARKER,
        }
    }
}

/// A page navigation request from the pager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTarget {
    First,
    Prev,
    Next,
    Last,
    Number(usize),
}

/// Current page, page size and totals.
///
/// `total_pages` is derived: `1` when the page size is `All`, otherwise
/// `ceil(total_rows / size)` with a floor of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    current: usize,
    size: PageSize,
    total_rows: usize,
}

impl Pagination {
    pub fn new(size: PageSize) -> Self {
        Self {
            current: 1,
            size,
            total_rows: 0,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn size(&self) -> PageSize {
        self.size
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total_rows, self.size)
    }

    /// Resets to the first page.
    pub fn reset(&mut self) {
        self.current = 1;
    }

    /// Sets the current page as reported by a remote source.
    pub fn set_current(&mut self, page: usize) {
        self.current = page.max(1);
    }

    pub fn set_total_rows(&mut self, total: usize) {
        self.total_rows = total;
    }

    /// Changes the page size and resets to page one.
    ///
    /// Returns `false` if the size is unchanged or is zero rows.
    pub fn set_size(&mut self, size: PageSize) -> bool {
        if self.size == size || size == PageSize::Rows(0) {
            return false;
        }
        self.size = size;
        self.current = 1;
        true
    }

    /// Resolves a pager target to a page number within `1..=total_pages`.
    pub fn resolve(&self, target: PageTarget) -> usize {
        let last = self.total_pages();
        let page = match target {
            PageTarget::First => 1,
            PageTarget::Prev => self.current.saturating_sub(1),
            PageTarget::Next => self.current + 1,
            PageTarget::Last => last,
            PageTarget::Number(n) => n,
        };
        page.clamp(1, last)
    }

    /// Moves to a target page. Returns `false` if the page did not change.
    pub fn navigate(&mut self, target: PageTarget) -> bool {
        let page = self.resolve(target);
        if page == self.current {
            return false;
        }
        self.current = page;
        true
    }

    /// Numbers shown in the "showing {start} to {end} of {total}" label.
    pub fn infos(&self) -> Infos {
        let total = self.total_rows;
        if total == 0 {
            return Infos {
                start: 0,
                end: 0,
                total,
            };
        }
        match self.size {
            PageSize::All => Infos {
                start: 1,
                end: total,
                total,
            },
            PageSize::Rows(n) => Infos {
                start: (self.current - 1) * n + 1,
                end: (self.current * n).min(total),
                total,
            },
        }
    }

    /// Pager items: first, prev, a window of numbered pages, next, last.
    ///
    /// The numbered window holds at most `padding * 2 + 1` pages and keeps
    /// the current page centred until it reaches either end. Empty when the
    /// page size is `All`.
    pub fn pager(&self, padding: usize) -> Vec<PagerItem> {
        if self.size == PageSize::All {
            return Vec::new();
        }
        let current = self.current;
        let total_pages = self.total_pages();
        let offset_right = total_pages.saturating_sub(current);
        let offset_left = current as isize - padding as isize;
        let start = if offset_right >= padding {
            offset_left.max(1)
        } else {
            (offset_left - padding as isize + offset_right as isize).max(1)
        };
        let start = start as usize;
        let count = (padding * 2 + 1).min(total_pages);

        let mut items = Vec::with_capacity(count + 4);
        items.push(PagerItem::new(PagerKind::First, current > 1, false));
        items.push(PagerItem::new(PagerKind::Prev, current > 1, false));
        for page in start..start + count {
            items.push(PagerItem::new(PagerKind::Page(page), true, page == current));
        }
        items.push(PagerItem::new(PagerKind::Next, total_pages > current, false));
        items.push(PagerItem::new(PagerKind::Last, total_pages > current, false));
        items
    }
}

/// `max(1, ceil(total_rows / size))`, or `1` for `All`.
pub fn total_pages(total_rows: usize, size: PageSize) -> usize {
    match size {
        PageSize::All => 1,
        PageSize::Rows(n) => total_rows.div_ceil(n.max(1)).max(1),
    }
}

/// Range label numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Infos {
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

/// What a pager button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "page")]
pub enum PagerKind {
    First,
    Prev,
    Page(usize),
    Next,
    Last,
}

impl PagerKind {
    /// The navigation this button triggers.
    pub fn target(&self) -> PageTarget {
        match self {
            PagerKind::First => PageTarget::First,
            PagerKind::Prev => PageTarget::Prev,
            PagerKind::Page(n) => PageTarget::Number(*n),
            PagerKind::Next => PageTarget::Next,
            PagerKind::Last => PageTarget::Last,
        }
    }
}

/// One pager button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PagerItem {
    pub kind: PagerKind,
    pub enabled: bool,
    pub active: bool,
}

impl PagerItem {
    fn new(kind: PagerKind, enabled: bool, active: bool) -> Self {
        Self {
            kind,
            enabled,
            active,
        }
    }
}
