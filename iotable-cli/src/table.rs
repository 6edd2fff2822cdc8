//! Plain-text rendering of grid snapshots.

use std::sync::{Arc, Mutex};

use iotable_lib::column::Align;
use iotable_lib::pagination::{PagerItem, PagerKind};
use iotable_lib::render::{Body, GridView, HeaderCell, RenderSink};
use iotable_lib::SortOrder;
use unicode_width::UnicodeWidthStr;

const SEPARATOR: &str = " | ";

/// Render sink that keeps the latest frame as text.
#[derive(Debug, Clone, Default)]
pub struct TextSink {
    frame: Arc<Mutex<String>>,
    frames: Arc<Mutex<usize>>,
}

impl TextSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently rendered frame.
    pub fn latest(&self) -> String {
        self.frame.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn frame_count(&self) -> usize {
        *self.frames.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RenderSink for TextSink {
    fn render(&mut self, view: &GridView) {
        *self.frame.lock().unwrap_or_else(|e| e.into_inner()) = render_text(view);
        *self.frames.lock().unwrap_or_else(|e| e.into_inner()) += 1;
    }
}

/// Renders a snapshot as an aligned text table with controls around it.
pub fn render_text(view: &GridView) -> String {
    let mut out = String::new();

    if view.navigation.header() {
        out.push_str(&controls(view));
        out.push('\n');
    }

    let headers: Vec<String> = view.header.iter().map(header_text).collect();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in view.body.rows() {
        for (width, cell) in widths.iter_mut().zip(&row.cells) {
            *width = (*width).max(cell.text.width());
        }
    }

    let marker = if view.selectable { 4 } else { 0 };
    let select_all = match view.select_all {
        Some(all) if all.checked => "[x] ",
        Some(_) => "[ ] ",
        None if view.selectable => "    ",
        None => "",
    };

    let header_line: Vec<String> = headers
        .iter()
        .zip(&view.header)
        .zip(&widths)
        .map(|((text, cell), width)| pad(text, *width, cell.align))
        .collect();
    out.push_str(select_all);
    out.push_str(header_line.join(SEPARATOR).trim_end());
    out.push('\n');

    let rule_width = widths.iter().sum::<usize>() + SEPARATOR.len() * widths.len().saturating_sub(1) + marker;
    out.push_str(&"-".repeat(rule_width));
    out.push('\n');

    match &view.body {
        Body::Loading(label) | Body::NoResults(label) => {
            out.push_str(label);
            out.push('\n');
        }
        Body::Rows(rows) => {
            for row in rows {
                if view.selectable {
                    out.push_str(if row.selected { "[x] " } else { "[ ] " });
                }
                let cells: Vec<String> = row
                    .cells
                    .iter()
                    .zip(&widths)
                    .map(|(cell, width)| pad(&cell.text, *width, cell.align))
                    .collect();
                out.push_str(cells.join(SEPARATOR).trim_end());
                if let Some(status) = &row.status_class {
                    out.push_str(&format!("  ({status})"));
                }
                out.push('\n');
            }
        }
    }

    if view.navigation.footer() {
        out.push_str(&"-".repeat(rule_width));
        out.push('\n');
        let pager = pager_text(&view.pager);
        if !pager.is_empty() {
            out.push_str(&pager);
            out.push_str("   ");
        }
        out.push_str(&view.infos_text);
        out.push('\n');
    }

    out
}

fn controls(view: &GridView) -> String {
    let mut parts = Vec::new();
    let phrase = if view.search.phrase.is_empty() {
        format!("<{}>", view.search.placeholder)
    } else {
        view.search.phrase.clone()
    };
    parts.push(phrase);

    let counts: Vec<String> = view
        .row_counts
        .iter()
        .map(|option| {
            if option.active {
                format!("[{}]", option.label)
            } else {
                option.label.clone()
            }
        })
        .collect();
    if !counts.is_empty() {
        parts.push(counts.join(" "));
    }

    let hidden: Vec<&str> = view
        .column_picker
        .iter()
        .filter(|item| !item.visible)
        .map(|item| item.text.as_str())
        .collect();
    if !hidden.is_empty() {
        parts.push(format!("hidden: {}", hidden.join(", ")));
    }

    if let Some(refresh) = &view.refresh {
        parts.push(format!("({refresh})"));
    }
    if view.busy {
        parts.push("...".to_string());
    }
    parts.join("  ")
}

fn header_text(cell: &HeaderCell) -> String {
    match cell.sort {
        Some(SortOrder::Asc) => format!("{} ^", cell.text),
        Some(SortOrder::Desc) => format!("{} v", cell.text),
        None => cell.text.clone(),
    }
}

fn pager_text(items: &[PagerItem]) -> String {
    items
        .iter()
        .map(|item| {
            let label = match item.kind {
                PagerKind::First => "<<".to_string(),
                PagerKind::Prev => "<".to_string(),
                PagerKind::Page(n) => n.to_string(),
                PagerKind::Next => ">".to_string(),
                PagerKind::Last => ">>".to_string(),
            };
            if item.active {
                format!("[{label}]")
            } else if !item.enabled {
                format!("({label})")
            } else {
                label
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pads `text` to `width` display columns.
fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = width.saturating_sub(text.width());
    match align {
        Align::Left => format!("{text}{}", " ".repeat(fill)),
        Align::Right => format!("{}{text}", " ".repeat(fill)),
        Align::Center => {
            let left = fill / 2;
            format!("{}{text}{}", " ".repeat(left), " ".repeat(fill - left))
        }
    }
}
