//! Lifecycle and change notifications.

use std::sync::{Arc, Mutex};

use crate::row::Row;

/// How a refresh ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Success,
    /// The remote fetch failed; see `Grid::last_error`.
    Failed,
}

/// A notification emitted by the grid.
///
/// Row-carrying variants hold only the rows that actually changed.
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    Initialize,
    Initialized,
    /// A refresh started.
    Load,
    /// A refresh ended, successfully or with a handled failure.
    Loaded(LoadStatus),
    Appended(Vec<Row>),
    Cleared(Vec<Row>),
    Removed(Vec<Row>),
    Selected(Vec<Row>),
    Deselected(Vec<Row>),
    Click { row: Row },
}

impl GridEvent {
    /// Short event name, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            GridEvent::Initialize => "initialize",
            GridEvent::Initialized => "initialized",
            GridEvent::Load => "load",
            GridEvent::Loaded(_) => "loaded",
            GridEvent::Appended(_) => "appended",
            GridEvent::Cleared(_) => "cleared",
            GridEvent::Removed(_) => "removed",
            GridEvent::Selected(_) => "selected",
            GridEvent::Deselected(_) => "deselected",
            GridEvent::Click { .. } => "click",
        }
    }
}

/// Event callback.
pub type Listener = Box<dyn FnMut(&GridEvent) + Send>;

/// Collects events into a shared buffer.
///
/// ```
/// use iotable_lib::event::{EventLog, GridEvent};
///
/// let log = EventLog::new();
/// let mut listener = log.listener();
/// listener(&GridEvent::Load);
/// assert_eq!(log.names(), vec!["load"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<GridEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener that appends to this log.
    pub fn listener(&self) -> Listener {
        let events = Arc::clone(&self.events);
        Box::new(move |event| {
            let mut guard = events.lock().unwrap_or_else(|e| e.into_inner());
            guard.push(event.clone());
        })
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&self) -> Vec<GridEvent> {
        let mut guard = self.events.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *guard)
    }

    /// Names of the recorded events, oldest first.
    pub fn names(&self) -> Vec<&'static str> {
        let guard = self.events.lock().unwrap_or_else(|e| e.into_inner());
        guard.iter().map(GridEvent::name).collect()
    }
}
