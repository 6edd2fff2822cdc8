//! Search field input debouncing.

use std::time::{Duration, Instant};

use log::{debug, trace};

/// Turns raw search-field keystrokes into debounced search phrases.
///
/// A search is scheduled `delay` after input when the text changed (or Enter
/// was pressed on a non-empty field) and the text is empty, Enter was
/// pressed, or it is at least `characters` long. Scheduling replaces any
/// pending search. Input that is too short leaves a pending search alone.
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    delay: Duration,
    characters: usize,
    /// Last text seen from the field
    current: String,
    /// Phrase waiting for its deadline
    pending: Option<(String, Instant)>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration, characters: usize) -> Self {
        Self {
            delay,
            characters,
            current: String::new(),
            pending: None,
        }
    }

    /// Records field input at `now`. Returns `true` if a search was scheduled.
    pub fn input(&mut self, text: &str, enter: bool, now: Instant) -> bool {
        let changed = self.current != text;
        if !changed && !(enter && !text.is_empty()) {
            trace!("Search input unchanged, ignoring");
            return false;
        }
        self.current = text.to_string();

        let long_enough = text.chars().count() >= self.characters;
        if !(enter || text.is_empty() || long_enough) {
            trace!("Search input below {} characters", self.characters);
            return false;
        }

        let deadline = now + self.delay;
        debug!("Search '{text}' scheduled in {:?}", self.delay);
        self.pending = Some((text.to_string(), deadline));
        true
    }

    /// Returns the pending phrase if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now => self.pending.take().map(|(phrase, _)| phrase),
            _ => None,
        }
    }

    /// When the pending search is due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Drops any pending search.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
