use std::time::{Duration, Instant};
use tracing::trace;

/// Search commit delay used when nothing else is configured
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;

/// A simple debouncer that tracks when an action should be triggered
/// after a period of inactivity.
///
/// Every time-dependent method has an `_at` twin taking the current instant,
/// so hosts with their own clock (and tests) never need to sleep.
#[derive(Debug, Clone)]
pub struct Debouncer {
    /// The duration to wait after the last event before triggering
    delay: Duration,
    /// When the last event occurred
    last_event: Option<Instant>,
    /// Whether we have a pending trigger
    pending: bool,
}

impl Debouncer {
    /// Create a new debouncer with the specified delay in milliseconds
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            last_event: None,
            pending: false,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Register that an event occurred
    pub fn trigger(&mut self) {
        self.trigger_at(Instant::now());
    }

    pub fn trigger_at(&mut self, now: Instant) {
        self.last_event = Some(now);
        self.pending = true;
    }

    /// Check if enough time has passed to execute the debounced action.
    /// Returns true once per quiet period.
    pub fn should_execute(&mut self) -> bool {
        self.should_execute_at(Instant::now())
    }

    pub fn should_execute_at(&mut self, now: Instant) -> bool {
        if !self.pending {
            return false;
        }

        if let Some(last) = self.last_event {
            if now.saturating_duration_since(last) >= self.delay {
                self.pending = false;
                self.last_event = None;
                return true;
            }
        }
        false
    }

    /// Get the time remaining before the action will trigger.
    /// Returns None if no action is pending
    pub fn time_remaining(&self) -> Option<Duration> {
        self.time_remaining_at(Instant::now())
    }

    pub fn time_remaining_at(&self, now: Instant) -> Option<Duration> {
        if !self.pending {
            return None;
        }

        self.last_event
            .map(|last| self.delay.saturating_sub(now.saturating_duration_since(last)))
    }

    /// Reset the debouncer, canceling any pending action
    pub fn reset(&mut self) {
        self.last_event = None;
        self.pending = false;
    }

    /// Check if there's a pending action
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// What a keystroke did to the search input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchInput {
    /// A commit is scheduled
    Scheduled,
    /// The input is shorter than the minimum length; nothing is scheduled
    TooShort,
}

/// Debounced search box: holds the text being typed and hands out the term
/// to commit once typing pauses
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    debouncer: Debouncer,
    input: String,
    min_length: usize,
}

impl SearchDebouncer {
    pub fn new(delay_ms: u64, min_length: usize) -> Self {
        Self {
            debouncer: Debouncer::new(delay_ms),
            input: String::new(),
            min_length,
        }
    }

    /// Current text of the search box, committed or not
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replace the text without scheduling anything
    pub fn set_input(&mut self, value: impl Into<String>) {
        self.input = value.into();
    }

    /// Record a keystroke at `now`. Clearing the box always schedules.
    pub fn on_input_at(&mut self, value: impl Into<String>, now: Instant) -> SearchInput {
        self.input = value.into();
        let length = self.input.trim().chars().count();
        if length > 0 && length <= self.min_length {
            trace!(target: "debounce", "search input below minimum length");
            self.debouncer.reset();
            return SearchInput::TooShort;
        }
        self.debouncer.trigger_at(now);
        SearchInput::Scheduled
    }

    /// The trimmed term to commit when the delay has elapsed since the last keystroke
    pub fn poll_at(&mut self, now: Instant) -> Option<String> {
        if self.debouncer.should_execute_at(now) {
            let term = self.input.trim().to_string();
            trace!(target: "debounce", "search debounce fired: {:?}", term);
            Some(term)
        } else {
            None
        }
    }

    /// Commit immediately, cancelling any scheduled commit
    pub fn submit(&mut self) -> String {
        self.debouncer.reset();
        self.input.trim().to_string()
    }

    pub fn cancel(&mut self) {
        self.debouncer.reset();
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn time_remaining_at(&self, now: Instant) -> Option<Duration> {
        self.debouncer.time_remaining_at(now)
    }
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEBOUNCE_MS, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_debouncer_fires_once_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(300);
        debouncer.trigger_at(start);
        assert!(!debouncer.should_execute_at(start + ms(299)));
        assert_eq!(debouncer.time_remaining_at(start + ms(100)), Some(ms(200)));
        assert!(debouncer.should_execute_at(start + ms(300)));
        assert!(!debouncer.should_execute_at(start + ms(900)));
        assert_eq!(debouncer.time_remaining_at(start), None);
    }

    #[test]
    fn test_retrigger_restarts_delay() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(300);
        debouncer.trigger_at(start);
        debouncer.trigger_at(start + ms(200));
        assert!(!debouncer.should_execute_at(start + ms(400)));
        assert!(debouncer.should_execute_at(start + ms(500)));
    }

    #[test]
    fn test_search_keystrokes_collapse_to_last_value() {
        let start = Instant::now();
        let mut search = SearchDebouncer::default();
        for (i, text) in ["ab", "abc", "abcd "].iter().enumerate() {
            search.on_input_at(*text, start + ms(i as u64 * 100));
            assert_eq!(search.poll_at(start + ms(i as u64 * 100 + 50)), None);
        }
        assert_eq!(search.poll_at(start + ms(500)), Some("abcd".to_string()));
        assert_eq!(search.poll_at(start + ms(900)), None);
    }

    #[test]
    fn test_submit_cancels_pending_commit() {
        let start = Instant::now();
        let mut search = SearchDebouncer::default();
        search.on_input_at("ram", start);
        assert_eq!(search.submit(), "ram");
        assert!(!search.is_pending());
        assert_eq!(search.poll_at(start + ms(1000)), None);
    }

    #[test]
    fn test_min_length_but_empty_always_schedules() {
        let start = Instant::now();
        let mut search = SearchDebouncer::new(300, 2);
        assert_eq!(search.on_input_at("ab", start), SearchInput::TooShort);
        assert_eq!(search.input(), "ab");
        assert_eq!(search.on_input_at("abc", start), SearchInput::Scheduled);
        assert_eq!(search.on_input_at("", start), SearchInput::Scheduled);
        assert_eq!(search.poll_at(start + ms(300)), Some(String::new()));
    }
}
