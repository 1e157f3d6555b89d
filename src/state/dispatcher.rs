//! Event dispatch to host subscribers

use crate::data::pagination::PageRequest;
use crate::state::events::{DataSnapshot, TableEvent};
use crate::state::staging::FilterSnapshot;
use crate::state::{SortSpec, TableState};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Trait for host components that react to table events
pub trait TableSubscriber<T> {
    /// Handle a table event
    fn on_table_event(&mut self, event: &TableEvent<T>);

    /// Get subscriber name for debugging
    fn name(&self) -> &str;
}

type Callback<A> = Option<Box<dyn FnMut(&A)>>;

/// One optional closure per event kind
pub struct TableCallbacks<T> {
    pub on_selection_change: Callback<Vec<T>>,
    pub on_sort_change: Callback<Option<SortSpec>>,
    pub on_filter_change: Callback<FilterSnapshot>,
    pub on_pagination_change: Callback<PageRequest>,
    pub on_data_change: Callback<DataSnapshot<T>>,
    pub on_state_change: Callback<TableState<T>>,
}

impl<T> Default for TableCallbacks<T> {
    fn default() -> Self {
        Self {
            on_selection_change: None,
            on_sort_change: None,
            on_filter_change: None,
            on_pagination_change: None,
            on_data_change: None,
            on_state_change: None,
        }
    }
}

impl<T> TableCallbacks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_selection_change(mut self, f: impl FnMut(&Vec<T>) + 'static) -> Self {
        self.on_selection_change = Some(Box::new(f));
        self
    }

    pub fn on_sort_change(mut self, f: impl FnMut(&Option<SortSpec>) + 'static) -> Self {
        self.on_sort_change = Some(Box::new(f));
        self
    }

    pub fn on_filter_change(mut self, f: impl FnMut(&FilterSnapshot) + 'static) -> Self {
        self.on_filter_change = Some(Box::new(f));
        self
    }

    pub fn on_pagination_change(mut self, f: impl FnMut(&PageRequest) + 'static) -> Self {
        self.on_pagination_change = Some(Box::new(f));
        self
    }

    pub fn on_data_change(mut self, f: impl FnMut(&DataSnapshot<T>) + 'static) -> Self {
        self.on_data_change = Some(Box::new(f));
        self
    }

    pub fn on_state_change(mut self, f: impl FnMut(&TableState<T>) + 'static) -> Self {
        self.on_state_change = Some(Box::new(f));
        self
    }
}

impl<T> TableSubscriber<T> for TableCallbacks<T> {
    fn on_table_event(&mut self, event: &TableEvent<T>) {
        match event {
            TableEvent::SelectionChanged(rows) => {
                if let Some(f) = self.on_selection_change.as_mut() {
                    f(rows);
                }
            }
            TableEvent::SortChanged(sort) => {
                if let Some(f) = self.on_sort_change.as_mut() {
                    f(sort);
                }
            }
            TableEvent::FilterChanged(snapshot) => {
                if let Some(f) = self.on_filter_change.as_mut() {
                    f(snapshot);
                }
            }
            TableEvent::PaginationChanged(request) => {
                if let Some(f) = self.on_pagination_change.as_mut() {
                    f(request);
                }
            }
            TableEvent::DataChanged(data) => {
                if let Some(f) = self.on_data_change.as_mut() {
                    f(data);
                }
            }
            TableEvent::StateChanged(state) => {
                if let Some(f) = self.on_state_change.as_mut() {
                    f(state.as_ref());
                }
            }
        }
    }

    fn name(&self) -> &str {
        "TableCallbacks"
    }
}

/// Hands events to every subscriber and remembers recent event kinds
pub struct EventDispatcher<T> {
    subscribers: Vec<Box<dyn TableSubscriber<T>>>,

    /// Event kinds for debugging, oldest first
    event_history: VecDeque<&'static str>,

    max_history: usize,
}

impl<T> Default for EventDispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventDispatcher<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            event_history: VecDeque::new(),
            max_history: 100,
        }
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn TableSubscriber<T>>) {
        info!(target: "engine", "Adding table subscriber: {}", subscriber.name());
        self.subscribers.push(subscriber);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn dispatch(&mut self, event: &TableEvent<T>) {
        debug!(target: "engine", "Dispatching {} event", event.name());

        self.event_history.push_back(event.name());
        if self.event_history.len() > self.max_history {
            self.event_history.pop_front();
        }

        for subscriber in &mut self.subscribers {
            subscriber.on_table_event(event);
        }
    }

    pub fn event_history(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.event_history.iter().copied()
    }
}
