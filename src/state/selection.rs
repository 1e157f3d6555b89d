use std::fmt;
use tracing::{debug, info, warn};

/// Records picked by the user, kept independently of filter, sort and page
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<T> {
    rows: Vec<T>,
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<T: Clone + PartialEq> Selection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_selected(&self, record: &T) -> bool {
        self.rows.contains(record)
    }

    /// Flip one record. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, record: &T) -> bool {
        if let Some(pos) = self.rows.iter().position(|r| r == record) {
            self.rows.remove(pos);
            false
        } else {
            self.rows.push(record.clone());
            true
        }
    }

    /// Header checkbox: select exactly `page`, or nothing
    pub fn set_all(&mut self, page: &[T], checked: bool) {
        if checked {
            self.rows = page.to_vec();
        } else {
            self.rows.clear();
        }
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Every record of a non-empty page is selected
    pub fn is_all_selected(&self, page: &[T]) -> bool {
        !page.is_empty() && page.iter().all(|r| self.is_selected(r))
    }

    /// Some but not all records of the page are selected
    pub fn is_partially_selected(&self, page: &[T]) -> bool {
        page.iter().any(|r| self.is_selected(r)) && !self.is_all_selected(page)
    }

    /// Drop selected records not present in `records`. Returns how many went.
    pub fn prune(&mut self, records: &[T]) -> usize {
        let before = self.rows.len();
        self.rows.retain(|r| records.contains(r));
        before - self.rows.len()
    }
}

/// Handed to a bulk action while it runs
#[derive(Debug, Default)]
pub struct BulkActionContext {
    clear_selection: bool,
}

impl BulkActionContext {
    /// Ask for the selection to be cleared once the action returns
    pub fn clear_selection(&mut self) {
        self.clear_selection = true;
    }

    pub fn wants_clear_selection(&self) -> bool {
        self.clear_selection
    }
}

type BulkHandler<T> = Box<dyn FnMut(&[T], &mut BulkActionContext)>;

/// An action run against every selected record at once
pub struct BulkAction<T> {
    pub key: String,
    pub label: String,
    pub confirm_message: Option<String>,
    pub disabled: bool,
    handler: BulkHandler<T>,
}

impl<T> BulkAction<T> {
    pub fn new<F>(key: impl Into<String>, label: impl Into<String>, handler: F) -> Self
    where
        F: FnMut(&[T], &mut BulkActionContext) + 'static,
    {
        Self {
            key: key.into(),
            label: label.into(),
            confirm_message: None,
            disabled: false,
            handler: Box::new(handler),
        }
    }

    /// Require confirmation before running
    pub fn with_confirmation(mut self, message: impl Into<String>) -> Self {
        self.confirm_message = Some(message.into());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    fn run(&mut self, selected: &[T]) -> bool {
        let mut context = BulkActionContext::default();
        (self.handler)(selected, &mut context);
        context.wants_clear_selection()
    }
}

impl<T> fmt::Debug for BulkAction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkAction")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("confirm_message", &self.confirm_message)
            .field("disabled", &self.disabled)
            .finish()
    }
}

/// What happened when a bulk action was requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOutcome {
    /// The action ran; `clear_selection` tells whether it asked for the selection to go
    Ran { clear_selection: bool },
    /// Parked until confirmed or cancelled
    AwaitingConfirmation { message: String },
    Disabled,
    NothingSelected,
    NothingPending,
    UnknownAction,
}

/// Registered bulk actions plus the one waiting for confirmation, if any
pub struct BulkActions<T> {
    actions: Vec<BulkAction<T>>,
    awaiting: Option<String>,
}

impl<T> Default for BulkActions<T> {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
            awaiting: None,
        }
    }
}

impl<T> fmt::Debug for BulkActions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkActions")
            .field("actions", &self.actions)
            .field("awaiting", &self.awaiting)
            .finish()
    }
}

impl<T> BulkActions<T> {
    /// Register an action, replacing one with the same key
    pub fn register(&mut self, action: BulkAction<T>) {
        self.actions.retain(|a| a.key != action.key);
        self.actions.push(action);
    }

    pub fn actions(&self) -> &[BulkAction<T>] {
        &self.actions
    }

    /// Key and message of the action waiting for confirmation
    pub fn awaiting_confirmation(&self) -> Option<(&str, &str)> {
        let key = self.awaiting.as_deref()?;
        let action = self.actions.iter().find(|a| a.key == key)?;
        Some((key, action.confirm_message.as_deref().unwrap_or_default()))
    }

    /// Run `key` now, or park it when it needs confirmation
    pub fn request(&mut self, key: &str, selected: &[T]) -> BulkOutcome {
        if selected.is_empty() {
            return BulkOutcome::NothingSelected;
        }
        let Some(action) = self.actions.iter_mut().find(|a| a.key == key) else {
            warn!(target: "engine", "Unknown bulk action: {}", key);
            return BulkOutcome::UnknownAction;
        };
        if action.disabled {
            debug!(target: "engine", "Bulk action {} is disabled", key);
            return BulkOutcome::Disabled;
        }

        if let Some(message) = action.confirm_message.clone() {
            debug!(target: "engine", "Bulk action {} awaiting confirmation", key);
            self.awaiting = Some(key.to_string());
            return BulkOutcome::AwaitingConfirmation { message };
        }

        info!(target: "engine", "Running bulk action {} on {} records", key, selected.len());
        BulkOutcome::Ran {
            clear_selection: action.run(selected),
        }
    }

    /// Run the parked action
    pub fn confirm(&mut self, selected: &[T]) -> BulkOutcome {
        let Some(key) = self.awaiting.take() else {
            return BulkOutcome::NothingPending;
        };
        let Some(action) = self.actions.iter_mut().find(|a| a.key == key) else {
            return BulkOutcome::UnknownAction;
        };
        if action.disabled {
            return BulkOutcome::Disabled;
        }
        info!(target: "engine", "Running confirmed bulk action {} on {} records", key, selected.len());
        BulkOutcome::Ran {
            clear_selection: action.run(selected),
        }
    }

    /// Drop the parked action without running it
    pub fn cancel(&mut self) -> bool {
        self.awaiting.take().is_some()
    }
}
