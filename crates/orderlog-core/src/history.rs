//! Bounded undo/redo history for a board session.
//!
//! [`History`] is the only owner of the two stacks. Committing an action
//! applies it, pushes it onto the undo stack (evicting the oldest entry when
//! over capacity) and discards the redo stack. Undo and redo move a single
//! action between the stacks without modifying it.
//!
//! The history is per-session state: nothing here is persisted, and the
//! host is expected to save its collection after each successful call.
//! Listeners registered with [`History::subscribe`] fire once after every
//! call that changed the stacks; they carry no payload, consumers re-query
//! [`History::can_undo`] and friends.

use crate::action::{Action, Outcome};
use crate::board::{CollectionError, ItemCollection};
use crate::config::HistoryConfig;
use crate::error::ErrorCode;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, trace, warn};

/// Undo depth used when no configuration is given.
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// Errors from building or applying actions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    /// The collection failed; the stacks were left as they were.
    #[error(transparent)]
    Collection(#[from] CollectionError),

    /// An action constructor found nothing to act on.
    #[error("nothing to record: {0}")]
    NothingToRecord(String),
}

impl HistoryError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Collection(err) => err.code(),
            Self::NothingToRecord(_) => ErrorCode::NothingToRecord,
        }
    }
}

/// What a successful execute/undo/redo did, for the host's toast line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub description: String,
    pub outcome: Outcome,
}

/// Handle returned by [`History::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut()>;

pub struct History {
    /// Most recent at the back.
    undo_stack: VecDeque<Action>,
    /// Most recent at the back.
    redo_stack: Vec<Action>,
    capacity: usize,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("undo_stack", &self.undo_stack.len())
            .field("redo_stack", &self.redo_stack.len())
            .field("capacity", &self.capacity)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl History {
    /// Create an empty history holding at most `capacity` undo entries.
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::with_capacity(capacity.clamp(1, DEFAULT_MAX_HISTORY)),
            redo_stack: Vec::new(),
            capacity: capacity.max(1),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    #[must_use]
    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(config.max_history)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Apply `action` to `collection` and commit it.
    ///
    /// On success the action is the newest undo entry and the redo stack is
    /// empty.
    ///
    /// # Errors
    ///
    /// [`HistoryError::Collection`] if the collection fails; the action is
    /// dropped and neither stack changes.
    pub fn execute<C>(&mut self, action: Action, collection: &mut C) -> Result<Step, HistoryError>
    where
        C: ItemCollection + ?Sized,
    {
        let outcome = action.execute(collection).map_err(|err| {
            warn!(action = action.kind().name(), error = %err, "execute failed");
            err
        })?;
        debug!(
            action = action.kind().name(),
            description = action.description(),
            applied = outcome.applied,
            skipped = outcome.skipped.len(),
            "committed action"
        );
        let step = Step {
            description: action.description().to_string(),
            outcome,
        };
        self.push_undo(action);
        if !self.redo_stack.is_empty() {
            trace!(discarded = self.redo_stack.len(), "clearing redo stack");
            self.redo_stack.clear();
        }
        self.notify();
        Ok(step)
    }

    /// Reverse the most recent action. `Ok(None)` when there is nothing to
    /// undo.
    ///
    /// # Errors
    ///
    /// [`HistoryError::Collection`] if the collection fails; the action
    /// stays on the undo stack.
    pub fn undo<C>(&mut self, collection: &mut C) -> Result<Option<Step>, HistoryError>
    where
        C: ItemCollection + ?Sized,
    {
        let Some(action) = self.undo_stack.pop_back() else {
            trace!("undo requested with empty undo stack");
            return Ok(None);
        };
        match action.undo(collection) {
            Ok(outcome) => {
                debug!(
                    action = action.kind().name(),
                    description = action.description(),
                    applied = outcome.applied,
                    skipped = outcome.skipped.len(),
                    "undid action"
                );
                let step = Step {
                    description: action.description().to_string(),
                    outcome,
                };
                self.redo_stack.push(action);
                self.notify();
                Ok(Some(step))
            }
            Err(err) => {
                warn!(action = action.kind().name(), error = %err, "undo failed");
                self.undo_stack.push_back(action);
                Err(err.into())
            }
        }
    }

    /// Replay the most recently undone action. `Ok(None)` when there is
    /// nothing to redo.
    ///
    /// The replayed action goes back through the same capacity check as a
    /// fresh commit.
    ///
    /// # Errors
    ///
    /// [`HistoryError::Collection`] if the collection fails; the action
    /// stays on the redo stack.
    pub fn redo<C>(&mut self, collection: &mut C) -> Result<Option<Step>, HistoryError>
    where
        C: ItemCollection + ?Sized,
    {
        let Some(action) = self.redo_stack.pop() else {
            trace!("redo requested with empty redo stack");
            return Ok(None);
        };
        match action.redo(collection) {
            Ok(outcome) => {
                debug!(
                    action = action.kind().name(),
                    description = action.description(),
                    applied = outcome.applied,
                    skipped = outcome.skipped.len(),
                    "redid action"
                );
                let step = Step {
                    description: action.description().to_string(),
                    outcome,
                };
                self.push_undo(action);
                self.notify();
                Ok(Some(step))
            }
            Err(err) => {
                warn!(action = action.kind().name(), error = %err, "redo failed");
                self.redo_stack.push(action);
                Err(err.into())
            }
        }
    }

    /// Drop both stacks.
    pub fn clear(&mut self) {
        if self.undo_stack.is_empty() && self.redo_stack.is_empty() {
            return;
        }
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.notify();
    }

    /// Change the undo depth, evicting the oldest entries if the stack is
    /// now over capacity. Zero is treated as one.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        if self.evict_overflow() > 0 {
            self.notify();
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Undo entries, most recent first.
    pub fn undo_history(&self) -> impl Iterator<Item = &Action> + '_ {
        self.undo_stack.iter().rev()
    }

    /// Redo entries, most recent first.
    pub fn redo_history(&self) -> impl Iterator<Item = &Action> + '_ {
        self.redo_stack.iter().rev()
    }

    /// Description of the action the next [`History::undo`] would reverse.
    #[must_use]
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(Action::description)
    }

    /// Description of the action the next [`History::redo`] would replay.
    #[must_use]
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(Action::description)
    }

    // -----------------------------------------------------------------------
    // Change notification
    // -----------------------------------------------------------------------

    /// Register a callback fired after every state-changing call.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut() + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    fn notify(&mut self) {
        for (_, listener) in &mut self.listeners {
            listener();
        }
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn push_undo(&mut self, action: Action) {
        self.undo_stack.push_back(action);
        self.evict_overflow();
    }

    fn evict_overflow(&mut self) -> usize {
        let mut evicted = 0;
        while self.undo_stack.len() > self.capacity {
            if let Some(oldest) = self.undo_stack.pop_front() {
                trace!(description = oldest.description(), "evicted oldest undo entry");
                evicted += 1;
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::model::{Item, ItemId, Status};
    use std::cell::Cell;
    use std::rc::Rc;

    fn id(raw: &str) -> ItemId {
        ItemId::new_unchecked(raw)
    }

    fn board(ids: &[&str]) -> Board {
        Board::from_items(ids.iter().map(|raw| Item::new(id(raw))).collect()).expect("unique")
    }

    fn status_of(board: &Board, raw: &str) -> Status {
        board.get(&id(raw)).expect("present").status
    }

    #[test]
    fn default_capacity_is_fifty() {
        let history = History::default();
        assert_eq!(history.capacity(), DEFAULT_MAX_HISTORY);
        assert_eq!(history.capacity(), 50);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn zero_capacity_is_coerced_to_one() {
        assert_eq!(History::new(0).capacity(), 1);
        let mut history = History::new(5);
        history.set_capacity(0);
        assert_eq!(history.capacity(), 1);
    }

    #[test]
    fn execute_undo_redo_walks_the_state_machine() {
        let mut b = board(&["1"]);
        let mut history = History::default();

        let action = Action::status_change(&b, [id("1")], Status::Done).unwrap();
        let step = history.execute(action, &mut b).unwrap();
        assert_eq!(step.description, "Set 1 to done");
        assert_eq!(status_of(&b, "1"), Status::Done);
        assert!(history.can_undo());
        assert!(!history.can_redo());

        let step = history.undo(&mut b).unwrap().expect("something to undo");
        assert_eq!(step.description, "Set 1 to done");
        assert_eq!(status_of(&b, "1"), Status::Open);
        assert!(!history.can_undo());
        assert!(history.can_redo());

        history.redo(&mut b).unwrap().expect("something to redo");
        assert_eq!(status_of(&b, "1"), Status::Done);
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn undo_does_not_clear_redo() {
        let mut b = board(&["a"]);
        let mut history = History::default();
        for status in [Status::Ordered, Status::Waiting] {
            let action = Action::status_change(&b, [id("a")], status).unwrap();
            history.execute(action, &mut b).unwrap();
        }
        history.undo(&mut b).unwrap();
        history.undo(&mut b).unwrap();
        assert_eq!(history.redo_len(), 2);
        assert_eq!(status_of(&b, "a"), Status::Open);
    }

    #[test]
    fn new_commit_clears_redo() {
        let mut b = board(&["a"]);
        let mut history = History::default();
        let action = Action::status_change(&b, [id("a")], Status::Done).unwrap();
        history.execute(action, &mut b).unwrap();
        history.undo(&mut b).unwrap();
        assert!(history.can_redo());

        let action = Action::status_change(&b, [id("a")], Status::Waiting).unwrap();
        history.execute(action, &mut b).unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.redo_len(), 0);
    }

    #[test]
    fn capacity_evicts_oldest_first() {
        let mut b = board(&["x", "y", "z"]);
        let mut history = History::new(2);
        for raw in ["x", "y", "z"] {
            let action = Action::status_change(&b, [id(raw)], Status::Done).unwrap();
            history.execute(action, &mut b).unwrap();
        }
        let remaining: Vec<&str> = history.undo_history().map(Action::description).collect();
        assert_eq!(remaining, ["Set z to done", "Set y to done"]);

        history.undo(&mut b).unwrap();
        history.undo(&mut b).unwrap();
        assert!(history.undo(&mut b).unwrap().is_none());
        assert_eq!(status_of(&b, "x"), Status::Done);
        assert_eq!(status_of(&b, "y"), Status::Open);
    }

    #[test]
    fn redo_push_respects_capacity() {
        let mut b = board(&["a", "b"]);
        let mut history = History::new(2);
        for raw in ["a", "b"] {
            let action = Action::status_change(&b, [id(raw)], Status::Done).unwrap();
            history.execute(action, &mut b).unwrap();
        }
        history.undo(&mut b).unwrap();
        history.set_capacity(1);
        assert_eq!(history.undo_len(), 1);

        history.redo(&mut b).unwrap().expect("something to redo");
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.undo_description(), Some("Set b to done"));

        history.undo(&mut b).unwrap();
        assert!(history.undo(&mut b).unwrap().is_none());
        assert_eq!(status_of(&b, "a"), Status::Done);
        assert_eq!(status_of(&b, "b"), Status::Open);
    }

    #[test]
    fn empty_stack_calls_are_noops() {
        let mut b = board(&["a"]);
        let before = b.clone();
        let mut history = History::default();
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        history.subscribe(move || counter.set(counter.get() + 1));

        assert!(history.undo(&mut b).unwrap().is_none());
        assert!(history.redo(&mut b).unwrap().is_none());
        assert_eq!(b, before);
        assert_eq!(history.undo_len(), 0);
        assert_eq!(history.redo_len(), 0);
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn listeners_fire_once_per_change() {
        let mut b = board(&["a"]);
        let mut history = History::default();
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        let sub = history.subscribe(move || counter.set(counter.get() + 1));

        let action = Action::status_change(&b, [id("a")], Status::Done).unwrap();
        history.execute(action, &mut b).unwrap();
        history.undo(&mut b).unwrap();
        history.redo(&mut b).unwrap();
        assert_eq!(fired.get(), 3);

        history.clear();
        assert_eq!(fired.get(), 4);
        history.clear();
        assert_eq!(fired.get(), 4);

        assert!(history.unsubscribe(sub));
        assert!(!history.unsubscribe(sub));
        let action = Action::status_change(&b, [id("a")], Status::Open).unwrap();
        history.execute(action, &mut b).unwrap();
        assert_eq!(fired.get(), 4);
    }

    #[test]
    fn set_capacity_shrink_evicts_and_notifies() {
        let mut b = board(&["a", "b", "c"]);
        let mut history = History::new(10);
        for raw in ["a", "b", "c"] {
            let action = Action::status_change(&b, [id(raw)], Status::Done).unwrap();
            history.execute(action, &mut b).unwrap();
        }
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        history.subscribe(move || counter.set(counter.get() + 1));

        history.set_capacity(20);
        assert_eq!(fired.get(), 0);
        history.set_capacity(1);
        assert_eq!(fired.get(), 1);
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.undo_description(), Some("Set c to done"));
    }

    #[test]
    fn history_views_are_most_recent_first() {
        let mut b = board(&["a", "b"]);
        let mut history = History::default();
        for raw in ["a", "b"] {
            let action = Action::archive(&b, [id(raw)], None).unwrap();
            history.execute(action, &mut b).unwrap();
        }
        history.undo(&mut b).unwrap();
        assert_eq!(history.undo_description(), Some("Archive a"));
        assert_eq!(history.redo_description(), Some("Archive b"));

        history.undo(&mut b).unwrap();
        let redo: Vec<&str> = history.redo_history().map(Action::description).collect();
        assert_eq!(redo, ["Archive a", "Archive b"]);
    }

    #[test]
    fn from_config_uses_max_history() {
        let config = HistoryConfig { max_history: 7 };
        assert_eq!(History::from_config(&config).capacity(), 7);
    }

    #[test]
    fn error_codes_follow_cause() {
        let err = HistoryError::NothingToRecord("x".into());
        assert_eq!(err.code(), ErrorCode::NothingToRecord);
        let err = HistoryError::from(CollectionError::Unavailable("closed".into()));
        assert_eq!(err.code(), ErrorCode::CollectionUnavailable);
        assert_eq!(err.to_string(), "item collection unavailable: closed");
    }
}
