//! Reversible board actions.
//!
//! An [`Action`] records one committed mutation together with everything
//! needed to reverse it. The payload is captured from the live collection
//! when the action is built (see the constructors on [`Action`]), so undo
//! never has to look anywhere but the action itself and the collection it is
//! applied to:
//!
//! | Kind | Undo |
//! |---|---|
//! | `status_change` | restore each item's previous status |
//! | `archive` | un-archive and restore previous status |
//! | `unarchive` | re-archive and restore the status it had while archived |
//! | `field_edit` | restore the previous value (or remove the field) |
//! | `link` / `unlink` | restore each item's previous group |
//! | `delete` | re-insert each snapshot at its original index |
//! | `color_change` | restore the previous color |
//! | `reorder` | move the item back to its original index |
//! | `paste` | remove the pasted items |
//!
//! Ids that no longer resolve when an action is applied are skipped and
//! reported in the [`Outcome`]; the remaining ids are still processed.
//! Only a [`CollectionError`] aborts an apply.

use crate::board::{CollectionError, ItemCollection};
use crate::history::HistoryError;
use crate::model::{Color, GroupId, Item, ItemId, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

/// Prior status of one item touched by a status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub id: ItemId,
    pub previous: Status,
}

/// Prior archive state of one item touched by an archive or unarchive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub id: ItemId,
    pub previous_status: Status,
    pub previous_archived: bool,
}

/// Prior link group of one item touched by a link or unlink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub id: ItemId,
    pub previous: Option<GroupId>,
}

/// Snapshot of a deleted item and the index it occupied before the delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedItem {
    pub index: usize,
    pub item: Item,
}

/// The closed set of reversible mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    StatusChange {
        changes: Vec<StatusEntry>,
        status: Status,
    },
    Archive {
        changes: Vec<ArchiveEntry>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<Status>,
    },
    Unarchive {
        changes: Vec<ArchiveEntry>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<Status>,
    },
    FieldEdit {
        id: ItemId,
        field: String,
        previous: Option<Value>,
        value: Option<Value>,
    },
    Link {
        changes: Vec<GroupEntry>,
        group: GroupId,
    },
    Unlink {
        changes: Vec<GroupEntry>,
    },
    /// `removed` carries each item's original index; undo re-inserts in
    /// ascending index order whatever order the payload lists them in.
    Delete {
        removed: Vec<RemovedItem>,
    },
    ColorChange {
        id: ItemId,
        previous: Option<Color>,
        color: Option<Color>,
    },
    Reorder {
        id: ItemId,
        from: usize,
        to: usize,
    },
    Paste {
        items: Vec<Item>,
        index: usize,
    },
}

impl ActionKind {
    /// Stable snake_case name of the variant, for logs and JSON output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StatusChange { .. } => "status_change",
            Self::Archive { .. } => "archive",
            Self::Unarchive { .. } => "unarchive",
            Self::FieldEdit { .. } => "field_edit",
            Self::Link { .. } => "link",
            Self::Unlink { .. } => "unlink",
            Self::Delete { .. } => "delete",
            Self::ColorChange { .. } => "color_change",
            Self::Reorder { .. } => "reorder",
            Self::Paste { .. } => "paste",
        }
    }

    /// Ids referenced by the payload, in payload order.
    #[must_use]
    pub fn item_ids(&self) -> Vec<&ItemId> {
        match self {
            Self::StatusChange { changes, .. } => changes.iter().map(|e| &e.id).collect(),
            Self::Archive { changes, .. } | Self::Unarchive { changes, .. } => {
                changes.iter().map(|e| &e.id).collect()
            }
            Self::Link { changes, .. } | Self::Unlink { changes } => {
                changes.iter().map(|e| &e.id).collect()
            }
            Self::Delete { removed } => removed.iter().map(|r| &r.item.id).collect(),
            Self::Paste { items, .. } => items.iter().map(|item| &item.id).collect(),
            Self::FieldEdit { id, .. } | Self::ColorChange { id, .. } | Self::Reorder { id, .. } => {
                vec![id]
            }
        }
    }
}

/// Result of applying an action: how many ids took effect and which ids
/// were skipped because they no longer resolve (or, for inserts, already
/// exist).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub applied: usize,
    pub skipped: Vec<ItemId>,
}

impl Outcome {
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }

    fn skip(&mut self, id: &ItemId) {
        tracing::debug!(item = %id, "skipping stale item reference");
        self.skipped.push(id.clone());
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// One committed, reversible mutation.
///
/// Actions are immutable once built: the history only moves them between
/// its undo and redo stacks. `timestamp` and `description` are for display;
/// ordering is decided by stack position alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    timestamp: DateTime<Utc>,
    description: String,
    kind: ActionKind,
}

impl Action {
    /// Wrap a prebuilt payload. Prefer the capturing constructors below,
    /// which read the "before" state from the collection.
    #[must_use]
    pub fn new(description: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            timestamp: Utc::now(),
            description: description.into(),
            kind,
        }
    }

    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub const fn kind(&self) -> &ActionKind {
        &self.kind
    }

    // -----------------------------------------------------------------------
    // Capturing constructors
    // -----------------------------------------------------------------------

    /// Move `ids` to `status`.
    ///
    /// # Errors
    ///
    /// [`HistoryError::NothingToRecord`] if none of `ids` resolve;
    /// [`HistoryError::Collection`] if the collection fails.
    pub fn status_change<C, I>(collection: &C, ids: I, status: Status) -> Result<Self, HistoryError>
    where
        C: ItemCollection + ?Sized,
        I: IntoIterator<Item = ItemId>,
    {
        let mut changes = Vec::new();
        for id in unique(ids) {
            if let Some(item) = collection.find(&id)? {
                changes.push(StatusEntry {
                    previous: item.status,
                    id,
                });
            }
        }
        let subject = subject(changes.iter().map(|e| &e.id))?;
        Ok(Self::new(
            format!("Set {subject} to {status}"),
            ActionKind::StatusChange { changes, status },
        ))
    }

    /// Archive `ids`, optionally moving them to `status` at the same time.
    ///
    /// # Errors
    ///
    /// Same as [`Action::status_change`].
    pub fn archive<C, I>(
        collection: &C,
        ids: I,
        status: Option<Status>,
    ) -> Result<Self, HistoryError>
    where
        C: ItemCollection + ?Sized,
        I: IntoIterator<Item = ItemId>,
    {
        let changes = archive_entries(collection, ids)?;
        let subject = subject(changes.iter().map(|e| &e.id))?;
        Ok(Self::new(
            format!("Archive {subject}"),
            ActionKind::Archive { changes, status },
        ))
    }

    /// Return archived `ids` to the board, optionally moving them to `status`.
    ///
    /// # Errors
    ///
    /// Same as [`Action::status_change`].
    pub fn unarchive<C, I>(
        collection: &C,
        ids: I,
        status: Option<Status>,
    ) -> Result<Self, HistoryError>
    where
        C: ItemCollection + ?Sized,
        I: IntoIterator<Item = ItemId>,
    {
        let changes = archive_entries(collection, ids)?;
        let subject = subject(changes.iter().map(|e| &e.id))?;
        Ok(Self::new(
            format!("Unarchive {subject}"),
            ActionKind::Unarchive { changes, status },
        ))
    }

    /// Set (`Some`) or clear (`None`) a named field on one item.
    ///
    /// # Errors
    ///
    /// [`HistoryError::NothingToRecord`] if `id` does not resolve.
    pub fn field_edit<C>(
        collection: &C,
        id: ItemId,
        field: impl Into<String>,
        value: Option<Value>,
    ) -> Result<Self, HistoryError>
    where
        C: ItemCollection + ?Sized,
    {
        let field = field.into();
        let item = collection
            .find(&id)?
            .ok_or_else(|| HistoryError::NothingToRecord(format!("item {id} not found")))?;
        let previous = item.field(&field).cloned();
        Ok(Self::new(
            format!("Edit {field}"),
            ActionKind::FieldEdit {
                id,
                field,
                previous,
                value,
            },
        ))
    }

    /// Put `ids` into link group `group`.
    ///
    /// # Errors
    ///
    /// Same as [`Action::status_change`].
    pub fn link<C, I>(collection: &C, ids: I, group: GroupId) -> Result<Self, HistoryError>
    where
        C: ItemCollection + ?Sized,
        I: IntoIterator<Item = ItemId>,
    {
        let changes = group_entries(collection, ids)?;
        let subject = subject(changes.iter().map(|e| &e.id))?;
        Ok(Self::new(
            format!("Link {subject}"),
            ActionKind::Link { changes, group },
        ))
    }

    /// Remove `ids` from whatever link group they are in.
    ///
    /// # Errors
    ///
    /// Same as [`Action::status_change`].
    pub fn unlink<C, I>(collection: &C, ids: I) -> Result<Self, HistoryError>
    where
        C: ItemCollection + ?Sized,
        I: IntoIterator<Item = ItemId>,
    {
        let changes = group_entries(collection, ids)?;
        let subject = subject(changes.iter().map(|e| &e.id))?;
        Ok(Self::new(
            format!("Unlink {subject}"),
            ActionKind::Unlink { changes },
        ))
    }

    /// Delete `ids`, snapshotting each item with its current index.
    ///
    /// # Errors
    ///
    /// Same as [`Action::status_change`].
    pub fn delete<C, I>(collection: &C, ids: I) -> Result<Self, HistoryError>
    where
        C: ItemCollection + ?Sized,
        I: IntoIterator<Item = ItemId>,
    {
        let mut removed = Vec::new();
        for id in unique(ids) {
            let (Some(index), Some(item)) = (collection.index_of(&id)?, collection.find(&id)?)
            else {
                continue;
            };
            removed.push(RemovedItem {
                index,
                item: item.clone(),
            });
        }
        removed.sort_by_key(|r| r.index);
        let subject = subject(removed.iter().map(|r| &r.item.id))?;
        Ok(Self::new(
            format!("Delete {subject}"),
            ActionKind::Delete { removed },
        ))
    }

    /// Set (`Some`) or clear (`None`) the color of one item.
    ///
    /// # Errors
    ///
    /// [`HistoryError::NothingToRecord`] if `id` does not resolve.
    pub fn color_change<C>(
        collection: &C,
        id: ItemId,
        color: Option<Color>,
    ) -> Result<Self, HistoryError>
    where
        C: ItemCollection + ?Sized,
    {
        let item = collection
            .find(&id)?
            .ok_or_else(|| HistoryError::NothingToRecord(format!("item {id} not found")))?;
        let previous = item.color.clone();
        let description = if color.is_some() {
            format!("Change color of {id}")
        } else {
            format!("Clear color of {id}")
        };
        Ok(Self::new(
            description,
            ActionKind::ColorChange {
                id,
                previous,
                color,
            },
        ))
    }

    /// Move one item to index `to` (clamped to the last position).
    ///
    /// # Errors
    ///
    /// [`HistoryError::NothingToRecord`] if `id` does not resolve or the
    /// move would leave it where it is.
    pub fn reorder<C>(collection: &C, id: ItemId, to: usize) -> Result<Self, HistoryError>
    where
        C: ItemCollection + ?Sized,
    {
        let from = collection
            .index_of(&id)?
            .ok_or_else(|| HistoryError::NothingToRecord(format!("item {id} not found")))?;
        let to = to.min(collection.len()?.saturating_sub(1));
        if from == to {
            return Err(HistoryError::NothingToRecord(format!(
                "item {id} is already at position {to}"
            )));
        }
        Ok(Self::new(
            format!("Move {id}"),
            ActionKind::Reorder { id, from, to },
        ))
    }

    /// Insert `items` as a contiguous run starting at `index` (clamped to
    /// the end of the collection).
    ///
    /// # Errors
    ///
    /// [`HistoryError::NothingToRecord`] if `items` is empty;
    /// [`CollectionError::DuplicateId`] if a pasted id is already on the
    /// board or appears twice in `items`.
    pub fn paste<C>(collection: &C, items: Vec<Item>, index: usize) -> Result<Self, HistoryError>
    where
        C: ItemCollection + ?Sized,
    {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(&item.id) || collection.find(&item.id)?.is_some() {
                return Err(CollectionError::DuplicateId(item.id.clone()).into());
            }
        }
        let subject = subject(items.iter().map(|item| &item.id))?;
        let index = index.min(collection.len()?);
        Ok(Self::new(
            format!("Paste {subject}"),
            ActionKind::Paste { items, index },
        ))
    }

    // -----------------------------------------------------------------------
    // Apply
    // -----------------------------------------------------------------------

    /// Apply the forward mutation.
    ///
    /// Structural variants resolve their targets by id, so applying an
    /// action whose effect is already present changes nothing: a deleted id
    /// that is already gone and a pasted id that is already present are
    /// both skipped.
    ///
    /// # Errors
    ///
    /// Only a fatal [`CollectionError`]; stale ids are reported in the
    /// returned [`Outcome`].
    pub fn execute<C>(&self, collection: &mut C) -> Result<Outcome, CollectionError>
    where
        C: ItemCollection + ?Sized,
    {
        let mut outcome = Outcome::default();
        match &self.kind {
            ActionKind::StatusChange { changes, status } => {
                for entry in changes {
                    update(collection, &entry.id, &mut outcome, |item| {
                        item.status = *status;
                    })?;
                }
            }
            ActionKind::Archive { changes, status } => {
                set_archived(collection, changes, true, *status, &mut outcome)?;
            }
            ActionKind::Unarchive { changes, status } => {
                set_archived(collection, changes, false, *status, &mut outcome)?;
            }
            ActionKind::FieldEdit {
                id, field, value, ..
            } => {
                update(collection, id, &mut outcome, |item| {
                    item.set_field(field, value.clone());
                })?;
            }
            ActionKind::Link { changes, group } => {
                for entry in changes {
                    update(collection, &entry.id, &mut outcome, |item| {
                        item.group = Some(group.clone());
                    })?;
                }
            }
            ActionKind::Unlink { changes } => {
                for entry in changes {
                    update(collection, &entry.id, &mut outcome, |item| {
                        item.group = None;
                    })?;
                }
            }
            ActionKind::Delete { removed } => {
                for entry in removed {
                    remove_by_id(collection, &entry.item.id, &mut outcome)?;
                }
            }
            ActionKind::ColorChange { id, color, .. } => {
                update(collection, id, &mut outcome, |item| {
                    item.color = color.clone();
                })?;
            }
            ActionKind::Reorder { id, to, .. } => {
                move_to(collection, id, *to, &mut outcome)?;
            }
            ActionKind::Paste { items, index } => {
                let mut position = *index;
                for item in items {
                    if insert_clamped(collection, position, item, &mut outcome)? {
                        position += 1;
                    }
                }
            }
        }
        Ok(outcome)
    }

    /// Reverse the mutation using only the captured payload.
    ///
    /// Paste is reversed by removing the pasted ids. If a redo skipped one of
    /// them because another item with the same id had been inserted in the
    /// meantime, this removes that other item; hosts that reuse ids should
    /// check [`Outcome::skipped`] from the redo.
    ///
    /// # Errors
    ///
    /// Only a fatal [`CollectionError`].
    pub fn undo<C>(&self, collection: &mut C) -> Result<Outcome, CollectionError>
    where
        C: ItemCollection + ?Sized,
    {
        let mut outcome = Outcome::default();
        match &self.kind {
            ActionKind::StatusChange { changes, .. } => {
                for entry in changes {
                    update(collection, &entry.id, &mut outcome, |item| {
                        item.status = entry.previous;
                    })?;
                }
            }
            ActionKind::Archive { changes, .. } | ActionKind::Unarchive { changes, .. } => {
                for entry in changes {
                    update(collection, &entry.id, &mut outcome, |item| {
                        item.status = entry.previous_status;
                        item.archived = entry.previous_archived;
                    })?;
                }
            }
            ActionKind::FieldEdit {
                id,
                field,
                previous,
                ..
            } => {
                update(collection, id, &mut outcome, |item| {
                    item.set_field(field, previous.clone());
                })?;
            }
            ActionKind::Link { changes, .. } | ActionKind::Unlink { changes } => {
                for entry in changes {
                    update(collection, &entry.id, &mut outcome, |item| {
                        item.group = entry.previous.clone();
                    })?;
                }
            }
            ActionKind::Delete { removed } => {
                // Ascending order: each insert lands on its original index
                // because every earlier slot has already been refilled.
                let mut ordered: Vec<&RemovedItem> = removed.iter().collect();
                ordered.sort_by_key(|r| r.index);
                for entry in ordered {
                    insert_clamped(collection, entry.index, &entry.item, &mut outcome)?;
                }
            }
            ActionKind::ColorChange { id, previous, .. } => {
                update(collection, id, &mut outcome, |item| {
                    item.color = previous.clone();
                })?;
            }
            ActionKind::Reorder { id, from, .. } => {
                move_to(collection, id, *from, &mut outcome)?;
            }
            ActionKind::Paste { items, .. } => {
                for item in items {
                    remove_by_id(collection, &item.id, &mut outcome)?;
                }
            }
        }
        Ok(outcome)
    }

    /// Replay the forward mutation after an undo.
    ///
    /// Every forward path is keyed by id (see [`Action::execute`]), so this
    /// is exactly one application even for delete and paste.
    ///
    /// # Errors
    ///
    /// Only a fatal [`CollectionError`].
    pub fn redo<C>(&self, collection: &mut C) -> Result<Outcome, CollectionError>
    where
        C: ItemCollection + ?Sized,
    {
        self.execute(collection)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn unique(ids: impl IntoIterator<Item = ItemId>) -> Vec<ItemId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// "PO-1" for a single id, "3 items" otherwise.
fn subject<'a>(ids: impl ExactSizeIterator<Item = &'a ItemId>) -> Result<String, HistoryError> {
    let count = ids.len();
    let mut ids = ids;
    match (count, ids.next()) {
        (0, _) | (_, None) => Err(HistoryError::NothingToRecord(
            "none of the requested items exist".to_string(),
        )),
        (1, Some(id)) => Ok(id.to_string()),
        (n, Some(_)) => Ok(format!("{n} items")),
    }
}

fn archive_entries<C>(
    collection: &C,
    ids: impl IntoIterator<Item = ItemId>,
) -> Result<Vec<ArchiveEntry>, CollectionError>
where
    C: ItemCollection + ?Sized,
{
    let mut changes = Vec::new();
    for id in unique(ids) {
        if let Some(item) = collection.find(&id)? {
            changes.push(ArchiveEntry {
                previous_status: item.status,
                previous_archived: item.archived,
                id,
            });
        }
    }
    Ok(changes)
}

fn group_entries<C>(
    collection: &C,
    ids: impl IntoIterator<Item = ItemId>,
) -> Result<Vec<GroupEntry>, CollectionError>
where
    C: ItemCollection + ?Sized,
{
    let mut changes = Vec::new();
    for id in unique(ids) {
        if let Some(item) = collection.find(&id)? {
            changes.push(GroupEntry {
                previous: item.group.clone(),
                id,
            });
        }
    }
    Ok(changes)
}

fn update<C, F>(
    collection: &mut C,
    id: &ItemId,
    outcome: &mut Outcome,
    f: F,
) -> Result<(), CollectionError>
where
    C: ItemCollection + ?Sized,
    F: FnOnce(&mut Item),
{
    match collection.find_mut(id)? {
        Some(item) => {
            f(item);
            outcome.applied += 1;
        }
        None => outcome.skip(id),
    }
    Ok(())
}

fn set_archived<C>(
    collection: &mut C,
    changes: &[ArchiveEntry],
    archived: bool,
    status: Option<Status>,
    outcome: &mut Outcome,
) -> Result<(), CollectionError>
where
    C: ItemCollection + ?Sized,
{
    for entry in changes {
        update(collection, &entry.id, outcome, |item| {
            item.archived = archived;
            if let Some(status) = status {
                item.status = status;
            }
        })?;
    }
    Ok(())
}

fn remove_by_id<C>(
    collection: &mut C,
    id: &ItemId,
    outcome: &mut Outcome,
) -> Result<(), CollectionError>
where
    C: ItemCollection + ?Sized,
{
    match collection.index_of(id)? {
        Some(index) => {
            collection.remove_at(index)?;
            outcome.applied += 1;
        }
        None => outcome.skip(id),
    }
    Ok(())
}

/// Insert a copy of `item` at `index`, clamped to the current length.
/// Returns `false` (and records a skip) when the id is already present.
fn insert_clamped<C>(
    collection: &mut C,
    index: usize,
    item: &Item,
    outcome: &mut Outcome,
) -> Result<bool, CollectionError>
where
    C: ItemCollection + ?Sized,
{
    if collection.index_of(&item.id)?.is_some() {
        outcome.skip(&item.id);
        return Ok(false);
    }
    let index = index.min(collection.len()?);
    collection.insert_at(index, item.clone())?;
    outcome.applied += 1;
    Ok(true)
}

fn move_to<C>(
    collection: &mut C,
    id: &ItemId,
    target: usize,
    outcome: &mut Outcome,
) -> Result<(), CollectionError>
where
    C: ItemCollection + ?Sized,
{
    let Some(current) = collection.index_of(id)? else {
        outcome.skip(id);
        return Ok(());
    };
    let item = collection.remove_at(current)?;
    let target = target.min(collection.len()?);
    collection.insert_at(target, item)?;
    outcome.applied += 1;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use serde_json::json;

    fn id(raw: &str) -> ItemId {
        ItemId::new_unchecked(raw)
    }

    fn board(ids: &[&str]) -> Board {
        Board::from_items(ids.iter().map(|raw| Item::new(id(raw))).collect()).expect("unique")
    }

    fn order(board: &Board) -> Vec<String> {
        board.items().iter().map(|i| i.id.to_string()).collect()
    }

    /// Execute then undo must restore the exact starting board, and redo
    /// must reproduce the exact post-execute board.
    fn assert_reversible(start: &Board, action: &Action) {
        let mut b = start.clone();
        action.execute(&mut b).expect("execute");
        let after = b.clone();
        action.undo(&mut b).expect("undo");
        assert_eq!(&b, start, "undo of {} diverged", action.kind().name());
        action.redo(&mut b).expect("redo");
        assert_eq!(b, after, "redo of {} diverged", action.kind().name());
    }

    #[test]
    fn delete_undo_restores_positions_from_unsorted_payload() {
        let start = board(&["a", "b", "c", "d", "e"]);
        let removed = vec![
            RemovedItem {
                index: 3,
                item: start.items()[3].clone(),
            },
            RemovedItem {
                index: 0,
                item: start.items()[0].clone(),
            },
        ];
        let action = Action::new("Delete 2 items", ActionKind::Delete { removed });
        assert_reversible(&start, &action);
    }

    #[test]
    fn delete_undo_from_json_payload_restores_positions() {
        let start = board(&["a", "b", "c", "d", "e"]);
        let action: Action = serde_json::from_value(json!({
            "timestamp": "2026-01-01T00:00:00Z",
            "description": "Delete 2 items",
            "kind": {
                "type": "delete",
                "removed": [
                    { "index": 4, "item": { "id": "e" } },
                    { "index": 1, "item": { "id": "b" } }
                ]
            }
        }))
        .unwrap();
        assert_reversible(&start, &action);
    }

    #[test]
    fn paste_undo_removes_by_id_after_skipped_redo() {
        let mut b = board(&["a"]);
        let paste = Action::paste(&b, vec![Item::new(id("p"))], 1).unwrap();
        paste.execute(&mut b).unwrap();
        paste.undo(&mut b).unwrap();

        // Another path inserts its own "p" before the redo.
        let other = Item::new(id("p")).with_field("vendor", "Other");
        b.insert_at(0, other).unwrap();
        let redo = paste.redo(&mut b).unwrap();
        assert_eq!(redo.skipped, vec![id("p")]);

        paste.undo(&mut b).unwrap();
        assert_eq!(order(&b), ["a"]);
    }

    #[test]
    fn status_change_records_each_previous_status() {
        let mut b = board(&["a", "b"]);
        b.find_mut(&id("b")).unwrap().unwrap().status = Status::Waiting;
        let action = Action::status_change(&b, [id("a"), id("b")], Status::Done).unwrap();
        assert_eq!(action.description(), "Set 2 items to done");
        let ActionKind::StatusChange { changes, .. } = action.kind() else {
            panic!("expected status change");
        };
        assert_eq!(changes[0].previous, Status::Open);
        assert_eq!(changes[1].previous, Status::Waiting);
        assert_reversible(&b, &action);
    }

    #[test]
    fn constructors_drop_unknown_ids() {
        let b = board(&["a"]);
        let action = Action::status_change(&b, [id("a"), id("ghost")], Status::Done).unwrap();
        assert_eq!(action.kind().item_ids(), vec![&id("a")]);
        assert_eq!(action.description(), "Set a to done");
    }

    #[test]
    fn constructors_dedupe_ids() {
        let b = board(&["a", "b"]);
        let action = Action::delete(&b, [id("a"), id("a")]).unwrap();
        assert_eq!(action.kind().item_ids().len(), 1);
    }

    #[test]
    fn constructors_with_nothing_resolved_fail() {
        let b = board(&["a"]);
        let err = Action::archive(&b, [id("ghost")], None).unwrap_err();
        assert!(matches!(err, HistoryError::NothingToRecord(_)));
        let err = Action::field_edit(&b, id("ghost"), "vendor", None).unwrap_err();
        assert!(matches!(err, HistoryError::NothingToRecord(_)));
    }

    #[test]
    fn archive_then_undo_restores_status_and_flag() {
        let mut b = board(&["a", "b"]);
        b.find_mut(&id("a")).unwrap().unwrap().status = Status::Waiting;
        let action = Action::archive(&b, [id("a"), id("b")], Some(Status::Done)).unwrap();
        assert_eq!(action.description(), "Archive 2 items");

        let mut after = b.clone();
        action.execute(&mut after).unwrap();
        assert!(after.items().iter().all(|i| i.archived && i.status == Status::Done));
        assert_reversible(&b, &action);
    }

    #[test]
    fn unarchive_undo_restores_archived_status() {
        let mut b = board(&["a"]);
        {
            let item = b.find_mut(&id("a")).unwrap().unwrap();
            item.archived = true;
            item.status = Status::Done;
        }
        let action = Action::unarchive(&b, [id("a")], Some(Status::Open)).unwrap();
        let mut after = b.clone();
        action.execute(&mut after).unwrap();
        assert!(!after.items()[0].archived);
        assert_eq!(after.items()[0].status, Status::Open);
        action.undo(&mut after).unwrap();
        assert!(after.items()[0].archived);
        assert_eq!(after.items()[0].status, Status::Done);
    }

    #[test]
    fn archive_without_status_keeps_status() {
        let b = board(&["a"]);
        let action = Action::archive(&b, [id("a")], None).unwrap();
        let mut after = b.clone();
        action.execute(&mut after).unwrap();
        assert_eq!(after.items()[0].status, Status::Open);
        assert!(after.items()[0].archived);
    }

    #[test]
    fn field_edit_restores_absent_field() {
        let b = board(&["a"]);
        let action = Action::field_edit(&b, id("a"), "vendor", Some(json!("Acme"))).unwrap();
        assert_eq!(action.description(), "Edit vendor");
        let mut after = b.clone();
        action.execute(&mut after).unwrap();
        assert_eq!(after.items()[0].field("vendor"), Some(&json!("Acme")));
        action.undo(&mut after).unwrap();
        assert!(after.items()[0].field("vendor").is_none());
        assert_reversible(&b, &action);
    }

    #[test]
    fn field_edit_clearing_restores_value() {
        let b = Board::from_items(vec![Item::new(id("a")).with_field("qty", 12)]).unwrap();
        let action = Action::field_edit(&b, id("a"), "qty", None).unwrap();
        assert_reversible(&b, &action);
    }

    #[test]
    fn link_restores_mixed_previous_groups() {
        let mut b = board(&["a", "b", "c"]);
        b.find_mut(&id("b")).unwrap().unwrap().group = Some(GroupId::new("g-old"));
        let action = Action::link(&b, [id("a"), id("b"), id("c")], GroupId::new("g-new")).unwrap();
        let mut after = b.clone();
        action.execute(&mut after).unwrap();
        assert!(
            after
                .items()
                .iter()
                .all(|i| i.group.as_ref().map(GroupId::as_str) == Some("g-new"))
        );
        assert_reversible(&b, &action);
    }

    #[test]
    fn unlink_clears_and_restores_group() {
        let mut b = board(&["a", "b"]);
        for raw in ["a", "b"] {
            b.find_mut(&id(raw)).unwrap().unwrap().group = Some(GroupId::new("g1"));
        }
        let action = Action::unlink(&b, [id("a"), id("b")]).unwrap();
        let mut after = b.clone();
        action.execute(&mut after).unwrap();
        assert!(after.items().iter().all(|i| i.group.is_none()));
        assert_reversible(&b, &action);
    }

    #[test]
    fn delete_undo_reinserts_at_original_index() {
        let b = board(&["1", "2", "3"]);
        let action = Action::delete(&b, [id("2")]).unwrap();
        let mut after = b.clone();
        action.execute(&mut after).unwrap();
        assert_eq!(order(&after), ["1", "3"]);
        action.undo(&mut after).unwrap();
        assert_eq!(order(&after), ["1", "2", "3"]);
    }

    #[test]
    fn delete_of_non_adjacent_items_restores_positions() {
        let b = board(&["a", "b", "c", "d", "e"]);
        let action = Action::delete(&b, [id("d"), id("a"), id("c")]).unwrap();
        let mut after = b.clone();
        action.execute(&mut after).unwrap();
        assert_eq!(order(&after), ["b", "e"]);
        assert_reversible(&b, &action);
    }

    #[test]
    fn delete_undo_clamps_when_board_shrank() {
        let b = board(&["a", "b", "c"]);
        let action = Action::delete(&b, [id("c")]).unwrap();
        let mut after = b.clone();
        action.execute(&mut after).unwrap();
        after.remove_at(0).unwrap();
        action.undo(&mut after).unwrap();
        assert_eq!(order(&after), ["b", "c"]);
    }

    #[test]
    fn color_change_roundtrip() {
        let b = board(&["a"]);
        let action =
            Action::color_change(&b, id("a"), Some(Color::parse("#e0a800").unwrap())).unwrap();
        assert_eq!(action.description(), "Change color of a");
        assert_reversible(&b, &action);
        let clear = Action::color_change(&b, id("a"), None).unwrap();
        assert_eq!(clear.description(), "Clear color of a");
    }

    #[test]
    fn reorder_moves_and_moves_back() {
        let b = board(&["a", "b", "c", "d"]);
        let action = Action::reorder(&b, id("a"), 2).unwrap();
        let mut after = b.clone();
        action.execute(&mut after).unwrap();
        assert_eq!(order(&after), ["b", "c", "a", "d"]);
        assert_reversible(&b, &action);

        let back = Action::reorder(&b, id("d"), 0).unwrap();
        assert_reversible(&b, &back);
    }

    #[test]
    fn reorder_clamps_target_and_rejects_noop() {
        let b = board(&["a", "b"]);
        let action = Action::reorder(&b, id("a"), 99).unwrap();
        assert!(matches!(
            action.kind(),
            ActionKind::Reorder { from: 0, to: 1, .. }
        ));
        assert!(matches!(
            Action::reorder(&b, id("b"), 5),
            Err(HistoryError::NothingToRecord(_))
        ));
    }

    #[test]
    fn paste_inserts_contiguous_run() {
        let b = board(&["a", "d"]);
        let action = Action::paste(&b, vec![Item::new(id("b")), Item::new(id("c"))], 1).unwrap();
        assert_eq!(action.description(), "Paste 2 items");
        let mut after = b.clone();
        action.execute(&mut after).unwrap();
        assert_eq!(order(&after), ["a", "b", "c", "d"]);
        assert_reversible(&b, &action);
    }

    #[test]
    fn paste_rejects_existing_or_repeated_ids() {
        let b = board(&["a"]);
        assert!(matches!(
            Action::paste(&b, vec![Item::new(id("a"))], 0),
            Err(HistoryError::Collection(CollectionError::DuplicateId(_)))
        ));
        assert!(matches!(
            Action::paste(&b, vec![Item::new(id("x")), Item::new(id("x"))], 0),
            Err(HistoryError::Collection(CollectionError::DuplicateId(_)))
        ));
        assert!(matches!(
            Action::paste(&b, Vec::new(), 0),
            Err(HistoryError::NothingToRecord(_))
        ));
    }

    #[test]
    fn redo_of_paste_never_double_inserts() {
        let b = board(&["a"]);
        let action = Action::paste(&b, vec![Item::new(id("p"))], 0).unwrap();
        let mut after = b.clone();
        action.execute(&mut after).unwrap();
        let outcome = action.redo(&mut after).unwrap();
        assert_eq!(outcome.applied, 0);
        assert_eq!(outcome.skipped, vec![id("p")]);
        assert_eq!(order(&after), ["p", "a"]);
    }

    #[test]
    fn stale_ids_are_skipped_and_rest_processed() {
        let b = board(&["a", "b", "c"]);
        let action = Action::status_change(&b, [id("a"), id("b"), id("c")], Status::Done).unwrap();
        let mut live = b.clone();
        action.execute(&mut live).unwrap();
        live.remove_at(1).unwrap();

        let outcome = action.undo(&mut live).unwrap();
        assert_eq!(outcome.applied, 2);
        assert_eq!(outcome.skipped, vec![id("b")]);
        assert!(outcome.is_partial());
        assert!(live.items().iter().all(|i| i.status == Status::Open));
    }

    #[test]
    fn single_item_actions_skip_when_stale() {
        let b = board(&["a", "b"]);
        let action = Action::reorder(&b, id("a"), 1).unwrap();
        let mut live = b.clone();
        live.remove_at(0).unwrap();
        let outcome = action.undo(&mut live).unwrap();
        assert_eq!(outcome.skipped, vec![id("a")]);
        assert_eq!(order(&live), ["b"]);
    }

    #[test]
    fn action_json_is_tagged_by_type() {
        let b = board(&["a"]);
        let action = Action::status_change(&b, [id("a")], Status::Done).unwrap();
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["kind"]["type"], "status_change");
        assert_eq!(value["kind"]["status"], "done");
        assert_eq!(value["description"], "Set a to done");
        let back: Action = serde_json::from_value(value).unwrap();
        assert_eq!(back, action);
    }
}
