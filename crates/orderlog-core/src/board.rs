//! The item collection that actions mutate.
//!
//! [`ItemCollection`] is the whole surface the undo history needs: id
//! resolution, positional insert/remove, and mutable access for field
//! writes. Every primitive is fallible so a host whose collection has gone
//! away (closed document, poisoned store) can report that as a fatal
//! [`CollectionError`] instead of letting actions guess.
//!
//! [`Board`] is the in-memory `Vec`-backed implementation used by the CLI
//! and the tests. It also carries the JSON load/save helpers the
//! surrounding application calls after each committed history step; the
//! history itself never persists anything.

use crate::error::ErrorCode;
use crate::model::{Item, ItemId};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Fatal failure of the underlying collection.
///
/// Stale ids are *not* collection errors: [`ItemCollection::find`] and
/// [`ItemCollection::index_of`] report them as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    #[error("index {index} is out of range for a collection of {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("item {0} is already present in the collection")]
    DuplicateId(ItemId),

    #[error("item collection unavailable: {0}")]
    Unavailable(String),
}

impl CollectionError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::IndexOutOfRange { .. } => ErrorCode::IndexOutOfRange,
            Self::DuplicateId(_) => ErrorCode::DuplicateItemId,
            Self::Unavailable(_) => ErrorCode::CollectionUnavailable,
        }
    }
}

/// Ordered, id-addressable list of items.
pub trait ItemCollection {
    /// Number of items currently in the collection.
    fn len(&self) -> Result<usize, CollectionError>;

    fn is_empty(&self) -> Result<bool, CollectionError> {
        Ok(self.len()? == 0)
    }

    fn find(&self, id: &ItemId) -> Result<Option<&Item>, CollectionError>;

    fn find_mut(&mut self, id: &ItemId) -> Result<Option<&mut Item>, CollectionError>;

    fn index_of(&self, id: &ItemId) -> Result<Option<usize>, CollectionError>;

    /// Insert `item` so that it ends up at `index`; items at or after
    /// `index` shift one position towards the end.
    fn insert_at(&mut self, index: usize, item: Item) -> Result<(), CollectionError>;

    fn remove_at(&mut self, index: usize) -> Result<Item, CollectionError>;
}

/// In-memory board backed by a `Vec`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Board {
    items: Vec<Item>,
}

impl Board {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a board, rejecting duplicate ids.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::DuplicateId`] for the first id that
    /// appears twice.
    pub fn from_items(items: Vec<Item>) -> Result<Self, CollectionError> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(&item.id) {
                return Err(CollectionError::DuplicateId(item.id.clone()));
            }
        }
        Ok(Self { items })
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<Item> {
        self.items
    }

    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    #[must_use]
    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    /// Load a board from a JSON file of the form `{ "items": [...] }`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is not valid board JSON, or
    /// contains duplicate ids.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let raw: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        let board = Self::from_items(raw.items)
            .with_context(|| format!("Invalid board in {}", path.display()))?;
        tracing::debug!(path = %path.display(), items = board.items.len(), "loaded board");
        Ok(board)
    }

    /// Write the board as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails when the file or its parent directory cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize board")?;
        std::fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), items = self.items.len(), "saved board");
        Ok(())
    }
}

impl ItemCollection for Board {
    fn len(&self) -> Result<usize, CollectionError> {
        Ok(self.items.len())
    }

    fn find(&self, id: &ItemId) -> Result<Option<&Item>, CollectionError> {
        Ok(self.get(id))
    }

    fn find_mut(&mut self, id: &ItemId) -> Result<Option<&mut Item>, CollectionError> {
        Ok(self.items.iter_mut().find(|item| &item.id == id))
    }

    fn index_of(&self, id: &ItemId) -> Result<Option<usize>, CollectionError> {
        Ok(self.items.iter().position(|item| &item.id == id))
    }

    fn insert_at(&mut self, index: usize, item: Item) -> Result<(), CollectionError> {
        if index > self.items.len() {
            return Err(CollectionError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        if self.get(&item.id).is_some() {
            return Err(CollectionError::DuplicateId(item.id));
        }
        self.items.insert(index, item);
        Ok(())
    }

    fn remove_at(&mut self, index: usize) -> Result<Item, CollectionError> {
        if index >= self.items.len() {
            return Err(CollectionError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }
}
