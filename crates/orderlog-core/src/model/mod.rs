//! Board item model.

pub mod item;
pub mod item_id;

pub use item::{Color, GroupId, Item, ParseColorError, ParseEnumError, Status};
pub use item_id::{ItemId, ParseIdError};
