use chrono::{DateTime, Utc};
use shared::domain::{
    BoardDocument, ColumnId, Columns, Item, ItemId, Ledger, TimerSettings, UserId,
};
use uuid::Uuid;

use crate::{
    reactions::{toggle_reaction, ReactionKind},
    BoardError,
};

const JOIN_CODE_LEN: usize = 8;

pub fn generate_join_code() -> String {
    Uuid::new_v4().simple().to_string()[..JOIN_CODE_LEN].to_string()
}

pub fn share_link(base_url: &str, join_code: &str) -> String {
    format!("{}/join?code={join_code}", base_url.trim_end_matches('/'))
}

/// A fresh board with the three fixed columns. A zero-minute timer starts
/// out revealed.
pub fn new_board(
    name: &str,
    created_by: &UserId,
    timer_minutes: u32,
    now: DateTime<Utc>,
) -> Result<BoardDocument, BoardError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BoardError::EmptyBoardName);
    }

    Ok(BoardDocument {
        name: name.to_string(),
        join_code: generate_join_code(),
        created_by: created_by.clone(),
        created_at: now,
        timer_settings: TimerSettings {
            duration: timer_minutes,
            enabled: timer_minutes > 0,
            start_time: now,
            visible: timer_minutes == 0,
        },
        columns: Columns::default(),
    })
}

pub fn new_item(text: &str, created_by: &UserId, now: DateTime<Utc>) -> Result<Item, BoardError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(BoardError::EmptyText);
    }

    Ok(Item {
        id: ItemId(Uuid::new_v4().to_string()),
        text: text.to_string(),
        created_by: created_by.clone(),
        created_at: now,
        reactions: Ledger::new(),
        dislikes: Ledger::new(),
        action: None,
        is_new: true,
    })
}

pub fn add_item(doc: &mut BoardDocument, column_id: ColumnId, item: Item) {
    doc.columns.get_mut(column_id).items.push(item);
}

fn item_mut<'a>(
    doc: &'a mut BoardDocument,
    column_id: ColumnId,
    item_id: &ItemId,
) -> Result<&'a mut Item, BoardError> {
    doc.columns
        .get_mut(column_id)
        .items
        .iter_mut()
        .find(|item| &item.id == item_id)
        .ok_or_else(|| BoardError::ItemNotFound {
            column_id,
            item_id: item_id.clone(),
        })
}

/// Removes an item on behalf of `user`. Only the item's creator may do so;
/// any other request leaves the document untouched.
pub fn delete_item(
    doc: &mut BoardDocument,
    column_id: ColumnId,
    item_id: &ItemId,
    user: &UserId,
) -> Result<Item, BoardError> {
    let column = doc.columns.get_mut(column_id);
    let index = column
        .position_of(item_id)
        .ok_or_else(|| BoardError::ItemNotFound {
            column_id,
            item_id: item_id.clone(),
        })?;
    if &column.items[index].created_by != user {
        return Err(BoardError::NotItemCreator {
            item_id: item_id.clone(),
            user_id: user.clone(),
        });
    }
    Ok(column.items.remove(index))
}

pub fn toggle_item_reaction(
    doc: &mut BoardDocument,
    column_id: ColumnId,
    item_id: &ItemId,
    user: &UserId,
    kind: ReactionKind,
) -> Result<(), BoardError> {
    let item = item_mut(doc, column_id, item_id)?;
    *item = toggle_reaction(item, user, kind);
    Ok(())
}

/// Blank text clears the action.
pub fn set_action(
    doc: &mut BoardDocument,
    column_id: ColumnId,
    item_id: &ItemId,
    text: &str,
) -> Result<(), BoardError> {
    let item = item_mut(doc, column_id, item_id)?;
    let text = text.trim();
    item.action = (!text.is_empty()).then(|| text.to_string());
    Ok(())
}

pub fn action_text(item: &Item) -> &str {
    item.action.as_deref().unwrap_or_default()
}

/// Clears the entry-animation flag wherever the item currently lives.
/// Returns false when there was nothing to clear.
pub fn clear_new_flag(doc: &mut BoardDocument, item_id: &ItemId) -> bool {
    let Some((column_id, index)) = doc.columns.locate(item_id) else {
        return false;
    };
    let item = &mut doc.columns.get_mut(column_id).items[index];
    std::mem::replace(&mut item.is_new, false)
}

pub fn mark_visible(doc: &mut BoardDocument) {
    doc.timer_settings.visible = true;
}

#[cfg(test)]
#[path = "tests/board_tests.rs"]
mod tests;
