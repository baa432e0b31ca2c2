//! Translates a single drag gesture into a new item arrangement.
//!
//! Every lookup goes through item ids, never through the visual index the
//! gesture was started from, because the view may be rendering a projection
//! that a concurrent remote write has already replaced.

use serde::{Deserialize, Serialize};
use shared::domain::{ColumnId, Columns, ItemId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropTarget {
    /// Dropped onto another item; the dragged item takes its slot.
    Item { item_id: ItemId, column_id: ColumnId },
    /// Dropped onto the placeholder of a column without items.
    EmptyColumn { column_id: ColumnId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragEnd {
    pub item_id: ItemId,
    pub column_id: ColumnId,
    pub target: Option<DropTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unchanged {
    NoTarget,
    DroppedOnSelf,
    StaleSource,
    StaleTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arrangement {
    Moved(Columns),
    Unchanged(Unchanged),
}

impl Arrangement {
    pub fn is_moved(&self) -> bool {
        matches!(self, Arrangement::Moved(_))
    }
}

pub fn arrange(columns: &Columns, drag: &DragEnd) -> Arrangement {
    let Some(target) = &drag.target else {
        return Arrangement::Unchanged(Unchanged::NoTarget);
    };

    let Some(source_index) = columns.get(drag.column_id).position_of(&drag.item_id) else {
        return Arrangement::Unchanged(Unchanged::StaleSource);
    };

    match target {
        DropTarget::EmptyColumn { column_id } => {
            let mut next = columns.clone();
            let moved = next.get_mut(drag.column_id).items.remove(source_index);
            next.get_mut(*column_id).items.push(moved);
            Arrangement::Moved(next)
        }
        DropTarget::Item { item_id, .. } if item_id == &drag.item_id => {
            Arrangement::Unchanged(Unchanged::DroppedOnSelf)
        }
        DropTarget::Item { item_id, column_id } => {
            let Some(target_index) = columns.get(*column_id).position_of(item_id) else {
                return Arrangement::Unchanged(Unchanged::StaleTarget);
            };

            let mut next = columns.clone();
            if *column_id == drag.column_id {
                let items = &mut next.get_mut(drag.column_id).items;
                let moved = items.remove(source_index);
                items.insert(target_index, moved);
            } else {
                let moved = next.get_mut(drag.column_id).items.remove(source_index);
                next.get_mut(*column_id).items.insert(target_index, moved);
            }
            Arrangement::Moved(next)
        }
    }
}

#[cfg(test)]
#[path = "tests/ordering_tests.rs"]
mod tests;
