use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(BoardId);
id_newtype!(ItemId);

/// Per-item mapping of user to a set flag. Only `true` entries count.
pub type Ledger = BTreeMap<UserId, bool>;

/// The three fixed board columns, declared in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ColumnId {
    #[serde(rename = "went-well")]
    WentWell,
    #[serde(rename = "to-improve")]
    ToImprove,
    #[serde(rename = "brilliant-ideas")]
    BrilliantIdeas,
}

impl ColumnId {
    pub const ALL: [ColumnId; 3] = [
        ColumnId::WentWell,
        ColumnId::ToImprove,
        ColumnId::BrilliantIdeas,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnId::WentWell => "went-well",
            ColumnId::ToImprove => "to-improve",
            ColumnId::BrilliantIdeas => "brilliant-ideas",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ColumnId::WentWell => "What Went Well",
            ColumnId::ToImprove => "What Could Be Improved",
            ColumnId::BrilliantIdeas => "Brilliant Ideas",
        }
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown column '{0}'")]
pub struct ParseColumnIdError(pub String);

impl FromStr for ColumnId {
    type Err = ParseColumnIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ColumnId::ALL
            .into_iter()
            .find(|column| column.as_str() == value)
            .ok_or_else(|| ParseColumnIdError(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub text: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reactions: Ledger,
    #[serde(default)]
    pub dislikes: Ledger,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Entry-animation hint only.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_new: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Column {
    pub fn empty(id: ColumnId) -> Self {
        Self {
            id,
            title: id.title().to_string(),
            items: Vec::new(),
        }
    }

    pub fn position_of(&self, item_id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == item_id)
    }
}

/// Exactly the three fixed columns. Serialized as a map keyed by column id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Columns {
    #[serde(rename = "went-well")]
    pub went_well: Column,
    #[serde(rename = "to-improve")]
    pub to_improve: Column,
    #[serde(rename = "brilliant-ideas")]
    pub brilliant_ideas: Column,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            went_well: Column::empty(ColumnId::WentWell),
            to_improve: Column::empty(ColumnId::ToImprove),
            brilliant_ideas: Column::empty(ColumnId::BrilliantIdeas),
        }
    }
}

impl Columns {
    pub fn get(&self, id: ColumnId) -> &Column {
        match id {
            ColumnId::WentWell => &self.went_well,
            ColumnId::ToImprove => &self.to_improve,
            ColumnId::BrilliantIdeas => &self.brilliant_ideas,
        }
    }

    pub fn get_mut(&mut self, id: ColumnId) -> &mut Column {
        match id {
            ColumnId::WentWell => &mut self.went_well,
            ColumnId::ToImprove => &mut self.to_improve,
            ColumnId::BrilliantIdeas => &mut self.brilliant_ideas,
        }
    }

    /// Columns in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        ColumnId::ALL.into_iter().map(move |id| self.get(id))
    }

    pub fn item_count(&self) -> usize {
        self.iter().map(|column| column.items.len()).sum()
    }

    pub fn locate(&self, item_id: &ItemId) -> Option<(ColumnId, usize)> {
        ColumnId::ALL.into_iter().find_map(|column_id| {
            self.get(column_id)
                .position_of(item_id)
                .map(|index| (column_id, index))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    /// Minutes; zero disables the countdown.
    pub duration: u32,
    pub enabled: bool,
    pub start_time: DateTime<Utc>,
    pub visible: bool,
}

/// The persisted board document. The store owns the board identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardDocument {
    pub name: String,
    pub join_code: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub timer_settings: TimerSettings,
    pub columns: Columns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    #[serde(flatten)]
    pub doc: BoardDocument,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> BoardDocument {
        let now: DateTime<Utc> = "2024-03-01T10:00:00Z".parse().expect("timestamp");
        let mut columns = Columns::default();
        columns.to_improve.items.push(Item {
            id: ItemId::from("item-1"),
            text: "Too many meetings".to_string(),
            created_by: UserId::from("u1"),
            created_at: now,
            reactions: Ledger::from([(UserId::from("u2"), true)]),
            dislikes: Ledger::new(),
            action: None,
            is_new: false,
        });
        BoardDocument {
            name: "Sprint 12".to_string(),
            join_code: "a1b2c3d4".to_string(),
            created_by: UserId::from("u1"),
            created_at: now,
            timer_settings: TimerSettings {
                duration: 10,
                enabled: true,
                start_time: now,
                visible: false,
            },
            columns,
        }
    }

    #[test]
    fn document_uses_persisted_field_names() {
        let value = serde_json::to_value(sample_document()).expect("json");
        assert_eq!(value["joinCode"], "a1b2c3d4");
        assert_eq!(value["timerSettings"]["visible"], false);
        let columns = value["columns"].as_object().expect("columns map");
        assert_eq!(columns.len(), 3);
        assert_eq!(columns["to-improve"]["id"], "to-improve");
        let item = &columns["to-improve"]["items"][0];
        assert_eq!(item["createdBy"], "u1");
        assert_eq!(item["reactions"]["u2"], true);
        assert!(item.get("action").is_none());
        assert!(item.get("isNew").is_none());
    }

    #[test]
    fn item_without_ledgers_deserializes_with_empty_ones() {
        let item: Item = serde_json::from_value(serde_json::json!({
            "id": "x",
            "text": "hello",
            "createdBy": "u1",
            "createdAt": "2024-03-01T10:00:00Z",
            "isNew": true
        }))
        .expect("item");
        assert!(item.reactions.is_empty());
        assert!(item.dislikes.is_empty());
        assert!(item.is_new);
    }

    #[test]
    fn board_flattens_document_next_to_id() {
        let board = Board {
            id: BoardId::from("b1"),
            doc: sample_document(),
        };
        let text = serde_json::to_string(&board).expect("json");
        let back: Board = serde_json::from_str(&text).expect("board");
        assert_eq!(back, board);
    }

    #[test]
    fn column_ids_parse_and_iterate_in_display_order() {
        assert_eq!("to-improve".parse::<ColumnId>(), Ok(ColumnId::ToImprove));
        assert!("backlog".parse::<ColumnId>().is_err());
        let order: Vec<_> = Columns::default().iter().map(|column| column.id).collect();
        assert_eq!(order, ColumnId::ALL.to_vec());
    }
}
