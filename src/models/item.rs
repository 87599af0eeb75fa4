use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Lost,
    Found,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Lost => "lost",
            ItemType::Found => "found",
        }
    }

    /// Lost items are matched against found ones and vice versa.
    pub fn opposite(&self) -> ItemType {
        match self {
            ItemType::Lost => ItemType::Found,
            ItemType::Found => ItemType::Lost,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lost" => Ok(ItemType::Lost),
            "found" => Ok(ItemType::Found),
            other => Err(AppError::InvalidInput(format!(
                "item type must be 'lost' or 'found', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Searching,
    Resolved,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Searching => "searching",
            ItemStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "searching" => Ok(ItemStatus::Searching),
            "resolved" => Ok(ItemStatus::Resolved),
            other => Err(AppError::InvalidInput(format!(
                "status must be 'searching' or 'resolved', got '{}'",
                other
            ))),
        }
    }
}

/// A lost or found listing. Serialized in the camelCase shape used by the
/// local fallback store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub category: String,
    pub location: String,
    pub date: String,
    #[serde(default)]
    pub description: String,
    pub image_url: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub contact_info: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub status: ItemStatus,
}

impl Item {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Row shape of the `items` table.
#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    pub id: String,
    pub item_type: String,
    pub name: String,
    pub category: String,
    pub location: String,
    pub date: String,
    pub description: String,
    pub image_url: String,
    pub user_id: String,
    pub user_name: String,
    pub contact_info: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for Item {
    type Error = AppError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let item_type = row
            .item_type
            .parse()
            .map_err(|_| AppError::Internal(format!("Corrupt item_type on item {}", row.id)))?;
        let status = row
            .status
            .parse()
            .map_err(|_| AppError::Internal(format!("Corrupt status on item {}", row.id)))?;
        Ok(Item {
            id: row.id,
            name: row.name,
            category: row.category,
            location: row.location,
            date: row.date,
            description: row.description,
            image_url: row.image_url,
            user_id: row.user_id,
            user_name: row.user_name,
            contact_info: row.contact_info,
            created_at: row.created_at,
            item_type,
            status,
        })
    }
}

/// Raw image attached to a new listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Form data submitted when posting a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub category: String,
    pub location: String,
    pub date: String,
    pub description: String,
    pub contact_info: String,
    pub image: Option<ImageUpload>,
}
