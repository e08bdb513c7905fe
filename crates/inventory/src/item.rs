use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kitroom_core::{DomainError, DomainResult, Entity, ItemId};

/// A unit-trackable piece of sports equipment.
///
/// `item_quantity` counts units currently not checked out. It is mutated by
/// request transitions (atomic deltas) and by direct admin edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub item_name: String,
    pub item_quantity: i64,
    pub sports_name: String,
    /// Globally unique.
    pub item_code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for adding an item to the catalog.
///
/// Every field defaults to empty so a missing field surfaces as a validation
/// error instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewItem {
    pub item_name: String,
    pub item_quantity: Option<i64>,
    pub sports_name: String,
    pub item_code: String,
}

impl NewItem {
    pub fn new(
        item_name: impl Into<String>,
        item_quantity: i64,
        sports_name: impl Into<String>,
        item_code: impl Into<String>,
    ) -> Self {
        Self {
            item_name: item_name.into(),
            item_quantity: Some(item_quantity),
            sports_name: sports_name.into(),
            item_code: item_code.into(),
        }
    }

    /// Validate and materialize into an active item record.
    pub fn into_item(self, id: ItemId, now: DateTime<Utc>) -> DomainResult<Item> {
        let missing: Vec<&str> = [
            ("itemName", self.item_name.trim().is_empty()),
            ("itemQuantity", self.item_quantity.is_none()),
            ("sportsName", self.sports_name.trim().is_empty()),
            ("itemCode", self.item_code.trim().is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, absent)| absent.then_some(field))
        .collect();

        if !missing.is_empty() {
            return Err(DomainError::validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        let item_quantity = self.item_quantity.unwrap_or_default();
        if item_quantity < 0 {
            return Err(DomainError::validation("itemQuantity cannot be negative"));
        }

        Ok(Item {
            id,
            item_name: self.item_name.trim().to_string(),
            item_quantity,
            sports_name: self.sports_name.trim().to_string(),
            item_code: self.item_code.trim().to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of an item's descriptive fields and quantity.
///
/// `is_active` is toggled through its own operation, never through a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemPatch {
    pub item_name: Option<String>,
    pub item_quantity: Option<i64>,
    pub sports_name: Option<String>,
    pub item_code: Option<String>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.item_name.is_none()
            && self.item_quantity.is_none()
            && self.sports_name.is_none()
            && self.item_code.is_none()
    }

    /// Reject blank strings and negative quantities; trims what it keeps.
    pub fn validated(self) -> DomainResult<Self> {
        fn non_blank(field: &str, value: Option<String>) -> DomainResult<Option<String>> {
            match value {
                Some(v) if v.trim().is_empty() => {
                    Err(DomainError::validation(format!("{field} cannot be empty")))
                }
                Some(v) => Ok(Some(v.trim().to_string())),
                None => Ok(None),
            }
        }

        if matches!(self.item_quantity, Some(q) if q < 0) {
            return Err(DomainError::validation("itemQuantity cannot be negative"));
        }

        Ok(Self {
            item_name: non_blank("itemName", self.item_name)?,
            item_quantity: self.item_quantity,
            sports_name: non_blank("sportsName", self.sports_name)?,
            item_code: non_blank("itemCode", self.item_code)?,
        })
    }

    /// Apply onto a record, bumping `updated_at`.
    pub fn apply_to(&self, item: &mut Item, now: DateTime<Utc>) {
        if let Some(name) = &self.item_name {
            item.item_name = name.clone();
        }
        if let Some(quantity) = self.item_quantity {
            item.item_quantity = quantity;
        }
        if let Some(sport) = &self.sports_name {
            item.sports_name = sport.clone();
        }
        if let Some(code) = &self.item_code {
            item.item_code = code.clone();
        }
        item.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basketball() -> NewItem {
        NewItem::new("Basketball", 5, "Basketball", "BB-001")
    }

    #[test]
    fn new_item_is_active_with_matching_timestamps() {
        let now = Utc::now();
        let item = basketball().into_item(ItemId::new(), now).unwrap();
        assert!(item.is_active);
        assert_eq!(item.item_quantity, 5);
        assert_eq!(item.created_at, now);
        assert_eq!(item.updated_at, now);
    }

    #[test]
    fn new_item_lists_every_missing_field() {
        let err = NewItem {
            item_name: "  ".to_string(),
            item_quantity: None,
            sports_name: "Tennis".to_string(),
            item_code: String::new(),
        }
        .into_item(ItemId::new(), Utc::now())
        .unwrap_err();

        assert_eq!(
            err,
            DomainError::validation("missing required fields: itemName, itemQuantity, itemCode")
        );
    }

    #[test]
    fn new_item_rejects_negative_quantity() {
        let mut input = basketball();
        input.item_quantity = Some(-1);
        let err = input.into_item(ItemId::new(), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn new_item_accepts_zero_quantity() {
        let mut input = basketball();
        input.item_quantity = Some(0);
        let item = input.into_item(ItemId::new(), Utc::now()).unwrap();
        assert_eq!(item.item_quantity, 0);
    }

    #[test]
    fn new_item_trims_code() {
        let mut input = basketball();
        input.item_code = "  BB-009 ".to_string();
        let item = input.into_item(ItemId::new(), Utc::now()).unwrap();
        assert_eq!(item.item_code, "BB-009");
    }

    #[test]
    fn missing_json_fields_deserialize_as_blank() {
        let input: NewItem = serde_json::from_str(r#"{"itemName":"Bat"}"#).unwrap();
        assert_eq!(input.item_quantity, None);
        assert!(input.item_code.is_empty());
    }

    #[test]
    fn patch_rejects_blank_code() {
        let patch = ItemPatch {
            item_code: Some(" ".to_string()),
            ..ItemPatch::default()
        };
        assert!(patch.validated().is_err());
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let now = Utc::now();
        let mut item = basketball().into_item(ItemId::new(), now).unwrap();
        let later = now + chrono::Duration::seconds(5);

        let patch = ItemPatch {
            item_quantity: Some(9),
            ..ItemPatch::default()
        }
        .validated()
        .unwrap();
        patch.apply_to(&mut item, later);

        assert_eq!(item.item_quantity, 9);
        assert_eq!(item.item_code, "BB-001");
        assert_eq!(item.updated_at, later);
        assert_eq!(item.created_at, now);
    }

    #[test]
    fn item_serializes_with_camel_case_fields() {
        let item = basketball().into_item(ItemId::new(), Utc::now()).unwrap();
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["itemCode"], "BB-001");
        assert_eq!(json["itemQuantity"], 5);
        assert_eq!(json["isActive"], true);
    }
}
