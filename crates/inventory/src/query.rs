use serde::{Deserialize, Serialize};

use crate::item::Item;

/// Read-side item filter.
///
/// Requesters only ever see active items; the admin equipment search narrows
/// by a case-insensitive substring of `sportsName`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemQuery {
    pub active_only: bool,
    pub sport: Option<String>,
}

impl ItemQuery {
    /// Filter used when building a request: active items, any sport.
    pub fn requestable() -> Self {
        Self {
            active_only: true,
            sport: None,
        }
    }

    pub fn with_sport(mut self, sport: impl Into<String>) -> Self {
        self.sport = Some(sport.into());
        self
    }

    /// Normalized search needle; blank searches match everything.
    pub fn sport_needle(&self) -> Option<String> {
        self.sport
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, item: &Item) -> bool {
        if self.active_only && !item.is_active {
            return false;
        }
        match self.sport_needle() {
            Some(needle) => item.sports_name.to_lowercase().contains(&needle),
            None => true,
        }
    }

    /// Filter and order newest-first (ties broken by id, also newest-first).
    pub fn apply<I>(&self, items: I) -> Vec<Item>
    where
        I: IntoIterator<Item = Item>,
    {
        let mut out: Vec<Item> = items.into_iter().filter(|i| self.matches(i)).collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use kitroom_core::ItemId;

    use crate::item::NewItem;

    fn item(name: &str, sport: &str, code: &str, active: bool, age_secs: i64) -> Item {
        let created = Utc::now() - Duration::seconds(age_secs);
        let mut item = NewItem::new(name, 3, sport, code)
            .into_item(ItemId::new(), created)
            .unwrap();
        item.is_active = active;
        item
    }

    #[test]
    fn default_query_returns_everything_newest_first() {
        let old = item("Racket", "Tennis", "TN-1", true, 100);
        let new = item("Ball", "Cricket", "CR-1", false, 1);
        let out = ItemQuery::default().apply(vec![old.clone(), new.clone()]);
        assert_eq!(out, vec![new, old]);
    }

    #[test]
    fn requestable_hides_inactive_items() {
        let active = item("Racket", "Tennis", "TN-1", true, 10);
        let hidden = item("Net", "Tennis", "TN-2", false, 5);
        let out = ItemQuery::requestable().apply(vec![active.clone(), hidden]);
        assert_eq!(out, vec![active]);
    }

    #[test]
    fn sport_search_is_case_insensitive_substring() {
        let table = item("Paddle", "Table Tennis", "TT-1", true, 3);
        let lawn = item("Racket", "Tennis", "TN-1", true, 2);
        let foot = item("Ball", "Football", "FB-1", true, 1);
        let out = ItemQuery::default()
            .with_sport("TENN")
            .apply(vec![table.clone(), lawn.clone(), foot]);
        assert_eq!(out, vec![lawn, table]);
    }

    #[test]
    fn blank_sport_search_matches_all() {
        let q = ItemQuery::default().with_sport("   ");
        assert_eq!(q.sport_needle(), None);
        assert!(q.matches(&item("Ball", "Football", "FB-1", true, 1)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any case variant of a substring of the sport matches.
            #[test]
            fn substring_in_any_case_matches(
                sport in "[A-Za-z ]{1,24}",
                start in 0usize..24,
                len in 1usize..24,
                upper in any::<bool>(),
            ) {
                let it = item("Thing", &sport, "X-1", true, 0);
                let start = start.min(sport.len() - 1);
                let end = (start + len).min(sport.len());
                let slice = &sport[start..end];
                prop_assume!(!slice.trim().is_empty());
                let needle = if upper { slice.to_uppercase() } else { slice.to_lowercase() };

                let q = ItemQuery::default().with_sport(needle.trim().to_string());
                prop_assert!(q.matches(&it));
            }

            /// Property: active_only never lets an inactive item through.
            #[test]
            fn active_only_is_a_hard_filter(sport in "[a-z]{1,8}", active in any::<bool>()) {
                let it = item("Thing", &sport, "X-1", active, 0);
                prop_assert_eq!(ItemQuery::requestable().matches(&it), active);
            }
        }
    }
}
