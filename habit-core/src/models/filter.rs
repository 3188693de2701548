//! Habit list filtering and sorting

use std::cmp::Ordering;

use super::habit::string_enum;
use super::{Habit, HabitCategory};

/// Longest free-text search accepted
pub const MAX_SEARCH_LEN: usize = 100;

string_enum!(
    /// Sortable habit fields
    HabitSort, "sort", {
        Name => "name",
        CreatedAt => "createdat",
        UpdatedAt => "updatedat",
        Streak => "streak",
        LongestStreak => "longeststreak",
        Category => "category",
    }
);

impl HabitSort {
    /// Accepts `createdAt`, `created_at` and `created-at` alike.
    pub fn parse_loose(s: &str) -> Result<Self, super::ValidationError> {
        let compact: String = s.chars().filter(|c| *c != '_' && *c != '-').collect();
        Self::parse(&compact)
    }

    /// Column used by the SQL repository.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Streak => "streak",
            Self::LongestStreak => "longest_streak",
            Self::Category => "category",
        }
    }
}

string_enum!(
    /// Sort direction
    SortOrder, "order", {
        Asc => "asc",
        Desc => "desc",
    }
);

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Validated habit list query
#[derive(Debug, Clone, PartialEq)]
pub struct HabitFilter {
    pub category: Option<HabitCategory>,
    pub active: Option<bool>,
    /// `None` hides archived habits
    pub archived: Option<bool>,
    pub search: Option<String>,
    pub sort: HabitSort,
    pub order: SortOrder,
}

impl Default for HabitFilter {
    fn default() -> Self {
        Self {
            category: None,
            active: None,
            archived: None,
            search: None,
            sort: HabitSort::CreatedAt,
            order: SortOrder::Desc,
        }
    }
}

impl HabitFilter {
    /// In-memory equivalent of the SQL WHERE clause.
    pub fn matches(&self, habit: &Habit) -> bool {
        if let Some(category) = self.category {
            if habit.category != category {
                return false;
            }
        }
        if let Some(active) = self.active {
            if habit.is_active != active {
                return false;
            }
        }
        if habit.is_archived != self.archived.unwrap_or(false) {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = |s: &str| s.to_lowercase().contains(&needle);
            let found = hit(&habit.name)
                || habit.description.as_deref().is_some_and(hit)
                || habit.notes.as_deref().is_some_and(hit);
            if !found {
                return false;
            }
        }
        true
    }

    /// In-memory equivalent of the SQL ORDER BY clause (id breaks ties).
    pub fn compare(&self, a: &Habit, b: &Habit) -> Ordering {
        let ord = match self.sort {
            HabitSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            HabitSort::CreatedAt => a.created_at.cmp(&b.created_at),
            HabitSort::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            HabitSort::Streak => a.streak.cmp(&b.streak),
            HabitSort::LongestStreak => a.longest_streak.cmp(&b.longest_streak),
            HabitSort::Category => a.category.as_str().cmp(b.category.as_str()),
        }
        .then_with(|| a.id.cmp(&b.id));

        match self.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_accepts_js_and_sql_names() {
        assert_eq!(HabitSort::parse_loose("createdAt").unwrap(), HabitSort::CreatedAt);
        assert_eq!(
            HabitSort::parse_loose("longest_streak").unwrap(),
            HabitSort::LongestStreak
        );
        assert!(HabitSort::parse_loose("color").is_err());
    }

    #[test]
    fn default_hides_archived() {
        let filter = HabitFilter::default();
        assert_eq!(filter.archived, None);
        assert_eq!(filter.order, SortOrder::Desc);
    }
}
