//! Status/category filtered views.

use crate::model::task::{Category, Task, UnknownCategory};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Completion-state filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    /// Incomplete tasks only.
    Active,
    /// Completed tasks only.
    Done,
}

impl StatusFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Active => !task.completed,
            Self::Done => task.completed,
        }
    }
}

/// Error for filter labels outside the accepted set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidFilter(pub String);

impl Display for InvalidFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid filter `{}`", self.0)
    }
}

impl std::error::Error for InvalidFilter {}

impl From<UnknownCategory> for InvalidFilter {
    fn from(value: UnknownCategory) -> Self {
        Self(value.0)
    }
}

impl FromStr for StatusFilter {
    type Err = InvalidFilter;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "done" => Ok(Self::Done),
            other => Err(InvalidFilter(other.to_string())),
        }
    }
}

/// Category filter: everything, or one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Only(category) => task.category == category,
        }
    }
}

impl From<Category> for CategoryFilter {
    fn from(value: Category) -> Self {
        Self::Only(value)
    }
}

impl FromStr for CategoryFilter {
    type Err = InvalidFilter;

    /// Accepts `all` or any category label, case-insensitively.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        Ok(Self::Only(value.parse::<Category>()?))
    }
}

/// Returns the tasks passing both filters, in collection order.
pub fn filter_tasks(tasks: &[Task], status: StatusFilter, category: CategoryFilter) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| status.matches(task) && category.matches(task))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{CategoryFilter, StatusFilter};
    use crate::model::task::Category;

    #[test]
    fn filter_labels_parse() {
        assert_eq!("Active".parse::<StatusFilter>().unwrap(), StatusFilter::Active);
        assert_eq!("all".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "study".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Only(Category::Study)
        );
        assert!("archived".parse::<StatusFilter>().is_err());
        assert!("chores".parse::<CategoryFilter>().is_err());
    }
}
