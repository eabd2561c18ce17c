//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, UserID};

/// The most characters a category name may have.
pub const CATEGORY_NAME_MAX_LENGTH: usize = 100;

/// The categories shared by every user, created once when the app starts.
pub const PREDEFINED_CATEGORIES: [&str; 9] = [
    "Food",
    "Transport",
    "Rent",
    "Entertainment",
    "Health",
    "Shopping",
    "Utilities",
    "Education",
    "Other",
];

/// The label used in lists, reports and charts for expenses without a category.
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is
    /// empty or only whitespace, or [Error::CategoryNameTooLong] if it has
    /// more than [CATEGORY_NAME_MAX_LENGTH] characters.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else if name.chars().count() > CATEGORY_NAME_MAX_LENGTH {
            Err(Error::CategoryNameTooLong(CATEGORY_NAME_MAX_LENGTH))
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty and not too long.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Database identifier for a category.
pub type CategoryId = i64;

/// A label for grouping expenses, e.g. 'Food' or 'Rent'.
///
/// Predefined categories have no owner and are available to every user.
/// Custom categories belong to, and may only be used by, their owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// The category's ID in the application database.
    pub id: CategoryId,
    /// The label shown in lists, forms and reports.
    pub name: CategoryName,
    /// The user who created the category, `None` for predefined categories.
    pub owner: Option<UserID>,
    /// Whether the category was seeded for every user.
    pub is_predefined: bool,
    /// When the category was created.
    pub created_at: OffsetDateTime,
}

/// Form data for category creation.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryFormData {
    /// The name as typed, before trimming and validation.
    pub name: String,
}
