//! Sums and counts of a user's expenses over an inclusive date window.
//!
//! Every function here only looks at the expenses owned by the given user.
//! A window whose start is after its end is empty: totals are zero and
//! groupings are empty, and the database is not queried.

use std::{collections::HashMap, ops::RangeInclusive};

use rusqlite::{Connection, named_params};
use time::Date;

use crate::{
    Amount, Error, UserID, category::UNCATEGORIZED_LABEL, date_range::days_in,
};

/// The total spent in one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    /// The category name, or "Uncategorized".
    pub label: String,
    pub total: Amount,
}

/// The total spent in one category and how many expenses make up that total.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotalWithCount {
    /// The category name, or "Uncategorized".
    pub label: String,
    pub total: Amount,
    pub count: u32,
}

impl CategoryTotalWithCount {
    /// The mean expense amount in this category.
    pub fn average(&self) -> Amount {
        average_expense(self.total, self.count)
    }
}

/// The total spent on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayTotal {
    pub date: Date,
    pub total: Amount,
}

fn is_empty(window: &RangeInclusive<Date>) -> bool {
    window.start() > window.end()
}

/// The sum of the user's expenses dated within `window`.
///
/// Returns zero if there are no matching expenses.
///
/// # Errors
/// Returns an [Error::SqlError] if the query fails.
pub fn total_for_period(
    user_id: UserID,
    window: &RangeInclusive<Date>,
    connection: &Connection,
) -> Result<Amount, Error> {
    if is_empty(window) {
        return Ok(Amount::zero());
    }

    connection
        .query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM expense
            WHERE user_id = :user_id AND date BETWEEN :start AND :end",
            named_params! {
                ":user_id": user_id.as_i64(),
                ":start": window.start(),
                ":end": window.end(),
            },
            |row| row.get(0),
        )
        .map_err(Error::from)
}

/// The sum of all of the user's expenses.
///
/// # Errors
/// Returns an [Error::SqlError] if the query fails.
pub fn total_all_time(user_id: UserID, connection: &Connection) -> Result<Amount, Error> {
    connection
        .query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM expense WHERE user_id = ?1",
            [user_id.as_i64()],
            |row| row.get(0),
        )
        .map_err(Error::from)
}

/// The user's spending in `window` grouped by category name.
///
/// Sorted by total, largest first, with ties sorted by name.
///
/// # Errors
/// Returns an [Error::SqlError] if the query fails.
pub fn group_by_category(
    user_id: UserID,
    window: &RangeInclusive<Date>,
    connection: &Connection,
) -> Result<Vec<CategoryTotal>, Error> {
    Ok(group_by_category_with_count(user_id, window, connection)?
        .into_iter()
        .map(|group| CategoryTotal {
            label: group.label,
            total: group.total,
        })
        .collect())
}

/// Like [group_by_category], but also counts the expenses in each group.
///
/// # Errors
/// Returns an [Error::SqlError] if the query fails.
pub fn group_by_category_with_count(
    user_id: UserID,
    window: &RangeInclusive<Date>,
    connection: &Connection,
) -> Result<Vec<CategoryTotalWithCount>, Error> {
    if is_empty(window) {
        return Ok(Vec::new());
    }

    connection
        .prepare(
            "SELECT
                COALESCE(category.name, :uncategorized) AS label,
                SUM(expense.amount) AS total,
                COUNT(expense.id)
            FROM expense
            LEFT JOIN category ON category.id = expense.category_id
            WHERE expense.user_id = :user_id AND expense.date BETWEEN :start AND :end
            GROUP BY label
            ORDER BY total DESC, label ASC",
        )?
        .query_map(
            named_params! {
                ":uncategorized": UNCATEGORIZED_LABEL,
                ":user_id": user_id.as_i64(),
                ":start": window.start(),
                ":end": window.end(),
            },
            |row| {
                Ok(CategoryTotalWithCount {
                    label: row.get(0)?,
                    total: row.get(1)?,
                    count: row.get(2)?,
                })
            },
        )?
        .map(|maybe_group| maybe_group.map_err(Error::from))
        .collect()
}

/// The user's spending on each day of `window`, oldest first.
///
/// Days without expenses are included with a total of zero, so the result
/// always has one entry per day in the window.
///
/// # Errors
/// Returns an [Error::SqlError] if the query fails.
pub fn group_by_day(
    user_id: UserID,
    window: &RangeInclusive<Date>,
    connection: &Connection,
) -> Result<Vec<DayTotal>, Error> {
    if is_empty(window) {
        return Ok(Vec::new());
    }

    let totals_by_date: HashMap<Date, Amount> = connection
        .prepare(
            "SELECT date, SUM(amount) FROM expense
            WHERE user_id = :user_id AND date BETWEEN :start AND :end
            GROUP BY date",
        )?
        .query_map(
            named_params! {
                ":user_id": user_id.as_i64(),
                ":start": window.start(),
                ":end": window.end(),
            },
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?
        .collect::<Result<_, rusqlite::Error>>()?;

    Ok(days_in(window)
        .map(|date| DayTotal {
            date,
            total: totals_by_date
                .get(&date)
                .copied()
                .unwrap_or_else(Amount::zero),
        })
        .collect())
}

/// The mean of `count` expenses that add up to `total`, or zero if there are none.
pub fn average_expense(total: Amount, count: u32) -> Amount {
    Amount::average(total, count)
}
