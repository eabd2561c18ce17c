//! Defines the core data models and database queries for expenses.

use std::ops::RangeInclusive;

use rusqlite::{Connection, Row, named_params};
use time::{Date, Month, OffsetDateTime};

use crate::{
    Amount, Error, UserID,
    category::{CategoryId, UNCATEGORIZED_LABEL},
    date_range::month_range,
};

// ============================================================================
// MODELS
// ============================================================================

/// Database identifier for an expense.
pub type ExpenseId = i64;

/// The most characters an expense description may have.
pub const DESCRIPTION_MAX_LENGTH: usize = 500;

/// The details of an expense to create, or to replace an existing expense's details with.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    /// The user who spent the money.
    pub user_id: UserID,
    /// How much was spent.
    pub amount: Amount,
    /// The category the expense is filed under, if any.
    pub category_id: Option<CategoryId>,
    /// What the money was spent on. May be empty.
    pub description: String,
    /// When the money was spent.
    pub date: Date,
}

/// An expense as stored in the database.
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: ExpenseId,
    pub user_id: UserID,
    pub amount: Amount,
    pub category_id: Option<CategoryId>,
    pub description: String,
    pub date: Date,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// An expense joined with the name of its category, for lists and reports.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseRow {
    pub id: ExpenseId,
    pub amount: Amount,
    pub date: Date,
    pub description: String,
    pub category_id: Option<CategoryId>,
    /// The category's name, or "Uncategorized" if the expense has no category.
    pub category_label: String,
}

/// Narrows down which of a user's expenses [query_expenses] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExpenseFilter {
    pub category_id: Option<CategoryId>,
    pub month: Option<Month>,
    pub year: Option<i32>,
}

impl ExpenseFilter {
    /// The dates to include, only when both the month and year are set.
    pub fn date_range(&self) -> Option<RangeInclusive<Date>> {
        match (self.month, self.year) {
            (Some(month), Some(year)) => month_range(year, month),
            _ => None,
        }
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new expense in the database.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if the category ID does not refer to a real category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_expense(expense: NewExpense, connection: &Connection) -> Result<Expense, Error> {
    let now = OffsetDateTime::now_utc();

    connection
        .prepare(
            "INSERT INTO expense (user_id, amount, category_id, description, date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             RETURNING id, user_id, amount, category_id, description, date, created_at, updated_at",
        )?
        .query_row(
            (
                expense.user_id.as_i64(),
                expense.amount,
                expense.category_id,
                &expense.description,
                expense.date,
                now,
            ),
            map_expense_row,
        )
        .map_err(|error| map_foreign_key_error(error, expense.category_id))
}

/// Retrieve one of `user_id`'s expenses by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to an expense owned by `user_id`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_expense(
    id: ExpenseId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Expense, Error> {
    connection
        .prepare(
            "SELECT id, user_id, amount, category_id, description, date, created_at, updated_at
             FROM expense WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            named_params! {":id": id, ":user_id": user_id.as_i64()},
            map_expense_row,
        )
        .map_err(|error| error.into())
}

/// Replace the details of the expense `id` and bump its `updated_at` time.
///
/// The expense must belong to `expense.user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingExpense] if `id` does not refer to an expense owned by the user,
/// - [Error::InvalidCategory] if the category ID does not refer to a real category,
/// - or [Error::SqlError] there is some other SQL error.
pub fn update_expense(
    id: ExpenseId,
    expense: &NewExpense,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection
        .execute(
            "UPDATE expense
            SET amount = ?1, category_id = ?2, description = ?3, date = ?4, updated_at = ?5
            WHERE id = ?6 AND user_id = ?7",
            (
                expense.amount,
                expense.category_id,
                &expense.description,
                expense.date,
                OffsetDateTime::now_utc(),
                id,
                expense.user_id.as_i64(),
            ),
        )
        .map_err(|error| map_foreign_key_error(error, expense.category_id))?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingExpense);
    }

    Ok(())
}

/// Delete one of `user_id`'s expenses.
///
/// # Errors
/// Returns [Error::DeleteMissingExpense] if `id` does not refer to an expense owned by `user_id`.
pub fn delete_expense(id: ExpenseId, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM expense WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingExpense);
    }

    Ok(())
}

const SELECT_EXPENSE_ROW: &str = "SELECT
        expense.id,
        expense.amount,
        expense.date,
        expense.description,
        expense.category_id,
        COALESCE(category.name, :uncategorized)
    FROM expense
    LEFT JOIN category ON category.id = expense.category_id";

const EXPENSE_ORDER: &str = "ORDER BY expense.date DESC, expense.created_at DESC, expense.id DESC";

/// Get `user_id`'s expenses that match `filter`, most recent first.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn query_expenses(
    user_id: UserID,
    filter: &ExpenseFilter,
    connection: &Connection,
) -> Result<Vec<ExpenseRow>, Error> {
    let date_range = filter.date_range();
    let start = date_range.as_ref().map(|range| *range.start());
    let end = date_range.as_ref().map(|range| *range.end());

    connection
        .prepare(&format!(
            "{SELECT_EXPENSE_ROW}
            WHERE expense.user_id = :user_id
                AND (:category_id IS NULL OR expense.category_id = :category_id)
                AND (:start IS NULL OR expense.date BETWEEN :start AND :end)
            {EXPENSE_ORDER}"
        ))?
        .query_map(
            named_params! {
                ":uncategorized": UNCATEGORIZED_LABEL,
                ":user_id": user_id.as_i64(),
                ":category_id": filter.category_id,
                ":start": start,
                ":end": end,
            },
            map_expense_row_with_label,
        )?
        .map(|maybe_row| maybe_row.map_err(|error| error.into()))
        .collect()
}

/// Get `user_id`'s `limit` most recent expenses.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_recent_expenses(
    user_id: UserID,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<ExpenseRow>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_EXPENSE_ROW}
            WHERE expense.user_id = :user_id
            {EXPENSE_ORDER}
            LIMIT :limit"
        ))?
        .query_map(
            named_params! {
                ":uncategorized": UNCATEGORIZED_LABEL,
                ":user_id": user_id.as_i64(),
                ":limit": limit,
            },
            map_expense_row_with_label,
        )?
        .map(|maybe_row| maybe_row.map_err(|error| error.into()))
        .collect()
}

/// Create the expense table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS expense (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            amount INTEGER NOT NULL,
            category_id INTEGER REFERENCES category(id) ON DELETE SET NULL,
            description TEXT NOT NULL DEFAULT '' CHECK (length(description) <= 500),
            date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_expense_user_date ON expense(user_id, date);
        CREATE INDEX IF NOT EXISTS idx_expense_user_category ON expense(user_id, category_id);",
    )?;

    Ok(())
}

fn map_foreign_key_error(error: rusqlite::Error, category_id: Option<CategoryId>) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        ) => Error::InvalidCategory(category_id),
        error => error.into(),
    }
}

fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    Ok(Expense {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        amount: row.get(2)?,
        category_id: row.get(3)?,
        description: row.get(4)?,
        date: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn map_expense_row_with_label(row: &Row) -> Result<ExpenseRow, rusqlite::Error> {
    Ok(ExpenseRow {
        id: row.get(0)?,
        amount: row.get(1)?,
        date: row.get(2)?,
        description: row.get(3)?,
        category_id: row.get(4)?,
        category_label: row.get(5)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::{Date, Month, macros::date};

    use crate::{
        Amount, Error, User,
        category::{CategoryName, create_custom_category, delete_custom_category},
        expense::{
            ExpenseFilter, NewExpense, create_expense, delete_expense, get_expense,
            get_recent_expenses, query_expenses, update_expense,
        },
        test_utils::{create_test_user, get_test_connection},
    };

    fn new_expense(user: &User, cents: i64, date: Date) -> NewExpense {
        NewExpense {
            user_id: user.id,
            amount: Amount::from_cents(cents),
            category_id: None,
            description: format!("expense on {date}"),
            date,
        }
    }

    fn setup() -> (Connection, User) {
        let connection = get_test_connection();
        let user = create_test_user(&connection, "alice");
        (connection, user)
    }

    #[test]
    fn create_succeeds() {
        let (connection, user) = setup();

        let expense = create_expense(new_expense(&user, 1230, date!(2025 - 10 - 05)), &connection)
            .expect("Could not create expense");

        assert!(expense.id > 0);
        assert_eq!(expense.amount, Amount::from_cents(1230));
        assert_eq!(expense.user_id, user.id);
        assert_eq!(expense.created_at, expense.updated_at);
        let fetched = get_expense(expense.id, user.id, &connection).unwrap();
        assert_eq!(fetched.id, expense.id);
        assert_eq!(fetched.description, expense.description);
        assert_eq!(fetched.date, expense.date);
    }

    #[test]
    fn create_fails_on_invalid_category_id() {
        let (connection, user) = setup();
        let expense = NewExpense {
            category_id: Some(42),
            ..new_expense(&user, 100, date!(2025 - 10 - 05))
        };

        let result = create_expense(expense, &connection);

        assert_eq!(result, Err(Error::InvalidCategory(Some(42))));
    }

    #[test]
    fn get_expense_of_other_user_is_not_found() {
        let (connection, alice) = setup();
        let bob = create_test_user(&connection, "bob");
        let expense =
            create_expense(new_expense(&alice, 100, date!(2025 - 10 - 05)), &connection).unwrap();

        assert_eq!(get_expense(expense.id, bob.id, &connection), Err(Error::NotFound));
    }

    #[test]
    fn update_replaces_details() {
        let (connection, user) = setup();
        let expense =
            create_expense(new_expense(&user, 100, date!(2025 - 10 - 05)), &connection).unwrap();
        let changes = NewExpense {
            description: "Updated".to_owned(),
            ..new_expense(&user, 250, date!(2025 - 10 - 06))
        };

        update_expense(expense.id, &changes, &connection).unwrap();

        let updated = get_expense(expense.id, user.id, &connection).unwrap();
        assert_eq!(updated.amount, Amount::from_cents(250));
        assert_eq!(updated.date, date!(2025 - 10 - 06));
        assert_eq!(updated.description, "Updated");
        assert_eq!(updated.created_at, expense.created_at);
        assert!(updated.updated_at >= expense.updated_at);
    }

    #[test]
    fn update_other_users_expense_fails() {
        let (connection, alice) = setup();
        let bob = create_test_user(&connection, "bob");
        let expense =
            create_expense(new_expense(&alice, 100, date!(2025 - 10 - 05)), &connection).unwrap();

        let result = update_expense(
            expense.id,
            &new_expense(&bob, 999, date!(2025 - 10 - 05)),
            &connection,
        );

        assert_eq!(result, Err(Error::UpdateMissingExpense));
        assert_eq!(
            get_expense(expense.id, alice.id, &connection).unwrap().amount,
            Amount::from_cents(100)
        );
    }

    #[test]
    fn delete_succeeds_and_is_scoped_to_owner() {
        let (connection, alice) = setup();
        let bob = create_test_user(&connection, "bob");
        let expense =
            create_expense(new_expense(&alice, 100, date!(2025 - 10 - 05)), &connection).unwrap();

        assert_eq!(
            delete_expense(expense.id, bob.id, &connection),
            Err(Error::DeleteMissingExpense)
        );
        assert_eq!(delete_expense(expense.id, alice.id, &connection), Ok(()));
        assert_eq!(
            delete_expense(expense.id, alice.id, &connection),
            Err(Error::DeleteMissingExpense)
        );
    }

    #[test]
    fn query_orders_by_most_recent_date_then_creation() {
        let (connection, user) = setup();
        let older = create_expense(new_expense(&user, 100, date!(2024 - 01 - 01)), &connection)
            .unwrap();
        let first = create_expense(new_expense(&user, 200, date!(2024 - 01 - 02)), &connection)
            .unwrap();
        let second = create_expense(new_expense(&user, 300, date!(2024 - 01 - 02)), &connection)
            .unwrap();

        let ids = query_expenses(user.id, &ExpenseFilter::default(), &connection)
            .unwrap()
            .into_iter()
            .map(|row| row.id)
            .collect::<Vec<_>>();

        assert_eq!(ids, vec![second.id, first.id, older.id]);
    }

    #[test]
    fn query_filters_by_category_and_month() {
        let (connection, user) = setup();
        let bob = create_test_user(&connection, "bob");
        let coffee =
            create_custom_category(CategoryName::new_unchecked("Coffee"), user.id, &connection)
                .unwrap();
        let in_january = create_expense(
            NewExpense {
                category_id: Some(coffee.id),
                ..new_expense(&user, 450, date!(2024 - 01 - 31))
            },
            &connection,
        )
        .unwrap();
        create_expense(
            NewExpense {
                category_id: Some(coffee.id),
                ..new_expense(&user, 500, date!(2024 - 02 - 01))
            },
            &connection,
        )
        .unwrap();
        create_expense(new_expense(&user, 600, date!(2024 - 01 - 15)), &connection).unwrap();
        create_expense(new_expense(&bob, 700, date!(2024 - 01 - 15)), &connection).unwrap();

        let rows = query_expenses(
            user.id,
            &ExpenseFilter {
                category_id: Some(coffee.id),
                month: Some(Month::January),
                year: Some(2024),
            },
            &connection,
        )
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, in_january.id);
        assert_eq!(rows[0].category_label, "Coffee");
    }

    #[test]
    fn query_ignores_month_without_year() {
        let (connection, user) = setup();
        create_expense(new_expense(&user, 100, date!(2024 - 01 - 15)), &connection).unwrap();
        create_expense(new_expense(&user, 100, date!(2024 - 02 - 15)), &connection).unwrap();

        let rows = query_expenses(
            user.id,
            &ExpenseFilter {
                month: Some(Month::January),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn deleted_category_is_labelled_uncategorized() {
        let (connection, user) = setup();
        let coffee =
            create_custom_category(CategoryName::new_unchecked("Coffee"), user.id, &connection)
                .unwrap();
        create_expense(
            NewExpense {
                category_id: Some(coffee.id),
                ..new_expense(&user, 450, date!(2024 - 01 - 31))
            },
            &connection,
        )
        .unwrap();

        delete_custom_category(coffee.id, user.id, &connection).unwrap();

        let rows = query_expenses(user.id, &ExpenseFilter::default(), &connection).unwrap();
        assert_eq!(rows[0].category_id, None);
        assert_eq!(rows[0].category_label, "Uncategorized");
    }

    #[test]
    fn recent_expenses_are_limited() {
        let (connection, user) = setup();
        for day in 1..=7 {
            let date = Date::from_calendar_date(2024, Month::March, day).unwrap();
            create_expense(new_expense(&user, 100, date), &connection).unwrap();
        }

        let recent = get_recent_expenses(user.id, 5, &connection).unwrap();

        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].date, date!(2024 - 03 - 07));
        assert_eq!(recent[4].date, date!(2024 - 03 - 03));
    }
}
