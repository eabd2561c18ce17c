//! Database operations for categories.

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error, UserID,
    category::{Category, CategoryId, CategoryName, PREDEFINED_CATEGORIES},
};

const SELECT_CATEGORY: &str = "SELECT id, name, user_id, is_predefined, created_at FROM category";

/// Create a category owned by `owner` and return it with its generated ID.
///
/// # Errors
///
/// Returns [Error::DuplicateCategoryName] if `owner` already has a category called `name`.
pub fn create_custom_category(
    name: CategoryName,
    owner: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO category (name, user_id, is_predefined, created_at) VALUES (?1, ?2, 0, ?3);",
        (name.as_ref(), owner.as_i64(), created_at),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        name,
        owner: Some(owner),
        is_predefined: false,
        created_at,
    })
}

/// Retrieve a single category by ID.
///
/// # Errors
///
/// Returns [Error::NotFound] if there is no category with `category_id`.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare(&format!("{SELECT_CATEGORY} WHERE id = :id;"))?
        .query_row(&[(":id", &category_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve the predefined categories and the custom categories of `user_id`,
/// ordered alphabetically by name.
pub fn get_available_categories(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_CATEGORY} WHERE is_predefined = 1 OR user_id = :user_id ORDER BY name ASC, id ASC;"
        ))?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the categories shared by every user, ordered alphabetically by name.
pub fn get_predefined_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_CATEGORY} WHERE is_predefined = 1 ORDER BY name ASC, id ASC;"
        ))?
        .query_map([], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the categories created by `user_id`, ordered alphabetically by name.
pub fn get_custom_categories(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_CATEGORY} WHERE is_predefined = 0 AND user_id = :user_id ORDER BY name ASC, id ASC;"
        ))?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Delete a custom category owned by `user_id`.
///
/// Expenses in the category are kept and become uncategorized.
///
/// # Errors
///
/// Returns [Error::DeleteMissingCategory] if the category does not exist, is
/// predefined or belongs to another user.
pub fn delete_custom_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM category WHERE id = ?1 AND user_id = ?2 AND is_predefined = 0",
        (category_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

/// Whether `user_id` may file expenses under `category_id`, i.e. the category
/// is predefined or one of the user's own.
pub fn is_category_available(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT EXISTS(
                SELECT 1 FROM category
                WHERE id = ?1 AND (is_predefined = 1 OR user_id = ?2)
            );",
            (category_id, user_id.as_i64()),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Create any of [PREDEFINED_CATEGORIES] that do not exist yet.
///
/// Returns the number of categories created and the number that already existed.
pub fn seed_predefined_categories(connection: &Connection) -> Result<(usize, usize), Error> {
    let mut statement = connection.prepare(
        "INSERT OR IGNORE INTO category (name, user_id, is_predefined, created_at)
        VALUES (?1, NULL, 1, ?2);",
    )?;

    let mut created = 0;
    let mut existing = 0;

    for name in PREDEFINED_CATEGORIES {
        if statement.execute((name, OffsetDateTime::now_utc()))? == 1 {
            tracing::debug!("Created predefined category {name}");
            created += 1;
        } else {
            existing += 1;
        }
    }

    Ok((created, existing))
}

/// Initialize the category table and indexes.
///
/// The partial index makes predefined names unique, since SQLite treats each
/// NULL `user_id` in the composite UNIQUE constraint as distinct.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL CHECK (length(name) <= 100),
            user_id INTEGER REFERENCES user(id) ON DELETE CASCADE,
            is_predefined INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            UNIQUE(name, user_id)
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_category_predefined_name
            ON category(name) WHERE user_id IS NULL;
        CREATE INDEX IF NOT EXISTS idx_category_user_id ON category(user_id);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let owner = row.get::<_, Option<i64>>(2)?.map(UserID::new);
    let is_predefined = row.get(3)?;
    let created_at = row.get(4)?;

    Ok(Category {
        id,
        name: CategoryName::new_unchecked(&raw_name),
        owner,
        is_predefined,
        created_at,
    })
}

#[cfg(test)]
mod category_query_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        category::{
            CategoryName, PREDEFINED_CATEGORIES, create_custom_category, delete_custom_category,
            get_available_categories, get_category, get_custom_categories,
            get_predefined_categories, is_category_available, seed_predefined_categories,
        },
        test_utils::{create_test_user, get_test_connection},
    };

    fn get_seeded_connection() -> Connection {
        let connection = get_test_connection();
        seed_predefined_categories(&connection).expect("Could not seed categories");
        connection
    }

    #[test]
    fn seed_is_idempotent() {
        let connection = get_test_connection();

        let first = seed_predefined_categories(&connection).unwrap();
        let second = seed_predefined_categories(&connection).unwrap();

        assert_eq!(first, (PREDEFINED_CATEGORIES.len(), 0));
        assert_eq!(second, (0, PREDEFINED_CATEGORIES.len()));
        assert_eq!(
            get_predefined_categories(&connection).unwrap().len(),
            PREDEFINED_CATEGORIES.len()
        );
    }

    #[test]
    fn predefined_categories_are_sorted_by_name() {
        let connection = get_seeded_connection();

        let names = get_predefined_categories(&connection)
            .unwrap()
            .into_iter()
            .map(|category| category.name.to_string())
            .collect::<Vec<_>>();

        let mut want = PREDEFINED_CATEGORIES.map(str::to_owned).to_vec();
        want.sort();
        assert_eq!(names, want);
    }

    #[test]
    fn create_custom_category_succeeds() {
        let connection = get_seeded_connection();
        let user = create_test_user(&connection, "alice");
        let name = CategoryName::new_unchecked("Coffee");

        let category = create_custom_category(name.clone(), user.id, &connection).unwrap();

        assert!(category.id > 0);
        assert_eq!(category.name, name);
        assert_eq!(category.owner, Some(user.id));
        assert!(!category.is_predefined);

        let got = get_custom_categories(user.id, &connection).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, category.id);
        assert_eq!(got[0].name, name);
        assert_eq!(got[0].owner, Some(user.id));
        assert_eq!(
            got[0].created_at.unix_timestamp(),
            category.created_at.unix_timestamp()
        );
    }

    #[test]
    fn create_custom_category_fails_on_duplicate_name() {
        let connection = get_seeded_connection();
        let user = create_test_user(&connection, "alice");
        create_custom_category(CategoryName::new_unchecked("Coffee"), user.id, &connection)
            .unwrap();

        let result =
            create_custom_category(CategoryName::new_unchecked("Coffee"), user.id, &connection);

        assert_eq!(result, Err(Error::DuplicateCategoryName));
    }

    #[test]
    fn different_users_may_share_category_names() {
        let connection = get_seeded_connection();
        let alice = create_test_user(&connection, "alice");
        let bob = create_test_user(&connection, "bob");

        create_custom_category(CategoryName::new_unchecked("Coffee"), alice.id, &connection)
            .unwrap();
        let result =
            create_custom_category(CategoryName::new_unchecked("Coffee"), bob.id, &connection);

        assert!(result.is_ok());
    }

    #[test]
    fn get_category_succeeds() {
        let connection = get_seeded_connection();
        let user = create_test_user(&connection, "alice");
        let category =
            create_custom_category(CategoryName::new_unchecked("Coffee"), user.id, &connection)
                .unwrap();

        let got = get_category(category.id, &connection).unwrap();

        assert_eq!(got.name, category.name);
        assert_eq!(got.owner, Some(user.id));
        assert!(!got.is_predefined);
    }

    #[test]
    fn get_category_with_invalid_id_returns_not_found() {
        let connection = get_test_connection();

        assert_eq!(get_category(42, &connection), Err(Error::NotFound));
    }

    #[test]
    fn available_categories_exclude_other_users() {
        let connection = get_seeded_connection();
        let alice = create_test_user(&connection, "alice");
        let bob = create_test_user(&connection, "bob");
        let coffee =
            create_custom_category(CategoryName::new_unchecked("Coffee"), alice.id, &connection)
                .unwrap();
        let bobs =
            create_custom_category(CategoryName::new_unchecked("Bikes"), bob.id, &connection)
                .unwrap();

        let available = get_available_categories(alice.id, &connection)
            .unwrap()
            .into_iter()
            .map(|category| category.id)
            .collect::<Vec<_>>();

        assert_eq!(available.len(), PREDEFINED_CATEGORIES.len() + 1);
        assert!(available.contains(&coffee.id));
        assert!(!available.contains(&bobs.id));

        let custom = get_custom_categories(alice.id, &connection).unwrap();
        assert_eq!(custom.len(), 1);
        assert_eq!(custom[0].id, coffee.id);
    }

    #[test]
    fn is_category_available_checks_owner() {
        let connection = get_seeded_connection();
        let alice = create_test_user(&connection, "alice");
        let bob = create_test_user(&connection, "bob");
        let coffee =
            create_custom_category(CategoryName::new_unchecked("Coffee"), alice.id, &connection)
                .unwrap();
        let food = get_predefined_categories(&connection).unwrap()[0].clone();

        assert_eq!(is_category_available(coffee.id, alice.id, &connection), Ok(true));
        assert_eq!(is_category_available(coffee.id, bob.id, &connection), Ok(false));
        assert_eq!(is_category_available(food.id, bob.id, &connection), Ok(true));
        assert_eq!(is_category_available(9999, bob.id, &connection), Ok(false));
    }

    #[test]
    fn delete_custom_category_succeeds() {
        let connection = get_seeded_connection();
        let user = create_test_user(&connection, "alice");
        let category =
            create_custom_category(CategoryName::new_unchecked("Coffee"), user.id, &connection)
                .unwrap();

        assert_eq!(delete_custom_category(category.id, user.id, &connection), Ok(()));
        assert!(get_custom_categories(user.id, &connection).unwrap().is_empty());
    }

    #[test]
    fn delete_predefined_or_foreign_category_fails() {
        let connection = get_seeded_connection();
        let alice = create_test_user(&connection, "alice");
        let bob = create_test_user(&connection, "bob");
        let coffee =
            create_custom_category(CategoryName::new_unchecked("Coffee"), alice.id, &connection)
                .unwrap();
        let food = get_predefined_categories(&connection).unwrap()[0].clone();

        assert_eq!(
            delete_custom_category(coffee.id, bob.id, &connection),
            Err(Error::DeleteMissingCategory)
        );
        assert_eq!(
            delete_custom_category(food.id, alice.id, &connection),
            Err(Error::DeleteMissingCategory)
        );
        let remaining = get_custom_categories(alice.id, &connection).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, coffee.id);
    }
}
