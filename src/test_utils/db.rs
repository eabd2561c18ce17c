use email_address::EmailAddress;
use rusqlite::Connection;

use crate::{PasswordHash, User, Username, ValidatedPassword, auth::create_user, db::initialize};

/// The password every user made by [create_test_user] logs in with.
pub(crate) const TEST_PASSWORD: &str = "test";

/// An in-memory database with every table created.
pub(crate) fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");

    connection
}

/// Insert a user with [TEST_PASSWORD] hashed at the lowest bcrypt cost.
#[track_caller]
pub(crate) fn create_test_user(connection: &Connection, username: &str) -> User {
    let password_hash = PasswordHash::new(ValidatedPassword::new_unchecked(TEST_PASSWORD), 4)
        .expect("Could not hash test password");

    create_user(
        Username::new_unchecked(username),
        EmailAddress::new_unchecked(format!("{username}@example.com")),
        password_hash,
        connection,
    )
    .expect("Could not create test user")
}
