use std::{error::Error, io, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;

use expense_tracker::{PasswordHash, User, ValidatedPassword, get_user_by_username, update_password};

/// A utility for changing the password for a registered user.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The username of the user whose password should be reset.
    #[arg(long)]
    username: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let db_path = Path::new(&args.db_path);
    if let Some(problem) = check_db_path(db_path) {
        print_error(problem);
        exit(1);
    }

    println!("Loading user from {db_path:#?}");
    let mut conn = Connection::open(db_path)?;

    let user = match get_user_by_username(&args.username, &conn) {
        Ok(user) => user,
        Err(error) => {
            print_error(format!("Could not find user \"{}\": {error}", args.username));
            exit(1);
        }
    };
    println!("Resetting password for {}", user.username);

    let Some(password_hash) = get_new_password_hash(&user) else {
        return Ok(());
    };

    let transaction = conn.transaction()?;
    if let Err(error) = update_password(user.id, &password_hash, &transaction) {
        print_error(format!("Could not update password: {error}. Rolling back..."));
        transaction.rollback()?;
        exit(1);
    }
    transaction.commit()?;

    println!("Password updated successfully!");

    Ok(())
}

/// The reason `db_path` cannot be an existing application database, if any.
fn check_db_path(db_path: &Path) -> Option<String> {
    if db_path.extension().is_none_or(|extension| extension.is_empty()) {
        return Some(
            "Database path must include a file extension (e.g., 'my_database.db').".to_owned(),
        );
    }

    if !db_path.is_file() {
        return Some(format!("File does not exist at {db_path:#?}!"));
    }

    None
}

/// Read a password without echoing it. `None` means the user gave up, e.g.
/// with Ctrl+D.
fn prompt(message: &str) -> Option<String> {
    match rpassword::prompt_password(message) {
        Ok(password) => Some(password),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => None,
        Err(error) => {
            print_error(format!("Could not read password from stdin: {error}"));
            None
        }
    }
}

/// Ask for a new password until it is strong enough and typed the same twice.
fn get_new_password_hash(user: &User) -> Option<PasswordHash> {
    let user_inputs: [&str; 2] = [user.username.as_ref(), user.email.as_str()];

    loop {
        println!();

        let password = prompt("Enter a new password: ")?;
        let validated_password = match ValidatedPassword::new(&password, &user_inputs) {
            Ok(validated_password) => validated_password,
            Err(error) => {
                print_error(error);
                continue;
            }
        };

        if prompt("Enter the same password again: ")? != password {
            print_error("Passwords must match, try again.");
            continue;
        }

        match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
            Ok(password_hash) => return Some(password_hash),
            Err(error) => print_error(format!("Could not hash password: {error}. Try again.")),
        }
    }
}

fn print_error(error: impl ToString) {
    eprintln!(
        "\x1b[31;1m{}\x1b[0m",
        capitalise_first_char(&error.to_string())
    )
}

fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}
