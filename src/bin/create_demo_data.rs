use std::{error::Error, process::exit, str::FromStr};

use clap::Parser;
use email_address::EmailAddress;
use rand::{Rng, seq::SliceRandom};
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use expense_tracker::{
    Amount, Category, CategoryName, NewExpense, PasswordHash, User, Username, ValidatedPassword,
    create_custom_category, create_expense, create_user, get_predefined_categories,
    get_user_by_username, initialize_db, seed_predefined_categories,
};

const EXPENSE_DAYS: i64 = 60;
const COFFEE_DAYS: i64 = 30;
const COFFEE_DESCRIPTIONS: [&str; 4] = [
    "Morning coffee",
    "Afternoon latte",
    "Coffee with colleague",
    "Cappuccino",
];

/// Fill an application database with a demo user and two months of expenses.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The username for the demo account.
    #[arg(long, default_value = "demo")]
    username: String,

    /// The password for the demo account if it has to be created.
    #[arg(long, default_value = "demo1234")]
    password: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let conn = Connection::open(&args.db_path)?;

    initialize_db(&conn)?;
    seed_predefined_categories(&conn)?;

    println!("Creating demo user...");
    let user = get_or_create_user(&args.username, &args.password, &conn)?;

    let categories = get_predefined_categories(&conn)?;
    if categories.is_empty() {
        print_error("No predefined categories found! Run create_categories first.");
        exit(1);
    }

    println!("Creating sample expenses...");
    let today = OffsetDateTime::now_utc().date();
    let mut rng = rand::thread_rng();
    let mut created_count = 0;

    for days_ago in 0..EXPENSE_DAYS {
        let date = today - Duration::days(days_ago);

        for _ in 0..rng.gen_range(1..=3) {
            let Some(category) = categories.choose(&mut rng) else {
                continue;
            };

            let (min_amount, max_amount) = amount_range(category);
            let amount = Amount::from_cents(rng.gen_range(min_amount * 100..=max_amount * 100));
            let description = match descriptions(category) {
                Some(descriptions) => descriptions
                    .choose(&mut rng)
                    .map(|description| description.to_string())
                    .unwrap_or_default(),
                None => format!("Expense for {}", category.name),
            };

            create_expense(
                NewExpense {
                    user_id: user.id,
                    amount,
                    category_id: Some(category.id),
                    description,
                    date,
                },
                &conn,
            )?;
            created_count += 1;
        }
    }

    println!("Created {created_count} sample expenses");

    match create_custom_category(CategoryName::new_unchecked("Coffee"), user.id, &conn) {
        Ok(coffee) => {
            println!("Created custom category: Coffee");

            for days_ago in (1..=COFFEE_DAYS).rev().step_by(3) {
                let description = COFFEE_DESCRIPTIONS
                    .choose(&mut rng)
                    .map(|description| description.to_string())
                    .unwrap_or_default();

                create_expense(
                    NewExpense {
                        user_id: user.id,
                        amount: Amount::from_cents(rng.gen_range(300..=800)),
                        category_id: Some(coffee.id),
                        description,
                        date: today - Duration::days(days_ago),
                    },
                    &conn,
                )?;
            }
        }
        Err(expense_tracker::Error::DuplicateCategoryName) => {
            println!("Custom category Coffee already exists");
        }
        Err(error) => return Err(error.into()),
    }

    let (total_expenses, total_amount): (i64, Amount) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(amount), 0) FROM expense WHERE user_id = ?1",
        (user.id.as_i64(),),
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    println!();
    println!("{}", "=".repeat(50));
    println!("  Demo Data Created Successfully!");
    println!("{}", "=".repeat(50));
    println!("  Username: {}", user.username);
    println!("  Total Expenses: {total_expenses}");
    println!("  Total Amount: ${total_amount}");
    println!("{}", "=".repeat(50));

    Ok(())
}

fn get_or_create_user(
    username: &str,
    password: &str,
    conn: &Connection,
) -> Result<User, Box<dyn Error>> {
    match get_user_by_username(username, conn) {
        Ok(user) => {
            println!("User {username} already exists");
            Ok(user)
        }
        Err(expense_tracker::Error::NotFound) => {
            let email = EmailAddress::from_str(&format!("{username}@example.com"))?;
            // Demo passwords skip the strength check.
            let password_hash = PasswordHash::new(
                ValidatedPassword::new_unchecked(password),
                PasswordHash::DEFAULT_COST,
            )?;
            let user = create_user(Username::new(username)?, email, password_hash, conn)?;
            println!("Demo user created: {username}");
            println!("   Password: {password}");

            Ok(user)
        }
        Err(error) => Err(error.into()),
    }
}

/// The range of whole dollars a demo expense in `category` may cost.
fn amount_range(category: &Category) -> (i64, i64) {
    match category.name.as_ref() {
        "Food" => (5, 50),
        "Transport" => (3, 30),
        "Rent" => (500, 1500),
        "Entertainment" => (10, 100),
        "Health" => (20, 200),
        "Shopping" => (15, 150),
        "Utilities" => (30, 150),
        "Education" => (50, 300),
        "Other" => (5, 100),
        _ => (10, 100),
    }
}

fn descriptions(category: &Category) -> Option<&'static [&'static str]> {
    let descriptions: &[&str] = match category.name.as_ref() {
        "Food" => &[
            "Grocery shopping at supermarket",
            "Lunch at restaurant",
            "Coffee and snacks",
            "Dinner with friends",
            "Food delivery",
        ],
        "Transport" => &[
            "Taxi to work",
            "Bus ticket",
            "Gas refill",
            "Uber ride",
            "Parking fee",
        ],
        "Entertainment" => &[
            "Movie tickets",
            "Concert tickets",
            "Streaming subscription",
            "Video games",
            "Books",
        ],
        "Health" => &[
            "Pharmacy",
            "Doctor visit",
            "Gym membership",
            "Vitamins and supplements",
            "Medical checkup",
        ],
        "Shopping" => &[
            "Clothes shopping",
            "Electronics",
            "Home decor",
            "Gifts",
            "Accessories",
        ],
        "Utilities" => &[
            "Electricity bill",
            "Water bill",
            "Internet bill",
            "Mobile phone bill",
            "Gas bill",
        ],
        _ => return None,
    };

    Some(descriptions)
}

fn print_error(error: impl ToString) {
    eprintln!("\x1b[31;1m{}\x1b[0m", error.to_string())
}
