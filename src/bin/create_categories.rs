use std::{error::Error, process::exit};

use clap::Parser;
use rusqlite::Connection;

use expense_tracker::{initialize_db, seed_predefined_categories};

/// Create the predefined expense categories in an application database.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let conn = Connection::open(&args.db_path)?;

    if let Err(error) = initialize_db(&conn) {
        eprintln!("\x1b[31;1mCould not initialize the database: {error}\x1b[0m");
        exit(1);
    }

    match seed_predefined_categories(&conn) {
        Ok((created, existing)) => {
            println!("Created {created} predefined categories ({existing} already existed).");
            Ok(())
        }
        Err(error) => {
            eprintln!("\x1b[31;1mCould not create the predefined categories: {error}\x1b[0m");
            exit(1);
        }
    }
}
