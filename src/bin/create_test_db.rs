use std::{
    error::Error,
    path::Path,
    process::exit,
    sync::{Arc, Mutex},
};

use clap::Parser;
use rusqlite::Connection;

use subchecks::{
    Amount, ApplicationName, ContributionRequest, ContributorName, PasswordHash,
    SettlementRequest, ValidatedPassword, create_user, initialize_db, parse_email,
    record_contribution, settle_payment,
    stores::sqlite::{SQLiteBalanceStore, SQLiteContributionStore, SQLitePaymentStore},
};

/// A utility for creating a test database for the SubChecks server.
///
/// The database has one user, test@example.com with the password "test", and a few
/// contributions and payments for the known applications.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;
    let user = create_user(
        parse_email("test@example.com")?,
        Some("Test User"),
        password_hash,
        &conn,
    )?;

    println!("Recording contributions and payments...");

    let conn = Arc::new(Mutex::new(conn));
    let mut balance_store = SQLiteBalanceStore::new(conn.clone());
    let mut payment_store = SQLitePaymentStore::new(conn.clone());
    let mut contribution_store = SQLiteContributionStore::new(conn);

    let contributions = [
        ("YouTube Premium", "Alice", 60.0),
        ("YouTube Premium", "Bob", 45.0),
        ("YouTube Premium", "Carol", 30.0),
        ("Crunchyroll", "Alice", 20.0),
        ("Crunchyroll", "Dana", 40.0),
    ];

    for (application, contributor, amount) in contributions {
        record_contribution(
            &mut contribution_store,
            &mut balance_store,
            ContributionRequest {
                application: ApplicationName::new(application)?,
                contributor: ContributorName::new(contributor)?,
                amount: Amount::new(amount)?,
                recorder_id: Some(user.id),
            },
        )?;
    }

    let payments = [
        ("YouTube Premium", 22.99, "January bill"),
        ("YouTube Premium", 22.99, "February bill"),
        ("Crunchyroll", 11.99, "Mega Fan plan"),
    ];

    for (application, amount, description) in payments {
        let outcome = settle_payment(
            &mut payment_store,
            &mut balance_store,
            SettlementRequest {
                application: ApplicationName::new(application)?,
                amount: Amount::new(amount)?,
                payer_id: Some(user.id),
                description: Some(description.to_owned()),
            },
        )?;
        println!("{}", outcome.message());
    }

    println!("Success!");

    Ok(())
}
