//! # Seed Data Generator
//!
//! Populates a store with demo users and products for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./tally_dev.db
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! Users get codes `U1`, `U2`, ... and products get EAN-13 style codes
//! starting with `590`, so none of them collides with the default marker
//! codes `1`, `2` and `3`.

use std::env;
use tally_core::validation::{validate_code, validate_name};
use tally_core::{Product, User};
use tally_db::{Database, DbConfig};

/// Demo staff badges.
const USERS: &[&str] = &["Anna Kowalska", "Piotr Nowak", "Maria Wisniewska", "Jan Zielinski"];

/// Demo tool-room stock: (name, quantity).
const PRODUCTS: &[(&str, i64)] = &[
    ("Cordless Drill", 5),
    ("Circular Saw", 2),
    ("Angle Grinder", 3),
    ("Laser Level", 1),
    ("Tape Measure 8m", 12),
    ("Safety Goggles", 25),
    ("Work Gloves (pair)", 40),
    ("Extension Cord 25m", 6),
    ("Impact Driver", 4),
    ("Step Ladder", 2),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tally Seed Data Generator");
    println!("===========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await? + db.users().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} users and products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Users:");
    for (idx, name) in USERS.iter().enumerate() {
        let user = User::new(format!("U{}", idx + 1), *name);
        validate_name(&user.name)?;
        db.users().insert(&user).await?;
        println!("  {:<6} {}", user.code, user.name);
    }

    println!();
    println!("Products:");
    for (idx, (name, quantity)) in PRODUCTS.iter().enumerate() {
        let product = Product::new(product_code(idx), *name, *quantity);
        validate_code(&product.code)?;
        validate_name(&product.name)?;
        db.products().insert(&product).await?;
        println!("  {}  {:<22} qty {}", product.code, product.name, product.quantity);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// EAN-13 shaped code (checksum not computed).
fn product_code(idx: usize) -> String {
    format!("590{:010}", idx + 1)
}
