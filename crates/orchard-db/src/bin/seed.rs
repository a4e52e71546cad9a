//! # Seed Data Generator
//!
//! Populates the database with a demo perishable catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p orchard-db --bin seed
//!
//! # Specify database path
//! cargo run -p orchard-db --bin seed -- --db ./data/orchard.db
//! ```
//!
//! Each product gets three batches with staggered expiry dates so the FEFO
//! allocation path has something realistic to walk.

use chrono::{Duration, Utc};
use std::env;
use uuid::Uuid;

use orchard_core::{Batch, BatchStatus, MovementType, Product, RotationMethod, StockMovement};
use orchard_db::{Database, DbConfig};

/// Demo perishable catalog: (sku, name, price cents, sold by weight).
const PRODUCTS: &[(&str, &str, i64, bool)] = &[
    ("MILK-1L", "Whole Milk 1L", 189, false),
    ("YOG-500", "Greek Yogurt 500g", 349, false),
    ("CHED-KG", "Cheddar Cheese", 1299, true),
    ("BREAD-W", "Wheat Sourdough Loaf", 449, false),
    ("APL-GALA", "Gala Apples", 399, true),
    ("BERRY-P", "Strawberries Punnet", 499, false),
    ("CHKN-BRST", "Chicken Breast", 1099, true),
    ("SALM-FIL", "Salmon Fillet", 2399, true),
    ("EGGS-12", "Free Range Eggs Dozen", 529, false),
    ("SPIN-200", "Baby Spinach 200g", 279, false),
];

/// Shelf life in days for the three staggered batches per product.
const BATCH_SHELF_DAYS: &[i64] = &[3, 7, 14];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./orchard_dev.db");

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
                println!("Orchard POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./orchard_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Orchard POS Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("Connected, migrations applied");

    let now = Utc::now();
    let today = now.date_naive();
    let mut products = 0;
    let mut batches = 0;

    for (idx, (sku, name, price_cents, sold_by_weight)) in PRODUCTS.iter().enumerate() {
        if db.products().find_by_sku(sku).await?.is_some() {
            println!("  {} already seeded, skipping", sku);
            continue;
        }

        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: sku.to_string(),
            name: name.to_string(),
            category_id: Some("cat-perishable".to_string()),
            price_cents: *price_cents,
            track_inventory: true,
            sold_by_weight: *sold_by_weight,
            rotation_method: RotationMethod::Fefo,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await?;
        products += 1;

        for (batch_idx, shelf_days) in BATCH_SHELF_DAYS.iter().enumerate() {
            let quantity = 10.0 + (idx * 7 + batch_idx * 3) as f64 % 30.0;
            let batch = Batch {
                id: Uuid::new_v4().to_string(),
                product_id: product.id.clone(),
                batch_number: format!("{}-{:02}{}", sku, batch_idx + 1, today.format("%m%d")),
                expiry_date: Some(today + Duration::days(*shelf_days)),
                received_at: now - Duration::days(BATCH_SHELF_DAYS.len() as i64 - batch_idx as i64),
                initial_quantity: quantity,
                current_quantity: quantity,
                status: BatchStatus::Active,
                created_at: now,
                updated_at: now,
            };
            let movement = StockMovement {
                id: Uuid::new_v4().to_string(),
                product_id: product.id.clone(),
                batch_id: Some(batch.id.clone()),
                movement_type: MovementType::Receipt,
                quantity,
                transaction_id: None,
                note: Some("seed".to_string()),
                created_at: now,
            };
            db.batches().receive_batch(&batch, &movement).await?;
            batches += 1;
        }
    }

    println!();
    println!("Seed complete: {} products, {} batches", products, batches);

    db.close().await;
    Ok(())
}
