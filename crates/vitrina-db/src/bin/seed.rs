//! # Seed Data Generator
//!
//! Fills a registered user's inventory with a demo clothing catalog.
//!
//! ## Usage
//! ```bash
//! # Seed the catalog of an existing account
//! cargo run -p vitrina-db --bin seed -- --owner ana@tienda.ec
//!
//! # Specify database path
//! cargo run -p vitrina-db --bin seed -- --owner ana@tienda.ec --db ./data/vitrina.db
//! ```
//!
//! ## Generated Products
//! One product per (garment, brand), each with a size × color grid of
//! variants. Garments listed without sizes are stocked at product level.

use std::env;

use vitrina_core::stock::recompute_stock;
use vitrina_core::{CoreResult, Money, Product, Variant, DEFAULT_CATEGORY};
use vitrina_db::{Database, DbConfig};

/// (name, category, cost cents, sale cents, sizes)
const GARMENTS: &[(&str, &str, i64, i64, &[&str])] = &[
    ("Camiseta básica", DEFAULT_CATEGORY, 450, 1200, &["S", "M", "L", "XL"]),
    ("Camisa Oxford", DEFAULT_CATEGORY, 1100, 2890, &["S", "M", "L"]),
    ("Jean slim", DEFAULT_CATEGORY, 1500, 3500, &["28", "30", "32", "34"]),
    ("Chompa con capucha", DEFAULT_CATEGORY, 1800, 4200, &["M", "L", "XL"]),
    ("Vestido casual", DEFAULT_CATEGORY, 1300, 3200, &["S", "M", "L"]),
    ("Zapatillas urbanas", "Calzado", 2500, 5900, &["38", "39", "40", "41", "42"]),
    ("Gorra", "Accesorios", 300, 990, &[]),
    ("Cinturón de cuero", "Accesorios", 600, 1500, &[]),
];

const BRANDS: &[&str] = &["Andina", "Pacífico", "Volcán"];

const COLORS: &[&str] = &["Negro", "Blanco", "Azul", "Rojo"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./vitrina_dev.db");
    let mut owner_email: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--owner" | "-o" => {
                if i + 1 < args.len() {
                    owner_email = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let Some(owner_email) = owner_email else {
        print_help();
        return Err("--owner is required".into());
    };

    println!("🌱 Vitrina Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Owner:    {}", owner_email);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let Some(owner) = db.users().find_by_email(&owner_email).await? else {
        return Err(format!("no account for {owner_email}; register it first").into());
    };
    let owner_id = owner.user.id;

    let existing = db.products().count(&owner_id).await?;
    if existing > 0 {
        println!("⚠ Inventory already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut generated = 0;
    let mut units = 0;

    for (seed, (brand, garment)) in BRANDS
        .iter()
        .flat_map(|b| GARMENTS.iter().map(move |g| (b, g)))
        .enumerate()
    {
        let product = generate_product(&owner_id, brand, garment, seed)?;
        units += product.stock;

        if let Err(e) = db.products().create(product).await {
            eprintln!("Failed to insert {} ({}): {}", garment.0, brand, e);
            continue;
        }
        generated += 1;
    }

    println!();
    println!("✓ Generated {} products, {} units in stock", generated, units);
    println!("✓ Seed complete!");

    Ok(())
}

fn print_help() {
    println!("Vitrina Seed Data Generator");
    println!();
    println!("Usage: seed --owner <EMAIL> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -o, --owner <EMAIL>  Registered account whose inventory is filled");
    println!("  -d, --db <PATH>      Database file path (default: ./vitrina_dev.db)");
    println!("  -h, --help           Show this help message");
}

/// Builds one product with deterministic pseudo-random stock.
fn generate_product(
    owner_id: &str,
    brand: &str,
    (name, category, cost, sale, sizes): &(&str, &str, i64, i64, &[&str]),
    seed: usize,
) -> CoreResult<Product> {
    let mut product = Product::new(*name, brand);
    product.owner_id = owner_id.to_string();
    product.category = category.to_string();

    // Brands differ by up to ±10% around the base price
    let spread = 90 + (seed * 7 % 21) as i64;
    product.cost_price = Money::from_cents(cost * spread / 100);
    product.sale_price = Money::from_cents(sale * spread / 100);

    if sizes.is_empty() {
        product.stock = (seed * 13 % 25) as i64;
    } else {
        for (s, size) in sizes.iter().enumerate() {
            for (c, color) in COLORS.iter().enumerate().take(1 + seed % COLORS.len()) {
                // Some combinations start sold out
                let stock = ((seed + s * 5 + c * 3) % 12) as i64;
                product.variants.push(Variant::new(*size, *color, stock));
            }
        }
        recompute_stock(&mut product)?;
    }

    Ok(product)
}
