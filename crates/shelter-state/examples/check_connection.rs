//! Quick connection check against the configured SurrealDB
//! Run with: cargo run --package shelter-state --example check_connection

use shelter_state::{CloudConfig, SurrealShelterStore, VolunteerDirectory};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    match CloudConfig::from_env() {
        Ok(config) => {
            println!("Testing SurrealDB Cloud connection...");
            println!("  Endpoint: {}", config.endpoint);
            println!("  Namespace: {}", config.namespace);
            println!("  Database: {}", config.database);
            println!("  User: {}", config.username);
        }
        Err(e) => println!("No cloud config ({e}), falling back to SURREALDB_URL or memory"),
    }

    let store = match SurrealShelterStore::from_env().await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("\n✗ Connection failed: {}", e);
            std::process::exit(1);
        }
    };

    match store.list_volunteer_ids().await {
        Ok(ids) => println!("\n✓ Connected, {} volunteers registered", ids.len()),
        Err(e) => {
            eprintln!("\n✗ Query failed: {}", e);
            std::process::exit(1);
        }
    }
}
