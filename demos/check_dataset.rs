use climate_service::config::{self, DEFAULT_CONFIG_PATH};
use climate_service::db;
use std::path::Path;

fn main() {
    let settings = config::load_config(Path::new(DEFAULT_CONFIG_PATH))
        .expect("Failed to load configuration");

    println!("Opening: {}", settings.database_path.display());

    let conn = db::open_read_only(&settings.database_path)
        .expect("Failed to open database");

    println!("✓ Opened read-only");

    // Test 1: Required tables
    for table in db::REQUIRED_TABLES {
        match db::verify_table(&conn, table) {
            Ok(()) => println!("✓ table {} exists", table),
            Err(e) => println!("✗ {}", e),
        }
    }

    // Test 2: Row counts
    for table in db::REQUIRED_TABLES {
        match db::count_rows(&conn, table) {
            Ok(count) => println!("✓ {} rows in {}", count, table),
            Err(e) => println!("✗ Error counting {}: {}", table, e),
        }
    }

    // Test 3: Date coverage
    let result = conn.query_row(
        "SELECT MIN(date), MAX(date) FROM measurement",
        [],
        |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?)),
    );

    match result {
        Ok((Some(first), Some(last))) => println!("✓ Measurements from {} to {}", first, last),
        Ok(_) => println!("✗ No measurements"),
        Err(e) => println!("✗ Error reading date range: {}", e),
    }
}
