//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `bujo_core` linkage and schema
//!   bootstrap.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("bujo_core version={}", bujo_core::core_version());

    match bujo_core::db::open_db_in_memory() {
        Ok(_conn) => println!(
            "bujo_core storage=ok schema_version={}",
            bujo_core::db::migrations::latest_version()
        ),
        Err(err) => {
            eprintln!("bujo_core storage=error {err}");
            std::process::exit(1);
        }
    }
}
