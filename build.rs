use std::fs;
use std::path::Path;

fn main() {
    // sqlx::migrate! embeds migrations at compile time
    println!("cargo:rerun-if-changed=migrations");
    println!("cargo:rerun-if-changed=src/api.rs");
    println!("cargo:rerun-if-changed=src/db/models.rs");

    // The real OpenAPI document comes from `cargo run --bin generate-openapi`
    let openapi_path = Path::new("openapi.json");

    if !openapi_path.exists() {
        let placeholder = r#"{
  "note": "Run 'cargo run --bin generate-openapi' to generate the OpenAPI spec"
}"#;
        fs::write(openapi_path, placeholder).expect("Failed to create openapi.json placeholder");
    }
}
