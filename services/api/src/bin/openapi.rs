//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI 3 document of the REST API to disk.
//!
//! Usage: `openapi [OUTPUT]` (defaults to `openapi.json`).

use api_lib::web::rest::ApiDoc;
use std::path::Path;
use utoipa::OpenApi;

fn write_spec(
    api_doc: &utoipa::openapi::OpenApi,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let spec_json = api_doc.to_pretty_json()?;
    std::fs::write(path, spec_json)?;
    println!("OpenAPI specification written to {}", path.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());

    let mut api_doc = ApiDoc::openapi();
    api_doc.info.title = "Echo API".to_string();
    api_doc.info.version = env!("CARGO_PKG_VERSION").to_string();

    write_spec(&api_doc, Path::new(&output))
}
