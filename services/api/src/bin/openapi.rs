//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document of the Student Helper API (the AI chat and
//! health endpoints declared on `ApiDoc`) to `openapi.json`.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

/// Renders `api_doc` as pretty JSON at `path`.
fn write_api_doc(
    api_doc: utoipa::openapi::OpenApi,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let spec_json = api_doc.to_pretty_json()?;
    std::fs::write(path, spec_json)?;
    println!("Student Helper OpenAPI document written to {}", path);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    write_api_doc(ApiDoc::openapi(), "openapi.json")?;
    Ok(())
}
