//! Command to generate the `OpenAPI` components for the stream API wire
//! models and write them to a file or stdout.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use shared::models::{
    Author, ErrorResponse, LikeState, Message, MessageId, MessageKind, MessagePage,
    PostMessageRequest, StreamAccessResponse, SubjectId, Timestamp, ViewerId,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ChatSync stream API",
        description = "Wire models consumed by the ChatSync stream synchronizer"
    ),
    components(schemas(
        Author,
        ErrorResponse,
        LikeState,
        Message,
        MessageId,
        MessageKind,
        MessagePage,
        PostMessageRequest,
        StreamAccessResponse,
        SubjectId,
        Timestamp,
        ViewerId,
    ))
)]
pub struct ApiDoc;

/// Generates the `OpenAPI` document and writes it to `output_path` or
/// streams it to stdout.
///
/// # Arguments
/// * `output_path` - The format (YAML or JSON) is taken from the file
///   extension. `None` streams YAML; `"json"`/`"yaml"` stream that format.
///
/// # Errors
/// Returns an error if serialization or the file write fails.
pub fn generate_spec(output_path: Option<&str>) -> Result<()> {
    let openapi = ApiDoc::openapi();

    match output_path {
        Some("json") => {
            let json = openapi.to_pretty_json().context("failed to encode JSON")?;
            io::stdout().write_all(json.as_bytes())?;
        }
        Some("yaml") | None => {
            let yaml = openapi.to_yaml().context("failed to encode YAML")?;
            io::stdout().write_all(yaml.as_bytes())?;
        }
        Some(path) => {
            let path = Path::new(path);
            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("yaml");

            let rendered = if extension == "json" {
                openapi.to_pretty_json().context("failed to encode JSON")?
            } else {
                openapi.to_yaml().context("failed to encode YAML")?
            };
            fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;

            println!("OpenAPI spec written to {}", path.display());
        }
    }

    Ok(())
}
