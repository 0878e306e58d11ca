use crate::domain::model::{ContentType, PredictionResult, RenderedResponse};
use crate::utils::error::{ApiError, Result};
use serde_json::json;
use std::io::Write;
use std::path::Path;
use zip::write::{FileOptions, ZipWriter};

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Converts the figures of a finished simulation into the requested response format.
pub fn render(result: &PredictionResult, content_type: ContentType) -> Result<RenderedResponse> {
    tracing::debug!(
        "Rendering {} artifacts of '{}' as {}",
        result.artifacts.len(),
        result.name,
        content_type
    );
    match content_type {
        ContentType::Png | ContentType::Mp4 => single_artifact(result, content_type),
        ContentType::Json => json_response(result),
        ContentType::Zip => zip_response(result),
    }
}

fn single_artifact(result: &PredictionResult, content_type: ContentType) -> Result<RenderedResponse> {
    let extensions = content_type.artifact_extensions();
    let artifact = result
        .artifacts
        .iter()
        .find(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
                .unwrap_or(false)
        })
        .ok_or_else(|| ApiError::ResultMissing {
            kind: extensions.join("/"),
            path: result.result_dir.display().to_string(),
        })?;

    let body = std::fs::read(artifact)?;
    Ok(RenderedResponse {
        content_type,
        filename: Some(file_name(artifact)),
        body,
    })
}

fn json_response(result: &PredictionResult) -> Result<RenderedResponse> {
    let artifacts: Vec<String> = result.artifacts.iter().map(|p| file_name(p)).collect();
    let body = serde_json::to_vec(&json!({
        "name": result.name,
        "result_dir": result.result_dir,
        "artifacts": artifacts,
    }))?;
    Ok(RenderedResponse {
        content_type: ContentType::Json,
        filename: None,
        body,
    })
}

fn zip_response(result: &PredictionResult) -> Result<RenderedResponse> {
    if result.artifacts.is_empty() {
        return Err(ApiError::ResultMissing {
            kind: "figure".to_string(),
            path: result.result_dir.display().to_string(),
        });
    }

    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for artifact in &result.artifacts {
        zip.start_file::<_, ()>(file_name(artifact), FileOptions::default())?;
        zip.write_all(&std::fs::read(artifact)?)?;
    }
    let body = zip.finish()?.into_inner();

    Ok(RenderedResponse {
        content_type: ContentType::Zip,
        filename: Some(format!("{}_figures.zip", result.name)),
        body,
    })
}
