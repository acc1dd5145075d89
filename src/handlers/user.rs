use axum::{
    body::Body,
    extract::{Multipart, Path as UrlPath, Query, State},
    http::{header, StatusCode},
    response::{Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::path::{Component, Path, PathBuf};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::{
    errors::{AppError, Result},
    handlers::AppState,
    middleware::auth::CurrentUser,
    models::{FileEntry, StorageSummary, UserRecord},
};

#[derive(Debug, Deserialize)]
pub struct ExistsQuery {
    pub path: String,
}

pub async fn info(CurrentUser(user): CurrentUser) -> Result<Json<UserRecord>> {
    Ok(Json(user))
}

/// Storage usage as shown to the user. `used` comes from a fresh walk of the
/// subtree, not from the admission counter, so deletions made outside the
/// upload path are reflected here even though the counter never sees them.
pub async fn storage(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<StorageSummary>> {
    let user_dir = state.files.user_dir(&user.user_id);
    let used = state.files.folder_size(&user_dir);
    Ok(Json(StorageSummary::new(user.storage_limit_bytes, used)))
}

pub async fn list_files(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<FileEntry>>> {
    let user_dir = state.files.user_dir(&user.user_id);
    Ok(Json(state.files.list_user_files(&user_dir)))
}

pub async fn exists(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ExistsQuery>,
) -> Result<Json<bool>> {
    let relative = sanitize_relative_path(&query.path)?;
    let path = state.files.user_dir(&user.user_id).join(relative);
    Ok(Json(path.is_file()))
}

pub async fn upload(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::Validation(format!("Failed to parse multipart data: {}", e))
    })? {
        if field.name() == Some("file") {
            filename = field.file_name().map(|s| s.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read file data: {}", e)))?;
            file_data = Some(data.to_vec());
        }
    }

    let file_data = file_data.ok_or_else(|| AppError::Validation("File is empty".to_string()))?;
    if file_data.is_empty() {
        return Err(AppError::Validation("File is empty".to_string()));
    }

    let filename = match filename.filter(|name| !name.is_empty()) {
        Some(name) => name,
        None => format!("{}.dat", Uuid::new_v4()),
    };
    let relative = sanitize_relative_path(&filename)?;

    // Admission and usage commit happen as one reservation under the cache's
    // exclusive lock, so concurrent uploads for the same user cannot both
    // slip under the limit.
    let size = file_data.len() as i64;
    if !state.sessions.try_reserve(&user.user_id, size).await {
        return Err(AppError::QuotaExceeded("Insufficient storage space".to_string()));
    }

    let dest = state.files.user_dir(&user.user_id).join(&relative);
    if let Err(e) = write_file(&dest, &file_data).await {
        // The reservation is not kept for bytes that never reached disk.
        state.sessions.release(&user.user_id, size).await;
        return Err(AppError::Storage(format!("Failed to write file: {}", e)));
    }

    tracing::info!(
        "User {} uploaded {} ({} bytes)",
        user.user_id,
        relative.display(),
        size
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "File uploaded successfully",
            "name": filename,
            "size_bytes": size
        })),
    ))
}

pub async fn download(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    UrlPath(path): UrlPath<String>,
) -> Result<Response> {
    let relative = sanitize_relative_path(&path)?;
    let full_path = state.files.user_dir(&user.user_id).join(&relative);

    let file = match tokio::fs::File::open(&full_path).await {
        Ok(file) => file,
        Err(_) => return Err(AppError::NotFound),
    };

    let filename = relative
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    let content_type = mime_guess::from_path(&full_path)
        .first_or_octet_stream()
        .to_string();

    let stream = ReaderStream::new(file);
    let response = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Storage(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Removes a file from the user's subtree. The admission counter is left
/// untouched, matching the walk-based summary's role as the user-facing
/// usage figure.
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    UrlPath(path): UrlPath<String>,
) -> Result<Json<serde_json::Value>> {
    let relative = sanitize_relative_path(&path)?;
    let full_path = state.files.user_dir(&user.user_id).join(&relative);

    if !full_path.is_file() {
        return Err(AppError::NotFound);
    }

    tokio::fs::remove_file(&full_path)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to delete file: {}", e)))?;

    Ok(Json(json!({"message": "File deleted successfully"})))
}

/// Confines a client-supplied path to the user's subtree: no absolute paths,
/// no `..` components, no empty result.
fn sanitize_relative_path(raw: &str) -> Result<PathBuf> {
    let path = Path::new(raw);
    let mut clean = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => {
                return Err(AppError::Validation("Invalid file path".to_string()));
            }
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(AppError::Validation("Invalid file path".to_string()));
    }

    Ok(clean)
}

async fn write_file(dest: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, data).await
}
