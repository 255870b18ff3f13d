//! Attachment lifecycle: upload, metadata registration, download, delete.
//!
//! Upload and registration are two HTTP steps: the blob is written first
//! and only then registered against a ticket. A client that stops between
//! the steps leaves an orphaned blob behind; see DESIGN.md.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use diesel::prelude::*;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::shared::error::ApiError;
use crate::shared::models::{Attachment, NewAttachment};
use crate::shared::schema::{attachments, tickets};
use crate::shared::state::AppState;
use crate::shared::utils::parse_id;
use crate::storage::BlobDeletion;

/// Whole files are buffered in memory before hitting disk, so the body
/// limit is the effective attachment size limit.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

const FALLBACK_MIMETYPE: &str = "application/octet-stream";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub filename: String,
    pub original_filename: String,
    pub mimetype: String,
    pub size: usize,
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterAttachmentRequest {
    pub filename: Option<String>,
    pub path: Option<String>,
    pub mimetype: Option<String>,
    pub size: Option<i32>,
}

fn content_disposition(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", filename)
}

/// POST /upload: multipart form field `file`. Writes the blob and echoes
/// the metadata the client needs for the registration step.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file_field_seen = false;
    let mut original_filename: Option<String> = None;
    let mut declared_mime: Option<String> = None;
    let mut data: Vec<u8> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            file_field_seen = true;
            original_filename = field.file_name().map(str::to_string);
            declared_mime = field.content_type().map(str::to_string);
            data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Failed to read upload: {}", e)))?
                .to_vec();
        }
    }

    if !file_field_seen {
        return Err(ApiError::Validation("No file uploaded".to_string()));
    }

    let original_filename = original_filename.unwrap_or_else(|| "unnamed".to_string());
    let mimetype = declared_mime
        .filter(|m| !m.is_empty())
        .or_else(|| {
            mime_guess::from_path(&original_filename)
                .first()
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| FALLBACK_MIMETYPE.to_string());

    let saved = state.blobs.save(&original_filename, &data)?;
    info!(
        "Uploaded {} as {} ({} bytes)",
        original_filename, saved.path, saved.size
    );

    Ok(Json(UploadResponse {
        filename: original_filename.clone(),
        original_filename,
        mimetype,
        size: saved.size,
        path: saved.path,
    }))
}

/// POST /tickets/:id/attachments: records metadata for an already-written
/// blob. A ticket id that resolves to nothing is a not-found error rather
/// than a foreign-key violation bubbling out of the insert.
pub async fn register_attachment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RegisterAttachmentRequest>,
) -> Result<Json<Attachment>, ApiError> {
    let ticket_id = parse_id(&id)?;
    let filename = req
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Missing required field: filename".to_string()))?;
    let path = req
        .path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Missing required field: path".to_string()))?;
    let mimetype = req
        .mimetype
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| FALLBACK_MIMETYPE.to_string());
    let size = req.size.unwrap_or(0);

    let mut conn = state
        .conn
        .get()
        .map_err(|e| ApiError::Database(format!("DB error: {}", e)))?;

    let ticket_exists: bool =
        diesel::select(diesel::dsl::exists(tickets::table.find(ticket_id)))
            .get_result(&mut conn)
            .map_err(|e| ApiError::Database(format!("Query error: {}", e)))?;
    if !ticket_exists {
        return Err(ApiError::NotFound(format!("Ticket {} not found", ticket_id)));
    }

    let new_attachment = NewAttachment {
        ticket_id,
        filename: &filename,
        path: &path,
        mimetype: &mimetype,
        size,
        created_at: Utc::now(),
    };

    let attachment = diesel::insert_into(attachments::table)
        .values(&new_attachment)
        .get_result::<Attachment>(&mut conn)
        .map_err(|e| ApiError::Database(format!("Insert error: {}", e)))?;

    info!(
        "Registered attachment {} ({}) on ticket {}",
        attachment.id, attachment.path, ticket_id
    );
    Ok(Json(attachment))
}

/// GET /attachments/:id: full file contents with the stored mimetype and
/// the original filename for content disposition. All miss conditions are
/// 404: a non-numeric id, absent metadata, and a blob gone from disk.
pub async fn download_attachment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: i32 = id
        .parse()
        .map_err(|_| ApiError::NotFound(format!("Invalid attachment ID: {}", id)))?;

    let mut conn = state
        .conn
        .get()
        .map_err(|e| ApiError::Database(format!("DB error: {}", e)))?;

    let attachment = attachments::table
        .find(id)
        .first::<Attachment>(&mut conn)
        .optional()
        .map_err(|e| ApiError::Database(format!("Query error: {}", e)))?
        .ok_or_else(|| ApiError::NotFound("Attachment not found".to_string()))?;

    let bytes = state.blobs.read(&attachment.path)?;

    let mimetype = if attachment.mimetype.is_empty() {
        FALLBACK_MIMETYPE.to_string()
    } else {
        attachment.mimetype.clone()
    };

    Ok((
        [
            (header::CONTENT_TYPE, mimetype),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&attachment.filename),
            ),
        ],
        bytes,
    ))
}

/// DELETE /attachments/:id: blob deletion is best-effort and its outcome
/// only logged; the metadata row is removed regardless, so a failed unlink
/// can leave an orphaned blob but never a dangling record.
pub async fn delete_attachment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    let mut conn = state
        .conn
        .get()
        .map_err(|e| ApiError::Database(format!("DB error: {}", e)))?;

    let attachment = attachments::table
        .find(id)
        .first::<Attachment>(&mut conn)
        .optional()
        .map_err(|e| ApiError::Database(format!("Query error: {}", e)))?
        .ok_or_else(|| ApiError::NotFound("Attachment not found".to_string()))?;

    match state.blobs.delete(&attachment.path) {
        BlobDeletion::Removed => info!("Deleted blob {}", attachment.path),
        BlobDeletion::Missing => warn!("Blob {} was already gone", attachment.path),
        BlobDeletion::Failed(e) => error!(
            "Failed to delete blob {} (left orphaned on disk): {}",
            attachment.path, e
        ),
    }

    diesel::delete(attachments::table.find(id))
        .execute(&mut conn)
        .map_err(|e| ApiError::Database(format!("Delete error: {}", e)))?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn configure_attachments_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/tickets/:id/attachments", post(register_attachment))
        .route(
            "/attachments/:id",
            get(download_attachment).delete(delete_attachment),
        )
}

#[cfg(test)]
#[path = "attachments.test.rs"]
mod tests;
