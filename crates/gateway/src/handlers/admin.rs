//! Administration handlers

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use super::{require_page, PageError};
use crate::middleware::CurrentSession;
use crate::pages::{self, Flash};
use crate::AppState;
use campusdesk_common::{
    auth::{Role, Session},
    db::{models::FileKind, StudentSummary},
    errors::{AppError, Result},
    metrics, ImportResult,
};

/// Body of `DELETE /admin/students/{id}`
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// One entry of `GET /admin/chatlogs`
#[derive(Debug, Serialize)]
pub struct ChatLogView {
    pub id: i32,
    pub user_type: String,
    pub user_id: i32,
    pub query: String,
    pub response: String,
    pub timestamp: String,
}

/// `GET /admin/dashboard`
pub async fn dashboard(
    State(state): State<AppState>,
    current: CurrentSession,
) -> std::result::Result<Html<String>, PageError> {
    let session = require_page(&current, Role::Admin)?;

    let stats = state.repo.aggregate_stats().await?;
    let activity = state.repo.chat_activity(7).await?;

    Ok(Html(pages::dashboard_page(
        session.display_name(),
        &stats,
        &activity,
    )))
}

/// `GET /admin/upload`
pub async fn upload_page(
    State(state): State<AppState>,
    current: CurrentSession,
) -> std::result::Result<Html<String>, PageError> {
    let session = require_page(&current, Role::Admin)?;
    let files = state.repo.list_uploaded_files().await?;
    Ok(Html(pages::upload_page(session.display_name(), &files, None)))
}

/// `POST /admin/upload`
pub async fn upload(
    State(state): State<AppState>,
    current: CurrentSession,
    multipart: Multipart,
) -> std::result::Result<Response, PageError> {
    let session = require_page(&current, Role::Admin)?;

    let (status, flash) = match receive_upload(&state, session, multipart).await {
        Ok(flash) => (StatusCode::OK, flash),
        Err(err) if err.is_client_error() => {
            err.log();
            (err.status_code(), Flash::error(err.public_message()))
        }
        Err(err) => return Err(err.into()),
    };

    let files = state.repo.list_uploaded_files().await?;
    let page = pages::upload_page(session.display_name(), &files, Some(&flash));

    Ok((status, Html(page)).into_response())
}

async fn read_file_field(multipart: &mut Multipart, limit: usize) -> Result<(String, Vec<u8>)> {
    let invalid = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge { limit }
        } else {
            AppError::Validation {
                message: e.body_text(),
                field: Some("file".to_string()),
            }
        }
    };

    while let Some(mut field) = multipart.next_field().await.map_err(invalid)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(AppError::validation("file", "No file selected"));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(invalid)? {
            if bytes.len() + chunk.len() > limit {
                return Err(AppError::PayloadTooLarge { limit });
            }
            bytes.extend_from_slice(&chunk);
        }
        return Ok((filename, bytes));
    }

    Err(AppError::validation("file", "No file part"))
}

async fn receive_upload(state: &AppState, session: &Session, mut multipart: Multipart) -> Result<Flash> {
    let limit = state.uploads.max_bytes();
    let (original_name, bytes) = read_file_field(&mut multipart, limit).await?;

    let stored = state.uploads.store(&original_name, &bytes).await?;
    state
        .repo
        .create_uploaded_file(
            &stored.filename,
            &stored.path.to_string_lossy(),
            stored.kind,
            Some(session.user_id),
        )
        .await?;

    metrics::record_upload(stored.kind.as_str());
    info!(
        filename = %stored.filename,
        kind = stored.kind.as_str(),
        size = bytes.len(),
        uploaded_by = session.user_id,
        "File uploaded"
    );

    if stored.kind != FileKind::Csv {
        return Ok(Flash::success(format!(
            "File {} uploaded successfully",
            stored.filename
        )));
    }

    // The upload row stays even when the import does not go through
    let flash = match state.importer.import_tabular(&stored.path).await {
        Ok(result @ ImportResult::Imported { .. }) => Flash::success(format!(
            "File {} uploaded. {}",
            stored.filename,
            result.summary()
        )),
        Ok(result @ ImportResult::MissingColumns { .. }) => Flash::warning(format!(
            "File {} uploaded but not imported. {}",
            stored.filename,
            result.summary()
        )),
        Err(err) => {
            err.log();
            warn!(filename = %stored.filename, "Import failed after upload");
            Flash::warning(format!(
                "File uploaded but import failed: {}",
                err.public_message()
            ))
        }
    };

    Ok(flash)
}

/// `GET /admin/students`
pub async fn list_students(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<Json<Vec<StudentSummary>>> {
    current.require(Role::Admin)?;

    let students = state.repo.list_students().await?;
    Ok(Json(students.iter().map(StudentSummary::from).collect()))
}

/// `DELETE /admin/students/{id}`
pub async fn delete_student(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<DeleteResponse>)> {
    let session = current.require(Role::Admin)?;

    match state.repo.delete_student(id).await? {
        Some(student) => {
            info!(student_id = id, deleted_by = session.user_id, "Student deleted");
            Ok((
                StatusCode::OK,
                Json(DeleteResponse {
                    success: true,
                    message: format!("Student {} deleted successfully", student.name),
                }),
            ))
        }
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(DeleteResponse {
                success: false,
                message: "Student not found".to_string(),
            }),
        )),
    }
}

/// `GET /admin/chatlogs`
pub async fn chat_logs(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<Json<Vec<ChatLogView>>> {
    current.require(Role::Admin)?;

    let logs = state.repo.list_chat_logs().await?;
    let views = logs
        .into_iter()
        .map(|log| ChatLogView {
            id: log.id,
            user_type: log.user_type,
            user_id: log.user_id,
            query: log.query,
            response: log.response,
            timestamp: log.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .collect();

    Ok(Json(views))
}
