use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection}, Multipart, State,
    },
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::uploads::store::ResumeObject;

pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;
/// Request body cap for upload routes: the file plus multipart framing.
pub const UPLOAD_BODY_LIMIT: usize = MAX_RESUME_BYTES + 1024 * 1024;

const FILE_TOO_LARGE: &str = "File exceeds 5 MiB limit";

const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];
const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub key: String,
}

struct UploadedFile {
    file_name: String,
    content_type: String,
    bytes: Bytes,
}

#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    civic_id: Option<String>,
}

/// POST /api/upload-mongo, POST /api/resumes/upload
///
/// Multipart form with `file` and `civicId`. The form is fully validated
/// before the store is called.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart?;
    let form = read_form(&mut multipart).await?;
    let (file, civic_id) = match (form.file, form.civic_id) {
        (Some(file), Some(civic_id)) => (file, civic_id),
        _ => return Err(AppError::validation("Missing file or civicId")),
    };
    validate_file(&file)?;

    let key = resume_key(&civic_id, &file.file_name, Uuid::new_v4());
    state
        .resumes
        .put(ResumeObject {
            key: key.clone(),
            civic_id: civic_id.clone(),
            file_name: file.file_name,
            content_type: file.content_type,
            uploaded_at: Utc::now(),
            bytes: file.bytes,
        })
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    info!("Stored resume {key} for civic id {civic_id}");
    Ok(Json(UploadResponse { success: true, key }))
}

async fn read_form(multipart: &mut Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(form_error)?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("resume").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(form_error)?;
                if !bytes.is_empty() {
                    form.file = Some(UploadedFile {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
            }
            Some("civicId") => {
                let text = field
                    .text()
                    .await
                    .map_err(form_error)?;
                let text = text.trim();
                if !text.is_empty() {
                    form.civic_id = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Reading past the route's body limit can only mean the file part is too big.
fn form_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::validation(FILE_TOO_LARGE)
    } else {
        AppError::validation(err.body_text())
    }
}

fn validate_file(file: &UploadedFile) -> Result<(), AppError> {
    if file.bytes.len() > MAX_RESUME_BYTES {
        return Err(AppError::validation(FILE_TOO_LARGE));
    }
    let by_type = ALLOWED_CONTENT_TYPES.contains(&file.content_type.as_str());
    let by_extension = file.content_type == "application/octet-stream"
        && extension(&file.file_name)
            .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
    if by_type || by_extension {
        Ok(())
    } else {
        Err(AppError::validation("Unsupported file type"))
    }
}

fn extension(file_name: &str) -> Option<&str> {
    file_name.rsplit_once('.').map(|(_, ext)| ext)
}

/// `resumes/{civic id}/{id}-{file name}`, with both path segments reduced to
/// a safe character set.
fn resume_key(civic_id: &str, file_name: &str, id: Uuid) -> String {
    let base_name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    format!(
        "resumes/{}/{id}-{}",
        sanitize_segment(civic_id),
        sanitize_segment(base_name)
    )
}

fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}
