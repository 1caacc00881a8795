//! File attachments: bytes on local disk under a generated name, metadata in
//! the `attachments` table.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::activities::service::require_activity;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::collaboration::AttachmentRow;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const ATTACHMENT_SELECT: &str = r#"
    SELECT a.*, u.username AS uploaded_by_name
    FROM attachments a
    LEFT JOIN users u ON a.uploaded_by = u.id
"#;

/// Directory holding uploaded files.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    fn path_for(&self, stored_name: &str) -> PathBuf {
        self.root.join(stored_name)
    }

    pub async fn save(&self, stored_name: &str, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::write(self.path_for(stored_name), bytes).await
    }

    /// `None` when the file is gone from disk.
    pub async fn read(&self, stored_name: &str) -> std::io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(stored_name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Missing files are not an error.
    pub async fn remove(&self, stored_name: &str) -> std::io::Result<()> {
        match tokio::fs::remove_file(self.path_for(stored_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Keeps ASCII letters, digits, `.`, `-` and `_`; everything else becomes `_`.
/// Path separators never survive, so the result cannot escape the store.
pub fn sanitize_filename(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original)
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.chars().take(120).collect()
    }
}

pub fn stored_name_for(original: &str) -> String {
    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        sanitize_filename(original)
    )
}

/// Header value with quotes and control characters replaced.
pub fn content_disposition(original: &str) -> String {
    let safe: String = original
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

pub fn resolve_mime(declared: Option<&str>, original: &str) -> String {
    declared
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            mime_guess::from_path(original)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
}

/// A multipart file part read fully into memory.
#[derive(Debug)]
pub struct Upload {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

/// Reads a multipart field chunk by chunk, stopping as soon as it exceeds
/// `limit`. Nothing is written to disk here.
pub async fn read_upload(mut field: Field<'_>, limit: usize) -> Result<Upload, AppError> {
    let original_name = field
        .file_name()
        .map(str::to_string)
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Uploaded file has no filename".to_string()))?;
    let mime_type = resolve_mime(field.content_type(), &original_name);

    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if buf.len() + chunk.len() > limit {
            return Err(AppError::UploadTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Upload {
        original_name,
        mime_type,
        bytes: buf.freeze(),
    })
}

pub fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    if err.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
        AppError::UploadTooLarge {
            limit: MAX_UPLOAD_BYTES,
        }
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", err.body_text()))
    }
}

pub async fn list_attachments(
    pool: &PgPool,
    activity_id: i64,
) -> Result<Vec<AttachmentRow>, sqlx::Error> {
    sqlx::query_as::<_, AttachmentRow>(&format!(
        "{ATTACHMENT_SELECT} WHERE a.activity_id = $1 ORDER BY a.uploaded_at DESC, a.id DESC"
    ))
    .bind(activity_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_attachment(pool: &PgPool, id: i64) -> Result<AttachmentRow, AppError> {
    sqlx::query_as::<_, AttachmentRow>(&format!("{ATTACHMENT_SELECT} WHERE a.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Attachment not found".to_string()))
}

/// Writes the file, then the metadata row. The file is removed again if the
/// row cannot be stored.
pub async fn store_attachment(
    pool: &PgPool,
    store: &AttachmentStore,
    user: &AuthUser,
    activity_id: i64,
    upload: Upload,
) -> Result<AttachmentRow, AppError> {
    require_activity(pool, activity_id).await?;

    let stored_name = stored_name_for(&upload.original_name);
    store.save(&stored_name, &upload.bytes).await?;

    let inserted: Result<i64, sqlx::Error> = sqlx::query_scalar(
        r#"
        INSERT INTO attachments (activity_id, filename, original_name, file_size, mime_type, uploaded_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(activity_id)
    .bind(&stored_name)
    .bind(&upload.original_name)
    .bind(upload.bytes.len() as i64)
    .bind(&upload.mime_type)
    .bind(user.id)
    .fetch_one(pool)
    .await;

    let id = match inserted {
        Ok(id) => id,
        Err(e) => {
            if let Err(rm) = store.remove(&stored_name).await {
                warn!("Failed to roll back attachment file {stored_name}: {rm}");
            }
            return Err(e.into());
        }
    };

    info!(
        "Attachment {id} ({} bytes) uploaded to activity {activity_id} by {}",
        upload.bytes.len(),
        user.username
    );
    fetch_attachment(pool, id).await
}

/// Metadata and bytes, `NotFound` if either is missing.
pub async fn load_attachment(
    pool: &PgPool,
    store: &AttachmentStore,
    id: i64,
) -> Result<(AttachmentRow, Vec<u8>), AppError> {
    let row = fetch_attachment(pool, id).await?;
    let bytes = store
        .read(&row.filename)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found on disk".to_string()))?;
    Ok((row, bytes))
}

/// Uploader or admin only.
pub async fn delete_attachment(
    pool: &PgPool,
    store: &AttachmentStore,
    user: &AuthUser,
    id: i64,
) -> Result<(), AppError> {
    let row = fetch_attachment(pool, id).await?;
    user.require_manage(row.uploaded_by, "attachment")?;

    sqlx::query("DELETE FROM attachments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if let Err(e) = store.remove(&row.filename).await {
        warn!("Attachment {id} row deleted but file {} remains: {e}", row.filename);
    }
    info!("Attachment {id} deleted by {}", user.username);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\docs\\Q1 plan.pdf"), "Q1_plan.pdf");
        assert_eq!(sanitize_filename("résumé.docx"), "r_sum_.docx");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename("   "), "file");
    }

    #[test]
    fn stored_names_are_unique_and_keep_the_extension() {
        let a = stored_name_for("report.pdf");
        let b = stored_name_for("report.pdf");
        assert_ne!(a, b);
        assert!(a.ends_with("-report.pdf"));
        assert_eq!(a.splitn(3, '-').count(), 3);
    }

    #[test]
    fn mime_prefers_declared_type() {
        assert_eq!(resolve_mime(Some("text/csv"), "x.pdf"), "text/csv");
        assert_eq!(resolve_mime(None, "x.pdf"), "application/pdf");
        assert_eq!(resolve_mime(Some(" "), "x.png"), "image/png");
        assert_eq!(resolve_mime(None, "noext"), "application/octet-stream");
    }

    #[test]
    fn disposition_quotes_are_neutralised() {
        assert_eq!(
            content_disposition("a\"b.txt"),
            "attachment; filename=\"a_b.txt\""
        );
    }

    #[tokio::test]
    async fn store_round_trip_and_missing_files() {
        let dir = TempDir::new().unwrap();
        let store = AttachmentStore::new(dir.path().join("uploads"));
        store.ensure_dir().await.unwrap();

        store.save("one.txt", b"hello").await.unwrap();
        assert_eq!(store.read("one.txt").await.unwrap(), Some(b"hello".to_vec()));

        store.remove("one.txt").await.unwrap();
        assert_eq!(store.read("one.txt").await.unwrap(), None);
        // second remove is a no-op
        store.remove("one.txt").await.unwrap();
    }
}
