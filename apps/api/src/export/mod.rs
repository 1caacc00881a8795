//! PDF and Excel renderings of the activity list.
//!
//! Rendering is CPU-bound and runs on the blocking pool; any failure becomes a
//! single `ExportFailed` with no partial document sent.

pub mod excel;
pub mod pdf;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::activities::service::{list_activities, ActivityFilter, ActivityScope};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::activity::ActivityRow;
use crate::state::AppState;

const PDF_CONTENT_TYPE: &str = "application/pdf";
const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PDF rendering failed: {0}")]
    Pdf(#[from] printpdf::Error),

    #[error("Workbook rendering failed: {0}")]
    Excel(#[from] rust_xlsxwriter::XlsxError),

    #[error("Render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::ExportFailed(err.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub sprint: Option<i32>,
}

impl ExportRequest {
    fn filter(&self) -> ActivityFilter {
        ActivityFilter {
            start_date: self.start_date,
            end_date: self.end_date,
            sprint: self.sprint,
            ..ActivityFilter::default()
        }
    }
}

/// Cell text shared by both formats.
pub(crate) fn column_values(a: &ActivityRow) -> [String; 12] {
    [
        a.activity_name.clone(),
        a.activity_date.to_string(),
        a.sprint.to_string(),
        a.status.clone(),
        a.priority.clone(),
        a.risk_level.clone(),
        a.gxp_scope.clone(),
        a.department.clone().unwrap_or_default(),
        a.it_type.clone().unwrap_or_default(),
        a.owner_name
            .clone()
            .or_else(|| a.owner_name_display.clone())
            .unwrap_or_default(),
        a.created_by_name.clone().unwrap_or_default(),
        format!("{}%", a.progress_percentage),
    ]
}

pub(crate) const COLUMN_HEADERS: [&str; 12] = [
    "Activity",
    "Date",
    "Sprint",
    "Status",
    "Priority",
    "Risk",
    "GxP",
    "Department",
    "IT Type",
    "Owner",
    "Created By",
    "Progress",
];

fn attachment_response(
    bytes: Vec<u8>,
    content_type: &'static str,
    filename: &'static str,
) -> Result<Response, AppError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={filename}"),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.into()))
}

/// POST /api/export/pdf
pub async fn handle_export_pdf(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ExportRequest>,
) -> Result<Response, AppError> {
    let scope = if user.is_admin() {
        ActivityScope::All
    } else {
        ActivityScope::CreatedBy(user.id)
    };
    let rows = list_activities(&state.db, scope, &req.filter()).await?;
    let count = rows.len();
    let username = user.username.clone();

    let bytes = tokio::task::spawn_blocking(move || pdf::render(&rows, &username))
        .await
        .map_err(ExportError::from)??;

    info!("PDF export of {count} activities for {}", user.username);
    attachment_response(bytes, PDF_CONTENT_TYPE, "activities.pdf")
}

/// POST /api/export/excel
pub async fn handle_export_excel(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ExportRequest>,
) -> Result<Response, AppError> {
    let rows = list_activities(&state.db, ActivityScope::All, &req.filter()).await?;
    let count = rows.len();

    let bytes = tokio::task::spawn_blocking(move || excel::render(&rows))
        .await
        .map_err(ExportError::from)??;

    info!("Excel export of {count} activities for {}", user.username);
    attachment_response(bytes, XLSX_CONTENT_TYPE, "activities.xlsx")
}
