//! Report routes

use super::error::ApiError;
use super::AppState;
use crate::attachments::AttachmentError;
use crate::pipeline::ReportJob;
use crate::report::{Report, ReportId, ReportResult, ReportSummary};
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub report_id: ReportId,
    pub message: String,
    pub status_endpoint: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportDetail {
    pub metadata: Report,
    pub analysis_result: Option<ReportResult>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

struct Upload {
    filename: String,
    content_type: Option<String>,
    bytes: Bytes,
}

fn validate_repo_url(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|e| {
        ApiError::BadRequest(format!("Invalid github_repo_url '{}': {}", trimmed, e))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ApiError::BadRequest(format!(
            "Invalid github_repo_url '{}': expected an absolute http(s) URL",
            trimmed
        )));
    }
    Ok(trimmed.to_string())
}

/// Accepts a report request, stores its uploads and record, then starts the pipeline
pub async fn submit_report(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let mut repo_url = None;
    let mut target_platform = None;
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("github_repo_url") => repo_url = Some(field.text().await?),
            Some("target_platform") => {
                let text = field.text().await?;
                let text = text.trim();
                target_platform = (!text.is_empty()).then(|| text.to_string());
            }
            Some("documentation_files") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                if filename.is_empty() {
                    debug!("Skipping documentation part without a filename");
                    continue;
                }
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                uploads.push(Upload {
                    filename,
                    content_type,
                    bytes,
                });
            }
            other => debug!(field = ?other, "Ignoring unknown form field"),
        }
    }

    let repo_url = repo_url
        .ok_or_else(|| ApiError::BadRequest("Missing required field: github_repo_url".to_string()))
        .and_then(|raw| validate_repo_url(&raw))?;

    let report_id = ReportId::new();
    let mut attachment_refs = Vec::with_capacity(uploads.len());
    if !uploads.is_empty() {
        let store = state.attachments.as_ref().ok_or_else(|| {
            ApiError::Internal(format!(
                "Could not upload file {}: attachment storage is not configured",
                uploads[0].filename
            ))
        })?;

        for upload in &uploads {
            let reference = store
                .put(
                    &report_id,
                    &upload.filename,
                    upload.content_type.as_deref(),
                    &upload.bytes,
                )
                .await
                .map_err(|e| match e {
                    AttachmentError::InvalidFilename(_) => ApiError::BadRequest(e.to_string()),
                    other => ApiError::Internal(format!(
                        "Could not upload file {}: {}",
                        upload.filename, other
                    )),
                })?;
            attachment_refs.push(reference);
        }
    }

    let report = Report::pending(report_id, repo_url, target_platform, attachment_refs);
    let job = ReportJob::from(&report);
    state.store.create(report).await?;

    info!(
        report_id = %report_id,
        url = %job.source_url,
        attachments = job.attachment_refs.len(),
        "Report generation initiated"
    );
    state.pipeline.spawn(job);

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            report_id,
            message: "Report generation initiated.".to_string(),
            status_endpoint: format!("/reports/{}", report_id),
        }),
    ))
}

/// Checks pagination bounds, returning `(skip, limit)` ready for the store
pub fn validate_page(query: &ListQuery) -> Result<(usize, usize), ApiError> {
    let skip = query.skip.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if skip < 0 {
        return Err(ApiError::BadRequest(
            "Skip parameter cannot be negative.".to_string(),
        ));
    }
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(
            "Limit parameter must be between 1 and 100.".to_string(),
        ));
    }
    Ok((skip as usize, limit as usize))
}

pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<ReportSummary>>, ApiError> {
    let Query(query) = query?;
    let (skip, limit) = validate_page(&query)?;
    let summaries = state.store.list(skip, limit).await?;
    Ok(Json(summaries))
}

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ReportDetail>, ApiError> {
    let id: ReportId = id.parse().map_err(|_| ApiError::NotFound)?;
    let report = state.store.get(&id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(ReportDetail {
        analysis_result: report.result.clone(),
        metadata: report,
    }))
}
