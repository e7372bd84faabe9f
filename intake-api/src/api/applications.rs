//! Franchise application endpoints

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use intake_common::FileBlob;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::db::applications::{application_stats, list_applications, load_application};
use crate::error::{ApiResult, IntakeError};
use crate::intake;
use crate::upload::{SinkError, UploadParams};
use crate::AppState;

/// Whole-request ceiling; per-file limits are enforced while streaming
const REQUEST_BODY_LIMIT: usize = 40 * 1024 * 1024;

/// POST /api/applications
///
/// Multipart intake: optional `formData` snapshot, flat fields, and files.
pub async fn submit_application(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    info!("New application submission");
    let multipart = multipart?;

    let application_id =
        intake::submit(multipart, &state.db, &state.uploads, state.sink.as_ref()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Application submitted successfully!",
            "applicationId": application_id,
        })),
    ))
}

/// GET /api/applications
///
/// All applications, newest first.
pub async fn list_all(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let applications = list_applications(&state.db).await?;

    Ok(Json(json!({
        "success": true,
        "count": applications.len(),
        "data": applications,
    })))
}

/// GET /api/applications/:id
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    // Ids that are not UUIDs cannot name a stored application
    let application = match Uuid::parse_str(&id) {
        Ok(id) => load_application(&state.db, id).await?,
        Err(_) => None,
    };
    let application =
        application.ok_or_else(|| IntakeError::NotFound("Application not found".to_string()))?;

    Ok(Json(json!({"success": true, "data": application})))
}

/// GET /api/applications/stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let stats = application_stats(&state.db).await?;
    Ok(Json(json!({"success": true, "data": stats})))
}

/// GET /api/applications/cloudinary-raw-test
///
/// Stores a tiny text file as a raw object to check the storage account.
pub async fn cloudinary_raw_test(State(state): State<AppState>) -> Response {
    let file = FileBlob::new("test.txt", "text/plain", b"Hello World!".to_vec());
    let folder = format!("{}/test", state.uploads.folder);
    let params = UploadParams::for_file(&folder, "raw-test", &file, Utc::now().timestamp_millis());

    match state.sink.upload(&params, &file).await {
        Ok(result) => Json(json!({"success": true, "result": result})).into_response(),
        Err(SinkError::NotConfigured(missing)) => {
            error!(%missing, "Raw upload test without storage credentials");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "message": "Cloudinary not configured"})),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Raw upload test failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "Cloudinary raw test failed",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// Build application routes
pub fn application_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/applications",
            get(list_all)
                .post(submit_application)
                .layer(DefaultBodyLimit::max(REQUEST_BODY_LIMIT)),
        )
        .route("/api/applications/stats", get(get_stats))
        .route("/api/applications/cloudinary-raw-test", get(cloudinary_raw_test))
        .route("/api/applications/:id", get(get_application))
}
