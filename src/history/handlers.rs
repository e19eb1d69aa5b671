use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::dto::MessageResponse,
    auth::jwt::AuthUser,
    error::ApiError,
    history::{
        dto::{SaveScanRequest, ScanHistoryItem, StatsResponse},
        repo::ScanRecord,
    },
    state::AppState,
};

pub fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/history/save", post(save_scan))
        .route("/history", get(list_history))
        .route("/history/:id", delete(delete_scan))
        .route("/stats", get(get_stats))
}

/// Input checks applied before any persistence call.
fn validate_save(payload: &SaveScanRequest) -> Result<(), ApiError> {
    if payload.detection_result.trim().is_empty() || payload.image_data.is_empty() {
        return Err(ApiError::Validation("Incomplete scan data.".into()));
    }
    if !(0.0..=1.0).contains(&payload.accuracy) {
        return Err(ApiError::Validation(
            "Accuracy must be between 0 and 1.".into(),
        ));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn save_scan(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<SaveScanRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    validate_save(&payload)?;

    let record = ScanRecord::append(
        &state.db,
        claims.sub,
        &payload.image_data,
        payload.detection_result.trim(),
        payload.accuracy,
        payload.recommendation.as_ref(),
    )
    .await?;

    info!(user_id = %claims.sub, scan_id = %record.id, "scan history saved");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "History saved successfully.".into(),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_history(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<ScanHistoryItem>>, ApiError> {
    let records = ScanRecord::list_by_user(&state.db, claims.sub).await?;
    let items = records.into_iter().map(ScanHistoryItem::from).collect();
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn delete_scan(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = ScanRecord::remove(&state.db, id, claims.sub).await?;
    if !removed {
        warn!(user_id = %claims.sub, scan_id = %id, "delete of missing or foreign record");
        return Err(ApiError::NotFound("History record not found.".into()));
    }

    info!(user_id = %claims.sub, scan_id = %id, "scan history deleted");
    Ok(Json(MessageResponse {
        message: "History deleted successfully.".into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_stats(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = ScanRecord::stats(&state.db, claims.sub).await?;
    Ok(Json(StatsResponse::from(stats)))
}
