use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::history::repo::{ScanRecord, UserStats};

/// Request body for saving a completed diagnosis.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveScanRequest {
    pub detection_result: String,
    pub accuracy: f64,
    #[serde(default)]
    pub recommendation: Option<serde_json::Value>,
    pub image_data: String,
}

/// One history entry as the client sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanHistoryItem {
    pub id: Uuid,
    pub image_data: String,
    pub detection_result: String,
    pub accuracy: f64,
    pub recommendation: Option<serde_json::Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub scanned_at: OffsetDateTime,
}

impl From<ScanRecord> for ScanHistoryItem {
    fn from(r: ScanRecord) -> Self {
        Self {
            id: r.id,
            image_data: r.image_data,
            detection_result: r.detection_result,
            accuracy: r.accuracy,
            recommendation: r.recommendation,
            scanned_at: r.scanned_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_scans: i64,
    pub diseases_detected: i64,
    pub average_accuracy: f64,
    pub scans_this_month: i64,
}

impl From<UserStats> for StatsResponse {
    fn from(s: UserStats) -> Self {
        Self {
            total_scans: s.total_scans,
            diseases_detected: s.diseases_detected,
            average_accuracy: s.average_accuracy,
            scans_this_month: s.scans_this_month,
        }
    }
}
