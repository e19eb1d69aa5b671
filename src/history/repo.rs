use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Label the classifier emits for a healthy leaf; everything else counts as
/// a detected disease in the stats.
pub const HEALTHY_LABEL: &str = "Healthy";

/// One completed diagnosis. Immutable once written, except for deletion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScanRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_data: String,
    pub detection_result: String,
    pub accuracy: f64,
    pub recommendation: Option<serde_json::Value>,
    pub scanned_at: OffsetDateTime,
}

/// Aggregates over one user's scan history.
#[derive(Debug, Clone, Default, FromRow)]
pub struct UserStats {
    pub total_scans: i64,
    pub diseases_detected: i64,
    pub average_accuracy: f64,
    pub scans_this_month: i64,
}

impl ScanRecord {
    /// Insert a new record; `scanned_at` is assigned by the database.
    pub async fn append(
        db: &PgPool,
        user_id: Uuid,
        image_data: &str,
        detection_result: &str,
        accuracy: f64,
        recommendation: Option<&serde_json::Value>,
    ) -> anyhow::Result<ScanRecord> {
        let record = sqlx::query_as::<_, ScanRecord>(
            r#"
            INSERT INTO scan_history (user_id, image_data, detection_result, accuracy, recommendation)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, image_data, detection_result, accuracy, recommendation, scanned_at
            "#,
        )
        .bind(user_id)
        .bind(image_data)
        .bind(detection_result)
        .bind(accuracy)
        .bind(recommendation)
        .fetch_one(db)
        .await?;
        Ok(record)
    }

    /// All records owned by the user, newest first. Search and alternative
    /// orderings are a client concern at this scale.
    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<ScanRecord>> {
        let rows = sqlx::query_as::<_, ScanRecord>(
            r#"
            SELECT id, user_id, image_data, detection_result, accuracy, recommendation, scanned_at
            FROM scan_history
            WHERE user_id = $1
            ORDER BY scanned_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Delete iff the row belongs to the user. Returns whether a row was
    /// removed; a wrong id and a wrong owner are indistinguishable.
    pub async fn remove(db: &PgPool, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM scan_history WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One aggregate pass over the user's rows. An empty history averages
    /// to 0, never NULL.
    pub async fn stats(db: &PgPool, user_id: Uuid) -> anyhow::Result<UserStats> {
        let stats = sqlx::query_as::<_, UserStats>(
            r#"
            SELECT
                COUNT(*) AS total_scans,
                COUNT(*) FILTER (WHERE detection_result <> $2) AS diseases_detected,
                COALESCE(AVG(accuracy), 0.0) AS average_accuracy,
                COUNT(*) FILTER (
                    WHERE date_trunc('month', scanned_at) = date_trunc('month', now())
                ) AS scans_this_month
            FROM scan_history
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(HEALTHY_LABEL)
        .fetch_one(db)
        .await?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero_not_nan() {
        let stats = UserStats::default();
        assert_eq!(stats.total_scans, 0);
        assert_eq!(stats.average_accuracy, 0.0);
        assert!(!stats.average_accuracy.is_nan());
    }
}
