use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{
    last_weigh_in_label, ActivityLevel, Fitness, FitnessGoal, FitnessResponse, MeasureHistoryEntry, Measures,
    MeasuresResponse, UpdateMeasuresRequest, WeightEntry, WeightSummary,
};

pub fn validate_measures(request: &UpdateMeasuresRequest) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if let Some(height) = request.height {
        if height <= 0 {
            errors.add("height", "Height must be greater than 0.");
        }
    }
    if let Some(weight) = request.weight {
        if !weight.is_finite() || weight < 0.0 {
            errors.add("weight", "Weight cannot be negative.");
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Weight summary from history entries ordered oldest first.
pub fn summarize_weight(
    current: Option<f64>,
    history: &[MeasureHistoryEntry],
    today: NaiveDate,
) -> WeightSummary {
    let history: Vec<WeightEntry> = history
        .iter()
        .filter_map(|entry| {
            entry.weight.map(|weight| WeightEntry {
                weight,
                date: entry.recorded_at.date_naive(),
            })
        })
        .collect();

    let last_weigh_in = history
        .last()
        .map(|entry| last_weigh_in_label(entry.date, today));

    WeightSummary {
        weight: current,
        last_weigh_in,
        history,
    }
}

#[derive(Clone)]
pub struct HealthService {
    db: PgPool,
}

impl HealthService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn measures(&self, profile_id: Uuid) -> AppResult<Measures> {
        sqlx::query_as::<_, Measures>("SELECT * FROM measures WHERE profile_id = $1")
            .bind(profile_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Measures not found"))
    }

    pub async fn get_measures(&self, profile_id: Uuid) -> AppResult<MeasuresResponse> {
        let measures = self.measures(profile_id).await?;
        Ok(MeasuresResponse::from(&measures))
    }

    /// Applies the provided fields and records a history snapshot when anything changed.
    pub async fn update_measures(
        &self,
        profile_id: Uuid,
        request: UpdateMeasuresRequest,
    ) -> AppResult<MeasuresResponse> {
        validate_measures(&request)?;

        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, Measures>("SELECT * FROM measures WHERE profile_id = $1 FOR UPDATE")
            .bind(profile_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Measures not found"))?;

        let height = request.height.or(current.height);
        let weight = request.weight.or(current.weight);

        if height != current.height || weight != current.weight {
            sqlx::query("UPDATE measures SET height = $2, weight = $3, updated_at = NOW() WHERE profile_id = $1")
                .bind(profile_id)
                .bind(height)
                .bind(weight)
                .execute(&mut *tx)
                .await?;

            sqlx::query("INSERT INTO measure_history (id, profile_id, height, weight) VALUES ($1, $2, $3, $4)")
                .bind(Uuid::new_v4())
                .bind(profile_id)
                .bind(height)
                .bind(weight)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(MeasuresResponse { height, weight })
    }

    pub async fn weight_summary(&self, profile_id: Uuid) -> AppResult<WeightSummary> {
        let measures = self.measures(profile_id).await?;

        let history = sqlx::query_as::<_, MeasureHistoryEntry>(
            "SELECT height, weight, recorded_at FROM measure_history
             WHERE profile_id = $1 AND weight IS NOT NULL
             ORDER BY recorded_at ASC",
        )
        .bind(profile_id)
        .fetch_all(&self.db)
        .await?;

        Ok(summarize_weight(measures.weight, &history, Utc::now().date_naive()))
    }

    pub async fn get_fitness(&self, profile_id: Uuid) -> AppResult<FitnessResponse> {
        let fitness = sqlx::query_as::<_, Fitness>("SELECT * FROM fitness WHERE profile_id = $1")
            .bind(profile_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Fitness not found"))?;
        Ok(FitnessResponse::from(&fitness))
    }

    pub async fn set_activity(&self, profile_id: Uuid, raw: &str) -> AppResult<FitnessResponse> {
        let activity = ActivityLevel::parse(raw.trim())
            .ok_or_else(|| AppError::bad_request(format!("Invalid activity choice: {}", raw)))?;

        let fitness = sqlx::query_as::<_, Fitness>(
            "UPDATE fitness SET activity = $2, updated_at = NOW() WHERE profile_id = $1 RETURNING *",
        )
        .bind(profile_id)
        .bind(activity.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Fitness not found"))?;

        Ok(FitnessResponse::from(&fitness))
    }

    pub async fn set_goal(&self, profile_id: Uuid, raw: &str) -> AppResult<FitnessResponse> {
        let goal = FitnessGoal::parse(raw.trim())
            .ok_or_else(|| AppError::bad_request(format!("Invalid goal choice: {}", raw)))?;

        let fitness = sqlx::query_as::<_, Fitness>(
            "UPDATE fitness SET goal = $2, updated_at = NOW() WHERE profile_id = $1 RETURNING *",
        )
        .bind(profile_id)
        .bind(goal.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Fitness not found"))?;

        Ok(FitnessResponse::from(&fitness))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(weight: Option<f64>, y: i32, m: u32, d: u32) -> MeasureHistoryEntry {
        MeasureHistoryEntry {
            height: Some(180),
            weight,
            recorded_at: Utc.with_ymd_and_hms(y, m, d, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_validate_measures() {
        let ok = UpdateMeasuresRequest {
            height: Some(180),
            weight: Some(0.0),
        };
        assert!(validate_measures(&ok).is_ok());

        let bad = UpdateMeasuresRequest {
            height: Some(0),
            weight: Some(-1.0),
        };
        let errors = validate_measures(&bad).unwrap_err();
        assert!(errors.get("height").is_some());
        assert!(errors.get("weight").is_some());

        let empty = UpdateMeasuresRequest {
            height: None,
            weight: None,
        };
        assert!(validate_measures(&empty).is_ok());
    }

    #[test]
    fn test_weight_summary() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let history = vec![
            entry(Some(82.0), 2024, 5, 1),
            entry(None, 2024, 5, 4),
            entry(Some(81.2), 2024, 5, 9),
        ];

        let summary = summarize_weight(Some(81.2), &history, today);
        assert_eq!(summary.history.len(), 2);
        assert_eq!(summary.last_weigh_in.as_deref(), Some("Yesterday"));
        assert_eq!(summary.weight, Some(81.2));
    }

    #[test]
    fn test_weight_summary_without_history() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let summary = summarize_weight(None, &[], today);
        assert!(summary.history.is_empty());
        assert!(summary.last_weigh_in.is_none());
    }
}
