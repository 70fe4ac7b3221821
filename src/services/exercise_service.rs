use std::collections::{HashMap, HashSet};

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::validation::{check_name, MAX_LEN_EXERCISE_NAME};
use crate::models::{
    CreateExerciseRequest, Exercise, ExerciseProgressResponse, ExerciseResponse, ExerciseSearchResponse,
    MuscleGroup, ProgressEntry,
};
use crate::services::profile_service::MEDIA_NOT_CONFIGURED;
use crate::services::{JobType, MediaKind, TaskQueue};

pub const EXERCISE_IN_USE: &str = "This exercise is used in your workouts and cannot be deleted.";

/// `ILIKE` pattern matching `name` anywhere, with wildcards in the input escaped.
pub fn contains_pattern(name: &str) -> String {
    let mut pattern = String::with_capacity(name.len() + 2);
    pattern.push('%');
    for c in name.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Trimmed, non-empty instruction lines.
pub fn clean_instructions(instructions: &[String]) -> Vec<String> {
    instructions
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, sqlx::FromRow)]
struct GroupLink {
    exercise_id: Uuid,
    id: Uuid,
    name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct InstructionRow {
    exercise_id: Uuid,
    text: String,
}

/// Attaches muscle groups and instructions to each exercise, keeping order.
async fn to_responses(conn: &mut PgConnection, exercises: Vec<Exercise>) -> AppResult<Vec<ExerciseResponse>> {
    if exercises.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = exercises.iter().map(|e| e.id).collect();

    let group_rows = sqlx::query_as::<_, GroupLink>(
        "SELECT emg.exercise_id, mg.id, mg.name
         FROM exercise_muscle_groups emg
         JOIN muscle_groups mg ON mg.id = emg.muscle_group_id
         WHERE emg.exercise_id = ANY($1)
         ORDER BY mg.name",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let instruction_rows = sqlx::query_as::<_, InstructionRow>(
        "SELECT exercise_id, text FROM exercise_instructions
         WHERE exercise_id = ANY($1)
         ORDER BY exercise_id, position",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut groups: HashMap<Uuid, Vec<MuscleGroup>> = HashMap::new();
    for row in group_rows {
        groups.entry(row.exercise_id).or_default().push(MuscleGroup {
            id: row.id,
            name: row.name,
        });
    }

    let mut instructions: HashMap<Uuid, Vec<String>> = HashMap::new();
    for row in instruction_rows {
        instructions.entry(row.exercise_id).or_default().push(row.text);
    }

    Ok(exercises
        .into_iter()
        .map(|exercise| {
            let id = exercise.id;
            ExerciseResponse::new(
                exercise,
                groups.remove(&id).unwrap_or_default(),
                instructions.remove(&id).unwrap_or_default(),
            )
        })
        .collect())
}

#[derive(Clone)]
pub struct ExerciseService {
    db: PgPool,
    tasks: TaskQueue,
    media_enabled: bool,
}

impl ExerciseService {
    pub fn new(db: PgPool, tasks: TaskQueue, media_enabled: bool) -> Self {
        Self {
            db,
            tasks,
            media_enabled,
        }
    }

    pub async fn muscle_groups(&self) -> AppResult<Vec<MuscleGroup>> {
        let groups = sqlx::query_as::<_, MuscleGroup>("SELECT id, name FROM muscle_groups ORDER BY name")
            .fetch_all(&self.db)
            .await?;
        Ok(groups)
    }

    /// Case-insensitive name search split into the caller's own exercises and
    /// everything else they can see.
    pub async fn search(&self, profile_id: Uuid, name: &str) -> AppResult<ExerciseSearchResponse> {
        let pattern = contains_pattern(name);
        let mut conn = self.db.acquire().await?;

        let own = sqlx::query_as::<_, Exercise>(
            "SELECT * FROM exercises
             WHERE created_by = $1 AND name ILIKE $2
             ORDER BY name",
        )
        .bind(profile_id)
        .bind(&pattern)
        .fetch_all(&mut *conn)
        .await?;

        let published = sqlx::query_as::<_, Exercise>(
            "SELECT * FROM exercises
             WHERE (created_by IS NULL OR (is_published AND created_by <> $1)) AND name ILIKE $2
             ORDER BY name",
        )
        .bind(profile_id)
        .bind(&pattern)
        .fetch_all(&mut *conn)
        .await?;

        Ok(ExerciseSearchResponse {
            exercises_by_user: to_responses(&mut *conn, own).await?,
            published: to_responses(&mut *conn, published).await?,
        })
    }

    pub async fn create(&self, profile_id: Uuid, request: CreateExerciseRequest) -> AppResult<ExerciseResponse> {
        let mut errors = FieldErrors::new();
        if let Err(validation) = request.validate() {
            errors.merge(validation.into());
        }
        let name = match check_name(
            "name",
            &request.name,
            MAX_LEN_EXERCISE_NAME,
            "Provide a name for your exercise",
        ) {
            Ok(name) => Some(name),
            Err(name_errors) => {
                if errors.get("name").is_none() {
                    errors.merge(name_errors);
                }
                None
            }
        };

        let mut group_ids = Vec::new();
        let mut seen = HashSet::new();
        for id in &request.targeted_muscle_groups {
            if seen.insert(*id) {
                group_ids.push(*id);
            }
        }

        let mut tx = self.db.begin().await?;

        let known: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM muscle_groups WHERE id = ANY($1)")
            .bind(&group_ids)
            .fetch_all(&mut *tx)
            .await?;
        for id in group_ids.iter().filter(|id| !known.contains(id)) {
            errors.add(
                "targeted_muscle_groups",
                format!("Invalid pk \"{}\" - object does not exist.", id),
            );
        }

        let name = match name {
            Some(name) if errors.is_empty() => name,
            _ => return Err(AppError::Validation(errors)),
        };

        let exercise = sqlx::query_as::<_, Exercise>(
            "INSERT INTO exercises (id, name, is_cardio, bodyweight, created_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&name)
        .bind(request.is_cardio)
        .bind(request.bodyweight)
        .bind(profile_id)
        .fetch_one(&mut *tx)
        .await?;

        for group_id in &group_ids {
            sqlx::query("INSERT INTO exercise_muscle_groups (exercise_id, muscle_group_id) VALUES ($1, $2)")
                .bind(exercise.id)
                .bind(group_id)
                .execute(&mut *tx)
                .await?;
        }

        for (position, text) in clean_instructions(&request.instructions).iter().enumerate() {
            sqlx::query("INSERT INTO exercise_instructions (id, exercise_id, position, text) VALUES ($1, $2, $3, $4)")
                .bind(Uuid::new_v4())
                .bind(exercise.id)
                .bind(position as i32)
                .bind(text)
                .execute(&mut *tx)
                .await?;
        }

        let mut responses = to_responses(&mut *tx, vec![exercise]).await?;
        tx.commit().await?;

        tracing::info!("Profile {} created exercise {}", profile_id, name);
        responses
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Created exercise was not returned").into())
    }

    async fn find(&self, exercise_id: Uuid) -> AppResult<Exercise> {
        sqlx::query_as::<_, Exercise>("SELECT * FROM exercises WHERE id = $1")
            .bind(exercise_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Exercise not found"))
    }

    async fn find_visible(&self, profile_id: Uuid, exercise_id: Uuid) -> AppResult<Exercise> {
        let exercise = self.find(exercise_id).await?;
        if exercise.is_visible_to(profile_id) {
            Ok(exercise)
        } else {
            Err(AppError::not_found("Exercise not found"))
        }
    }

    async fn find_owned(&self, profile_id: Uuid, exercise_id: Uuid, action: &str) -> AppResult<Exercise> {
        let exercise = self.find_visible(profile_id, exercise_id).await?;
        if exercise.is_owned_by(profile_id) {
            Ok(exercise)
        } else {
            Err(AppError::forbidden(format!("You can only {} your own exercises.", action)))
        }
    }

    pub async fn get(&self, profile_id: Uuid, exercise_id: Uuid) -> AppResult<ExerciseResponse> {
        let exercise = self.find_visible(profile_id, exercise_id).await?;
        let mut conn = self.db.acquire().await?;
        let mut responses = to_responses(&mut *conn, vec![exercise]).await?;
        responses
            .pop()
            .ok_or_else(|| AppError::not_found("Exercise not found"))
    }

    pub async fn publish(&self, profile_id: Uuid, exercise_id: Uuid) -> AppResult<ExerciseResponse> {
        self.find_owned(profile_id, exercise_id, "publish").await?;

        let exercise = sqlx::query_as::<_, Exercise>(
            "UPDATE exercises SET is_published = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(exercise_id)
        .fetch_one(&self.db)
        .await?;

        let mut conn = self.db.acquire().await?;
        let mut responses = to_responses(&mut *conn, vec![exercise]).await?;
        responses
            .pop()
            .ok_or_else(|| AppError::not_found("Exercise not found"))
    }

    pub async fn delete(&self, profile_id: Uuid, exercise_id: Uuid) -> AppResult<()> {
        let exercise = self.find_owned(profile_id, exercise_id, "delete").await?;

        let in_use: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM exercise_sessions WHERE exercise_id = $1)")
            .bind(exercise_id)
            .fetch_one(&self.db)
            .await?;
        if in_use {
            return Err(AppError::bad_request(EXERCISE_IN_USE));
        }

        sqlx::query("DELETE FROM exercises WHERE id = $1")
            .bind(exercise_id)
            .execute(&self.db)
            .await
            .map_err(|err| match &err {
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    AppError::bad_request(EXERCISE_IN_USE)
                }
                _ => AppError::Database(err),
            })?;

        if let Some(storage_key) = exercise.video_key {
            self.tasks.enqueue(JobType::DeleteMedia { storage_key });
        }
        Ok(())
    }

    pub async fn upload_video(
        &self,
        profile_id: Uuid,
        exercise_id: Uuid,
        data: Vec<u8>,
        content_type: &str,
    ) -> AppResult<()> {
        if !self.media_enabled {
            return Err(AppError::bad_request(MEDIA_NOT_CONFIGURED));
        }
        self.find_owned(profile_id, exercise_id, "edit").await?;

        if data.is_empty() || !MediaKind::ExerciseVideo.accepts(content_type) {
            return Err(FieldErrors::single("video", "Upload a valid video file.").into());
        }

        self.tasks.enqueue(JobType::UploadExerciseVideo {
            exercise_id,
            user_id: profile_id,
            data,
            content_type: content_type.to_string(),
        });
        Ok(())
    }

    /// The caller's logged sets for one exercise, oldest first.
    pub async fn progress(&self, profile_id: Uuid, exercise_id: Uuid) -> AppResult<ExerciseProgressResponse> {
        self.find_visible(profile_id, exercise_id).await?;

        let entries = sqlx::query_as::<_, ProgressEntry>(
            "SELECT weight, reps, recorded_at FROM set_history
             WHERE created_by = $1 AND exercise_id = $2
             ORDER BY recorded_at ASC",
        )
        .bind(profile_id)
        .bind(exercise_id)
        .fetch_all(&self.db)
        .await?;

        Ok(ExerciseProgressResponse { exercise_id, entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern() {
        assert_eq!(contains_pattern(" bench "), "%bench%");
        assert_eq!(contains_pattern(""), "%%");
        assert_eq!(contains_pattern("100%_a"), "%100\\%\\_a%");
    }

    #[test]
    fn test_clean_instructions() {
        let lines = vec![
            "  Brace your core ".to_string(),
            "".to_string(),
            "   ".to_string(),
            "Drive through the heels".to_string(),
        ];
        assert_eq!(
            clean_instructions(&lines),
            vec!["Brace your core".to_string(), "Drive through the heels".to_string()]
        );
    }
}
