use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::validation::{check_name, MAX_LEN_WORKOUT_NAME};
use crate::models::{
    validate_children, validate_new_workout, CreateWorkoutRequest, EditWorkoutRequest, WorkoutChildInput,
    WorkoutDetails, WorkoutKind, WorkoutSession,
};
use crate::services::session_tree::{load_children, SessionTree, TreeOwner};

/// Validates an edit payload and returns the new trimmed name, if any.
pub fn validate_edit(kind: WorkoutKind, request: &EditWorkoutRequest) -> Result<Option<String>, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = match request.name.as_deref() {
        Some(raw) => match check_name("name", raw, MAX_LEN_WORKOUT_NAME, &kind.missing_name_message()) {
            Ok(name) => Some(name),
            Err(name_errors) => {
                errors.merge(name_errors);
                None
            }
        },
        None => None,
    };

    if request.exercises.is_empty() {
        errors.add("exercises", kind.missing_exercises_message());
    }
    errors.merge(validate_children(&request.exercises));

    if errors.is_empty() {
        Ok(name)
    } else {
        Err(errors)
    }
}

/// Inserts a workout session with its tree and stored totals.
pub async fn insert_workout(
    tree: &mut SessionTree<'_>,
    profile_id: Uuid,
    name: &str,
    exercises: &[WorkoutChildInput],
) -> AppResult<Uuid> {
    let workout_id = Uuid::new_v4();

    sqlx::query("INSERT INTO workout_sessions (id, name, created_by) VALUES ($1, $2, $3)")
        .bind(workout_id)
        .bind(name)
        .bind(profile_id)
        .execute(tree.conn())
        .await?;

    let owner = TreeOwner::Workout(workout_id);
    tree.insert_children(owner, exercises).await?;
    tree.recompute_totals(owner).await?;

    Ok(workout_id)
}

pub async fn load_workout(conn: &mut PgConnection, workout_id: Uuid) -> AppResult<Option<WorkoutDetails>> {
    let workout = sqlx::query_as::<_, WorkoutSession>("SELECT * FROM workout_sessions WHERE id = $1")
        .bind(workout_id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(workout) = workout else { return Ok(None) };
    let exercises = load_children(conn, TreeOwner::Workout(workout_id)).await?;

    Ok(Some(WorkoutDetails { workout, exercises }))
}

#[derive(Clone)]
pub struct WorkoutService {
    db: PgPool,
}

impl WorkoutService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// The caller's workouts, newest first.
    pub async fn list(&self, profile_id: Uuid) -> AppResult<Vec<WorkoutSession>> {
        let workouts = sqlx::query_as::<_, WorkoutSession>(
            "SELECT * FROM workout_sessions WHERE created_by = $1 ORDER BY created_at DESC",
        )
        .bind(profile_id)
        .fetch_all(&self.db)
        .await?;
        Ok(workouts)
    }

    pub async fn create(&self, profile_id: Uuid, request: CreateWorkoutRequest) -> AppResult<WorkoutDetails> {
        let name = validate_new_workout(WorkoutKind::Session, &request.name, &request.exercises)?;

        let mut tx = self.db.begin().await?;

        let mut tree = SessionTree::new(&mut *tx, profile_id);
        let workout_id = insert_workout(&mut tree, profile_id, &name, &request.exercises).await?;

        let details = load_workout(&mut *tx, workout_id)
            .await?
            .ok_or_else(|| AppError::not_found("Workout not found"))?;
        tx.commit().await?;

        tracing::info!(
            "Profile {} logged workout {} with {} exercises",
            profile_id,
            workout_id,
            details.workout.total_exercises
        );
        Ok(details)
    }

    async fn owned(&self, conn: &mut PgConnection, profile_id: Uuid, workout_id: Uuid, lock: bool) -> AppResult<WorkoutSession> {
        let query = if lock {
            "SELECT * FROM workout_sessions WHERE id = $1 FOR UPDATE"
        } else {
            "SELECT * FROM workout_sessions WHERE id = $1"
        };

        let workout = sqlx::query_as::<_, WorkoutSession>(query)
            .bind(workout_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found("Workout not found"))?;

        if workout.created_by != profile_id {
            return Err(AppError::forbidden("You can only access your own workouts."));
        }
        Ok(workout)
    }

    pub async fn get(&self, profile_id: Uuid, workout_id: Uuid) -> AppResult<WorkoutDetails> {
        let mut conn = self.db.acquire().await?;
        let workout = self.owned(&mut *conn, profile_id, workout_id, false).await?;
        let exercises = load_children(&mut *conn, TreeOwner::Workout(workout_id)).await?;
        Ok(WorkoutDetails { workout, exercises })
    }

    /// Reconciles the workout's exercises with the payload and recomputes totals.
    pub async fn edit(&self, profile_id: Uuid, workout_id: Uuid, request: EditWorkoutRequest) -> AppResult<WorkoutDetails> {
        let name = validate_edit(WorkoutKind::Session, &request)?;

        let mut tx = self.db.begin().await?;
        let workout = self.owned(&mut *tx, profile_id, workout_id, true).await?;

        let owner = TreeOwner::Workout(workout_id);
        let mut tree = SessionTree::new(&mut *tx, profile_id);
        let tree_changed = tree.reconcile_children(owner, &request.exercises).await?;
        if tree_changed {
            tree.recompute_totals(owner).await?;
        }

        let rename = name.filter(|name| *name != workout.name);
        if tree_changed || rename.is_some() {
            sqlx::query(
                "UPDATE workout_sessions SET name = COALESCE($2, name), updated_at = NOW() WHERE id = $1",
            )
            .bind(workout_id)
            .bind(rename)
            .execute(&mut *tx)
            .await?;
        }

        let details = load_workout(&mut *tx, workout_id)
            .await?
            .ok_or_else(|| AppError::not_found("Workout not found"))?;
        tx.commit().await?;

        Ok(details)
    }

    pub async fn delete(&self, profile_id: Uuid, workout_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        self.owned(&mut *tx, profile_id, workout_id, true).await?;

        SessionTree::new(&mut *tx, profile_id)
            .delete_tree(TreeOwner::Workout(workout_id))
            .await?;

        sqlx::query("DELETE FROM workout_sessions WHERE id = $1")
            .bind(workout_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!("Profile {} deleted workout {}", profile_id, workout_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExerciseRef, ExerciseSessionInput};

    fn request(name: Option<&str>, exercises: usize) -> EditWorkoutRequest {
        EditWorkoutRequest {
            name: name.map(str::to_string),
            exercises: (0..exercises)
                .map(|_| {
                    WorkoutChildInput::Exercise(ExerciseSessionInput {
                        id: None,
                        exercise: ExerciseRef { id: Uuid::new_v4() },
                        notes: None,
                        session_data: vec![],
                    })
                })
                .collect(),
        }
    }

    #[test]
    fn test_validate_edit_keeps_name_optional() {
        assert_eq!(validate_edit(WorkoutKind::Session, &request(None, 1)).unwrap(), None);
        assert_eq!(
            validate_edit(WorkoutKind::Session, &request(Some(" Pull "), 1)).unwrap(),
            Some("Pull".to_string())
        );
    }

    #[test]
    fn test_validate_edit_errors() {
        let errors = validate_edit(WorkoutKind::Template, &request(Some(" "), 0)).unwrap_err();
        assert_eq!(
            errors.get("name"),
            Some(&["Provide a name for your workout template".to_string()][..])
        );
        assert_eq!(
            errors.get("exercises"),
            Some(&["Please add exercises to your workout template".to_string()][..])
        );
    }
}
