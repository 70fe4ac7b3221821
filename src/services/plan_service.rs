use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::validation::{check_name, MAX_LEN_PLAN_NAME};
use crate::models::{
    validate_new_workout, CreatePlanRequest, CreateRoutineRequest, DayOfWeek, PlanDetails, PlanSummary, Routine,
    RoutineDay, RoutineDetails, RoutineWorkoutRef, WorkoutKind, WorkoutPlan,
};
use crate::services::session_tree::SessionTree;
use crate::services::template_service::{insert_template, load_template};
use crate::services::workout_service::{insert_workout, load_workout};

/// Validated plan payload: trimmed plan name and trimmed workout names.
pub fn validate_plan(request: &CreatePlanRequest) -> Result<(String, Vec<String>), FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = match check_name(
        "name",
        &request.name,
        MAX_LEN_PLAN_NAME,
        "Provide a name for your workout plan",
    ) {
        Ok(name) => Some(name),
        Err(name_errors) => {
            errors.merge(name_errors);
            None
        }
    };

    if request.workouts.is_empty() {
        errors.add("workouts", "Workout plan must have workouts");
    }

    let mut workout_names = Vec::with_capacity(request.workouts.len());
    for (index, workout) in request.workouts.iter().enumerate() {
        match validate_new_workout(WorkoutKind::Session, &workout.name, &workout.exercises) {
            Ok(name) => workout_names.push(name),
            Err(workout_errors) => errors.merge(workout_errors.with_prefix(&format!("workouts[{}]", index))),
        }
    }

    match name {
        Some(name) if errors.is_empty() => Ok((name, workout_names)),
        _ => Err(errors),
    }
}

pub fn validate_routine(request: &CreateRoutineRequest) -> Result<String, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = match check_name("name", &request.name, MAX_LEN_PLAN_NAME, "Provide a name for your routine") {
        Ok(name) => Some(name),
        Err(name_errors) => {
            errors.merge(name_errors);
            None
        }
    };

    if request.workouts.is_empty() {
        errors.add("workouts", "Routine must have workouts");
    }

    for (index, day) in request.workouts.iter().enumerate() {
        if let RoutineWorkoutRef::New { name, exercises } = &day.workout {
            if let Err(workout_errors) = validate_new_workout(WorkoutKind::Template, name, exercises) {
                errors.merge(workout_errors.with_prefix(&format!("workouts[{}].workout", index)));
            }
        }
    }

    match name {
        Some(name) if errors.is_empty() => Ok(name),
        _ => Err(errors),
    }
}

#[derive(Debug, FromRow)]
struct RoutineWorkoutRow {
    template_id: Uuid,
    day_of_week: String,
}

#[derive(Clone)]
pub struct PlanService {
    db: PgPool,
}

impl PlanService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn active_plan_id(&self, conn: &mut PgConnection, profile_id: Uuid) -> AppResult<Option<Uuid>> {
        let plan_id = sqlx::query_scalar("SELECT plan_id FROM active_routines WHERE profile_id = $1")
            .bind(profile_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(plan_id)
    }

    async fn plan_details(&self, conn: &mut PgConnection, plan: WorkoutPlan, is_active: bool) -> AppResult<PlanDetails> {
        let workout_ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT workout_session_id FROM workout_plan_workouts WHERE plan_id = $1 ORDER BY position",
        )
        .bind(plan.id)
        .fetch_all(&mut *conn)
        .await?;

        let mut workouts = Vec::with_capacity(workout_ids.len());
        for workout_id in workout_ids {
            if let Some(workout) = load_workout(&mut *conn, workout_id).await? {
                workouts.push(workout);
            }
        }

        Ok(PlanDetails {
            plan,
            is_active,
            workouts,
        })
    }

    async fn owned_plan(&self, conn: &mut PgConnection, profile_id: Uuid, plan_id: Uuid) -> AppResult<WorkoutPlan> {
        let plan = sqlx::query_as::<_, WorkoutPlan>("SELECT * FROM workout_plans WHERE id = $1")
            .bind(plan_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found("Workout plan not found"))?;

        if plan.created_by != profile_id {
            return Err(AppError::forbidden("You can only access your own workout plans."));
        }
        Ok(plan)
    }

    /// Creates the plan and every workout in it in one transaction.
    pub async fn create_plan(&self, profile_id: Uuid, request: CreatePlanRequest) -> AppResult<PlanDetails> {
        let (name, workout_names) = validate_plan(&request)?;

        let mut tx = self.db.begin().await?;

        let plan = sqlx::query_as::<_, WorkoutPlan>(
            "INSERT INTO workout_plans (id, name, total_workouts, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&name)
        .bind(request.workouts.len() as i32)
        .bind(profile_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut tree = SessionTree::new(&mut *tx, profile_id);
        for (position, (workout, workout_name)) in request.workouts.iter().zip(&workout_names).enumerate() {
            let workout_id = insert_workout(&mut tree, profile_id, workout_name, &workout.exercises).await?;

            sqlx::query("INSERT INTO workout_plan_workouts (plan_id, workout_session_id, position) VALUES ($1, $2, $3)")
                .bind(plan.id)
                .bind(workout_id)
                .bind(position as i32)
                .execute(tree.conn())
                .await?;
        }

        let details = self.plan_details(&mut *tx, plan, false).await?;
        tx.commit().await?;

        tracing::info!(
            "Profile {} created workout plan {} with {} workouts",
            profile_id,
            details.plan.id,
            details.plan.total_workouts
        );
        Ok(details)
    }

    pub async fn list_plans(&self, profile_id: Uuid) -> AppResult<Vec<PlanSummary>> {
        let mut conn = self.db.acquire().await?;

        let plans = sqlx::query_as::<_, WorkoutPlan>(
            "SELECT * FROM workout_plans WHERE created_by = $1 ORDER BY created_at DESC",
        )
        .bind(profile_id)
        .fetch_all(&mut *conn)
        .await?;
        let active = self.active_plan_id(&mut *conn, profile_id).await?;

        Ok(plans
            .into_iter()
            .map(|plan| PlanSummary {
                is_active: active == Some(plan.id),
                plan,
            })
            .collect())
    }

    pub async fn get_plan(&self, profile_id: Uuid, plan_id: Uuid) -> AppResult<PlanDetails> {
        let mut conn = self.db.acquire().await?;
        let plan = self.owned_plan(&mut *conn, profile_id, plan_id).await?;
        let is_active = self.active_plan_id(&mut *conn, profile_id).await? == Some(plan_id);
        self.plan_details(&mut *conn, plan, is_active).await
    }

    /// Removes the plan; its workouts stay in the caller's history.
    pub async fn delete_plan(&self, profile_id: Uuid, plan_id: Uuid) -> AppResult<()> {
        let mut conn = self.db.acquire().await?;
        self.owned_plan(&mut *conn, profile_id, plan_id).await?;

        sqlx::query("DELETE FROM workout_plans WHERE id = $1")
            .bind(plan_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Makes the plan the caller's single active plan.
    pub async fn activate_plan(&self, profile_id: Uuid, plan_id: Uuid) -> AppResult<PlanDetails> {
        let mut tx = self.db.begin().await?;
        let plan = self.owned_plan(&mut *tx, profile_id, plan_id).await?;

        sqlx::query(
            "INSERT INTO active_routines (profile_id, plan_id) VALUES ($1, $2)
             ON CONFLICT (profile_id) DO UPDATE SET plan_id = EXCLUDED.plan_id, created_at = NOW()",
        )
        .bind(profile_id)
        .bind(plan_id)
        .execute(&mut *tx)
        .await?;

        let details = self.plan_details(&mut *tx, plan, true).await?;
        tx.commit().await?;

        tracing::info!("Profile {} activated workout plan {}", profile_id, plan_id);
        Ok(details)
    }

    pub async fn active_plan(&self, profile_id: Uuid) -> AppResult<PlanDetails> {
        let mut conn = self.db.acquire().await?;
        let plan_id = self
            .active_plan_id(&mut *conn, profile_id)
            .await?
            .ok_or_else(|| AppError::not_found("No active workout plan"))?;
        let plan = self.owned_plan(&mut *conn, profile_id, plan_id).await?;
        self.plan_details(&mut *conn, plan, true).await
    }

    // Routines

    /// Creates a routine; days either reuse a visible template or create one.
    pub async fn create_routine(&self, profile_id: Uuid, request: CreateRoutineRequest) -> AppResult<RoutineDetails> {
        let name = validate_routine(&request)?;

        let mut tx = self.db.begin().await?;

        let routine = sqlx::query_as::<_, Routine>(
            "INSERT INTO routines (id, name, created_by) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&name)
        .bind(profile_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut tree = SessionTree::new(&mut *tx, profile_id);
        for (position, day) in request.workouts.iter().enumerate() {
            let template_id = match &day.workout {
                RoutineWorkoutRef::Existing { id } => {
                    let visible: bool = sqlx::query_scalar(
                        "SELECT EXISTS (
                            SELECT 1 FROM workout_templates WHERE id = $1 AND (created_by = $2 OR is_published)
                        )",
                    )
                    .bind(id)
                    .bind(profile_id)
                    .fetch_one(tree.conn())
                    .await?;
                    if !visible {
                        return Err(AppError::not_found(format!("Workout template {} not found", id)));
                    }
                    *id
                }
                RoutineWorkoutRef::New { name, exercises } => {
                    insert_template(&mut tree, profile_id, name.trim(), exercises).await?
                }
            };

            sqlx::query(
                "INSERT INTO routine_workouts (id, routine_id, template_id, day_of_week, position)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(routine.id)
            .bind(template_id)
            .bind(day.day.as_str())
            .bind(position as i32)
            .execute(tree.conn())
            .await?;
        }

        let details = self.routine_details(&mut *tx, routine).await?;
        tx.commit().await?;

        Ok(details)
    }

    async fn routine_details(&self, conn: &mut PgConnection, routine: Routine) -> AppResult<RoutineDetails> {
        let rows = sqlx::query_as::<_, RoutineWorkoutRow>(
            "SELECT template_id, day_of_week FROM routine_workouts WHERE routine_id = $1 ORDER BY position",
        )
        .bind(routine.id)
        .fetch_all(&mut *conn)
        .await?;

        let mut workouts = Vec::with_capacity(rows.len());
        for row in rows {
            let day = DayOfWeek::parse(&row.day_of_week)
                .ok_or_else(|| anyhow::anyhow!("Routine {} has unknown day {}", routine.id, row.day_of_week))?;
            if let Some(workout) = load_template(&mut *conn, row.template_id).await? {
                workouts.push(RoutineDay { day, workout });
            }
        }

        Ok(RoutineDetails { routine, workouts })
    }

    async fn owned_routine(&self, conn: &mut PgConnection, profile_id: Uuid, routine_id: Uuid) -> AppResult<Routine> {
        let routine = sqlx::query_as::<_, Routine>("SELECT * FROM routines WHERE id = $1")
            .bind(routine_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found("Routine not found"))?;

        if routine.created_by != profile_id {
            return Err(AppError::forbidden("You can only access your own routines."));
        }
        Ok(routine)
    }

    pub async fn list_routines(&self, profile_id: Uuid) -> AppResult<Vec<Routine>> {
        let routines = sqlx::query_as::<_, Routine>(
            "SELECT * FROM routines WHERE created_by = $1 ORDER BY created_at DESC",
        )
        .bind(profile_id)
        .fetch_all(&self.db)
        .await?;
        Ok(routines)
    }

    pub async fn get_routine(&self, profile_id: Uuid, routine_id: Uuid) -> AppResult<RoutineDetails> {
        let mut conn = self.db.acquire().await?;
        let routine = self.owned_routine(&mut *conn, profile_id, routine_id).await?;
        self.routine_details(&mut *conn, routine).await
    }

    pub async fn delete_routine(&self, profile_id: Uuid, routine_id: Uuid) -> AppResult<()> {
        let mut conn = self.db.acquire().await?;
        self.owned_routine(&mut *conn, profile_id, routine_id).await?;

        sqlx::query("DELETE FROM routines WHERE id = $1")
            .bind(routine_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExerciseRef, ExerciseSessionInput, PlanWorkoutInput, RoutineDayInput, WorkoutChildInput};

    fn child() -> WorkoutChildInput {
        WorkoutChildInput::Exercise(ExerciseSessionInput {
            id: None,
            exercise: ExerciseRef { id: Uuid::new_v4() },
            notes: None,
            session_data: vec![],
        })
    }

    #[test]
    fn test_plan_needs_workouts() {
        let request = CreatePlanRequest {
            name: "Summer cut".to_string(),
            workouts: vec![],
        };
        let errors = validate_plan(&request).unwrap_err();
        assert_eq!(
            errors.get("workouts"),
            Some(&["Workout plan must have workouts".to_string()][..])
        );
    }

    #[test]
    fn test_plan_errors_are_prefixed() {
        let request = CreatePlanRequest {
            name: "".to_string(),
            workouts: vec![
                PlanWorkoutInput {
                    name: "Push".to_string(),
                    exercises: vec![child()],
                },
                PlanWorkoutInput {
                    name: "".to_string(),
                    exercises: vec![],
                },
            ],
        };
        let errors = validate_plan(&request).unwrap_err();
        assert!(errors.get("name").is_some());
        assert_eq!(
            errors.get("workouts[1].name"),
            Some(&["Provide a name for your workout".to_string()][..])
        );
        assert!(errors.get("workouts[1].exercises").is_some());
        assert!(errors.get("workouts[0].name").is_none());
    }

    #[test]
    fn test_valid_plan() {
        let request = CreatePlanRequest {
            name: " Strength block ".to_string(),
            workouts: vec![PlanWorkoutInput {
                name: " Squat day".to_string(),
                exercises: vec![child()],
            }],
        };
        let (name, workouts) = validate_plan(&request).unwrap();
        assert_eq!(name, "Strength block");
        assert_eq!(workouts, vec!["Squat day".to_string()]);
    }

    #[test]
    fn test_routine_validates_new_workouts_only() {
        let request = CreateRoutineRequest {
            name: "Weekly".to_string(),
            workouts: vec![
                RoutineDayInput {
                    day: DayOfWeek::Mon,
                    workout: RoutineWorkoutRef::Existing { id: Uuid::new_v4() },
                },
                RoutineDayInput {
                    day: DayOfWeek::Wed,
                    workout: RoutineWorkoutRef::New {
                        name: "".to_string(),
                        exercises: vec![child()],
                    },
                },
            ],
        };
        let errors = validate_routine(&request).unwrap_err();
        assert_eq!(
            errors.get("workouts[1].workout.name"),
            Some(&["Provide a name for your workout template".to_string()][..])
        );
        assert!(errors.get("workouts[0].workout.name").is_none());
    }
}
