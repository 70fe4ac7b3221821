use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    validate_new_workout, CreateWorkoutRequest, EditWorkoutRequest, StartedWorkout, TemplateDetails,
    WorkoutChildInput, WorkoutKind, WorkoutSession, WorkoutTemplate,
};
use crate::services::session_tree::{load_children, SessionTree, TreeOwner};
use crate::services::workout_service::{insert_workout, validate_edit};

pub async fn insert_template(
    tree: &mut SessionTree<'_>,
    profile_id: Uuid,
    name: &str,
    exercises: &[WorkoutChildInput],
) -> AppResult<Uuid> {
    let template_id = Uuid::new_v4();

    sqlx::query("INSERT INTO workout_templates (id, name, created_by) VALUES ($1, $2, $3)")
        .bind(template_id)
        .bind(name)
        .bind(profile_id)
        .execute(tree.conn())
        .await?;

    let owner = TreeOwner::Template(template_id);
    tree.insert_children(owner, exercises).await?;
    tree.recompute_totals(owner).await?;

    Ok(template_id)
}

pub async fn load_template(conn: &mut PgConnection, template_id: Uuid) -> AppResult<Option<TemplateDetails>> {
    let template = sqlx::query_as::<_, WorkoutTemplate>("SELECT * FROM workout_templates WHERE id = $1")
        .bind(template_id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(template) = template else { return Ok(None) };
    let exercises = load_children(conn, TreeOwner::Template(template_id)).await?;

    Ok(Some(TemplateDetails { template, exercises }))
}

fn template_not_found() -> AppError {
    AppError::not_found("Workout template not found")
}

#[derive(Clone)]
pub struct TemplateService {
    db: PgPool,
}

impl TemplateService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// The caller's templates followed by everyone else's published ones.
    pub async fn list(&self, profile_id: Uuid) -> AppResult<Vec<WorkoutTemplate>> {
        let templates = sqlx::query_as::<_, WorkoutTemplate>(
            "SELECT * FROM workout_templates
             WHERE created_by = $1 OR is_published
             ORDER BY (created_by = $1) DESC, created_at DESC",
        )
        .bind(profile_id)
        .fetch_all(&self.db)
        .await?;
        Ok(templates)
    }

    pub async fn create(&self, profile_id: Uuid, request: CreateWorkoutRequest) -> AppResult<TemplateDetails> {
        let name = validate_new_workout(WorkoutKind::Template, &request.name, &request.exercises)?;

        let mut tx = self.db.begin().await?;

        let mut tree = SessionTree::new(&mut *tx, profile_id);
        let template_id = insert_template(&mut tree, profile_id, &name, &request.exercises).await?;

        let details = load_template(&mut *tx, template_id)
            .await?
            .ok_or_else(template_not_found)?;
        tx.commit().await?;

        tracing::info!("Profile {} created workout template {}", profile_id, template_id);
        Ok(details)
    }

    async fn find(&self, conn: &mut PgConnection, template_id: Uuid, lock: bool) -> AppResult<WorkoutTemplate> {
        let query = if lock {
            "SELECT * FROM workout_templates WHERE id = $1 FOR UPDATE"
        } else {
            "SELECT * FROM workout_templates WHERE id = $1"
        };

        sqlx::query_as::<_, WorkoutTemplate>(query)
            .bind(template_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(template_not_found)
    }

    async fn visible(&self, conn: &mut PgConnection, profile_id: Uuid, template_id: Uuid) -> AppResult<WorkoutTemplate> {
        let template = self.find(conn, template_id, false).await?;
        if template.created_by != profile_id && !template.is_published {
            return Err(AppError::forbidden("You can only access your own workout templates."));
        }
        Ok(template)
    }

    async fn owned(&self, conn: &mut PgConnection, profile_id: Uuid, template_id: Uuid) -> AppResult<WorkoutTemplate> {
        let template = self.find(conn, template_id, true).await?;
        if template.created_by != profile_id {
            return Err(AppError::forbidden("You can only modify your own workout templates."));
        }
        Ok(template)
    }

    pub async fn get(&self, profile_id: Uuid, template_id: Uuid) -> AppResult<TemplateDetails> {
        let mut conn = self.db.acquire().await?;
        let template = self.visible(&mut *conn, profile_id, template_id).await?;
        let exercises = load_children(&mut *conn, TreeOwner::Template(template_id)).await?;
        Ok(TemplateDetails { template, exercises })
    }

    pub async fn edit(&self, profile_id: Uuid, template_id: Uuid, request: EditWorkoutRequest) -> AppResult<TemplateDetails> {
        let name = validate_edit(WorkoutKind::Template, &request)?;

        let mut tx = self.db.begin().await?;
        let template = self.owned(&mut *tx, profile_id, template_id).await?;

        let owner = TreeOwner::Template(template_id);
        let mut tree = SessionTree::new(&mut *tx, profile_id);
        let tree_changed = tree.reconcile_children(owner, &request.exercises).await?;
        if tree_changed {
            tree.recompute_totals(owner).await?;
        }

        let rename = name.filter(|name| *name != template.name);
        if tree_changed || rename.is_some() {
            sqlx::query(
                "UPDATE workout_templates SET name = COALESCE($2, name), updated_at = NOW() WHERE id = $1",
            )
            .bind(template_id)
            .bind(rename)
            .execute(&mut *tx)
            .await?;
        }

        let details = load_template(&mut *tx, template_id)
            .await?
            .ok_or_else(template_not_found)?;
        tx.commit().await?;

        Ok(details)
    }

    pub async fn delete(&self, profile_id: Uuid, template_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        self.owned(&mut *tx, profile_id, template_id).await?;

        SessionTree::new(&mut *tx, profile_id)
            .delete_tree(TreeOwner::Template(template_id))
            .await?;

        sqlx::query("DELETE FROM workout_templates WHERE id = $1")
            .bind(template_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn publish(&self, profile_id: Uuid, template_id: Uuid) -> AppResult<WorkoutTemplate> {
        let mut tx = self.db.begin().await?;
        self.owned(&mut *tx, profile_id, template_id).await?;

        let template = sqlx::query_as::<_, WorkoutTemplate>(
            "UPDATE workout_templates SET is_published = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(template_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(template)
    }

    /// Copies the template's tree into a new workout session owned by the caller.
    pub async fn start(&self, profile_id: Uuid, template_id: Uuid) -> AppResult<StartedWorkout> {
        let mut tx = self.db.begin().await?;

        let template = self.visible(&mut *tx, profile_id, template_id).await?;
        let children: Vec<WorkoutChildInput> = load_children(&mut *tx, TreeOwner::Template(template_id))
            .await?
            .iter()
            .map(|child| child.to_new_input())
            .collect();

        let mut tree = SessionTree::trusted(&mut *tx, profile_id);
        let workout_id = insert_workout(&mut tree, profile_id, &template.name, &children).await?;

        sqlx::query(
            "INSERT INTO template_workout_sessions (id, template_id, workout_session_id, created_by)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(template_id)
        .bind(workout_id)
        .bind(profile_id)
        .execute(&mut *tx)
        .await?;

        let workout = sqlx::query_as::<_, WorkoutSession>("SELECT * FROM workout_sessions WHERE id = $1")
            .bind(workout_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!("Profile {} started workout {} from template {}", profile_id, workout_id, template_id);
        Ok(StartedWorkout { template_id, workout })
    }
}
