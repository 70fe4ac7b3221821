use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{
    validate_items, validate_session_input, EditExerciseSessionRequest, EditSupersetRequest, ExerciseSessionDetail,
    ItemKind, SessionItem, SessionItemDetail, SetData, SupersetDetail,
};
use crate::services::session_tree::{fetch_item, load_session, load_superset, SessionTree};

fn missing_item(kind: ItemKind) -> AppError {
    AppError::bad_request(format!("{} does not exist.", kind.label()))
}

/// Deleting someone else's item is an authentication failure, editing one is
/// a permission failure.
fn foreign_delete(kind: ItemKind) -> AppError {
    AppError::Unauthorized(format!("You can only delete your own {}s.", kind.as_str()))
}

fn foreign_edit(kind: ItemKind) -> AppError {
    AppError::forbidden(format!("You can only edit your own {}s.", kind.as_str()))
}

async fn session_exercise(conn: &mut PgConnection, session_id: Uuid) -> AppResult<Uuid> {
    sqlx::query_scalar("SELECT exercise_id FROM exercise_sessions WHERE id = $1")
        .bind(session_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Exercise session not found"))
}

#[derive(Clone)]
pub struct ExerciseSessionService {
    db: PgPool,
}

impl ExerciseSessionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn owned_session(&self, conn: &mut PgConnection, profile_id: Uuid, session_id: Uuid) -> AppResult<ExerciseSessionDetail> {
        let session = load_session(conn, session_id)
            .await?
            .ok_or_else(|| AppError::not_found("Exercise session not found"))?;
        if session.created_by != profile_id {
            return Err(AppError::forbidden("You can only access your own exercise sessions."));
        }
        Ok(session)
    }

    pub async fn get(&self, profile_id: Uuid, session_id: Uuid) -> AppResult<ExerciseSessionDetail> {
        let mut conn = self.db.acquire().await?;
        self.owned_session(&mut *conn, profile_id, session_id).await
    }

    pub async fn edit(
        &self,
        profile_id: Uuid,
        session_id: Uuid,
        request: EditExerciseSessionRequest,
    ) -> AppResult<ExerciseSessionDetail> {
        let mut tx = self.db.begin().await?;
        let session = self.owned_session(&mut *tx, profile_id, session_id).await?;

        validate_items(&request.session_data, "session_data").into_result()?;

        let mut tree = SessionTree::new(&mut *tx, profile_id);
        let changed = tree
            .edit_exercise_session(
                session_id,
                session.exercise.id,
                request.notes.as_deref(),
                &request.session_data,
            )
            .await?;
        if changed {
            tree.recompute_owners_of_session(session_id).await?;
        }

        let updated = load_session(&mut *tx, session_id)
            .await?
            .ok_or_else(|| AppError::not_found("Exercise session not found"))?;
        tx.commit().await?;

        Ok(updated)
    }

    /// Appends a set after the session's last item.
    pub async fn add_set(&self, profile_id: Uuid, session_id: Uuid, set: SetData) -> AppResult<SessionItemDetail> {
        let item = SessionItem::Set(set);
        item.validate()?;

        let mut tx = self.db.begin().await?;
        let session = self.owned_session(&mut *tx, profile_id, session_id).await?;

        let mut tree = SessionTree::new(&mut *tx, profile_id);
        let item_id = tree.append_item(session_id, session.exercise.id, &item).await?;
        tree.recompute_owners_of_session(session_id).await?;

        let (_, detail) = fetch_item(&mut *tx, item_id)
            .await?
            .ok_or_else(|| missing_item(ItemKind::Set))?;
        tx.commit().await?;

        Ok(detail)
    }

    /// Replaces the data of a set, rest or interval in place.
    pub async fn update_item(&self, profile_id: Uuid, item_id: Uuid, item: SessionItem) -> AppResult<SessionItemDetail> {
        let kind = item.kind();
        item.validate()?;

        let mut tx = self.db.begin().await?;

        let (session_id, current) = match fetch_item(&mut *tx, item_id).await? {
            Some((session_id, current)) if current.item.kind() == kind => (session_id, current),
            _ => return Err(missing_item(kind)),
        };
        if current.created_by != profile_id {
            return Err(foreign_edit(kind));
        }

        let exercise_id = session_exercise(&mut *tx, session_id).await?;

        let mut tree = SessionTree::new(&mut *tx, profile_id);
        if tree.update_item(&current, exercise_id, current.position, &item).await? {
            tree.recompute_owners_of_session(session_id).await?;
        }

        let (_, detail) = fetch_item(&mut *tx, item_id)
            .await?
            .ok_or_else(|| missing_item(kind))?;
        tx.commit().await?;

        Ok(detail)
    }

    pub async fn delete_item(&self, profile_id: Uuid, kind: ItemKind, item_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let (session_id, current) = match fetch_item(&mut *tx, item_id).await? {
            Some((session_id, current)) if current.item.kind() == kind => (session_id, current),
            _ => return Err(missing_item(kind)),
        };
        if current.created_by != profile_id {
            return Err(foreign_delete(kind));
        }

        sqlx::query("DELETE FROM session_items WHERE id = $1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        SessionTree::new(&mut *tx, profile_id)
            .recompute_owners_of_session(session_id)
            .await?;
        tx.commit().await?;

        tracing::debug!("Deleted {} {}", kind.as_str(), item_id);
        Ok(())
    }

    pub async fn edit_superset(
        &self,
        profile_id: Uuid,
        superset_id: Uuid,
        request: EditSupersetRequest,
    ) -> AppResult<SupersetDetail> {
        let mut tx = self.db.begin().await?;

        let superset = load_superset(&mut *tx, superset_id)
            .await?
            .ok_or_else(|| AppError::not_found("Superset not found"))?;
        if superset.created_by != profile_id {
            return Err(AppError::forbidden("You can only edit your own supersets."));
        }

        let mut errors = FieldErrors::new();
        if request.exercises_data.is_empty() {
            errors.add("exercises_data", "A superset needs at least one exercise.");
        }
        for (index, member) in request.exercises_data.iter().enumerate() {
            errors.merge(validate_session_input(member, &format!("exercises_data[{}]", index)));
        }
        errors.into_result()?;

        let mut tree = SessionTree::new(&mut *tx, profile_id);
        if tree
            .edit_superset(superset_id, request.notes.as_deref(), &request.exercises_data)
            .await?
        {
            tree.recompute_owners_of_superset(superset_id).await?;
        }

        let updated = load_superset(&mut *tx, superset_id)
            .await?
            .ok_or_else(|| AppError::not_found("Superset not found"))?;
        tx.commit().await?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_item_error_messages() {
        let err = missing_item(ItemKind::Set);
        assert_eq!(err.to_string(), "Set does not exist.");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = foreign_delete(ItemKind::Rest);
        assert_eq!(err.to_string(), "You can only delete your own rests.");
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = foreign_edit(ItemKind::Interval);
        assert_eq!(err.to_string(), "You can only edit your own intervals.");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }
}
