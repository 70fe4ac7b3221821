use std::collections::HashMap;

use anyhow::anyhow;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    reconcile, ExerciseSessionDetail, ExerciseSessionInput, ExerciseSummary, IntervalData, ItemKind,
    RestData, SessionItem, SessionItemDetail, SessionItemInput, SetData, SupersetDetail, SupersetInput,
    WorkoutChild, WorkoutChildContent, WorkoutChildInput, WorkoutTotals,
};

/// The row that owns an ordered list of workout children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeOwner {
    Workout(Uuid),
    Template(Uuid),
}

impl TreeOwner {
    pub fn id(&self) -> Uuid {
        match self {
            TreeOwner::Workout(id) | TreeOwner::Template(id) => *id,
        }
    }

    fn link_table(&self) -> &'static str {
        match self {
            TreeOwner::Workout(_) => "workout_exercises",
            TreeOwner::Template(_) => "template_exercises",
        }
    }

    fn owner_column(&self) -> &'static str {
        match self {
            TreeOwner::Workout(_) => "workout_session_id",
            TreeOwner::Template(_) => "template_id",
        }
    }

    fn totals_table(&self) -> &'static str {
        match self {
            TreeOwner::Workout(_) => "workout_sessions",
            TreeOwner::Template(_) => "workout_templates",
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            TreeOwner::Workout(_) => "workout",
            TreeOwner::Template(_) => "workout template",
        }
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    exercise_session_id: Uuid,
    position: i32,
    kind: String,
    created_by: Uuid,
    updated_at: DateTime<Utc>,
    weight: Option<f64>,
    reps: Option<i32>,
    min_reps: Option<i32>,
    max_reps: Option<i32>,
    to_failure: Option<bool>,
    bodyweight: Option<bool>,
    minutes: Option<i32>,
    seconds: Option<i32>,
    time: Option<NaiveTime>,
    distance: Option<i32>,
    level: Option<i32>,
    pace: Option<i32>,
}

impl ItemRow {
    fn into_detail(self) -> AppResult<(Uuid, SessionItemDetail)> {
        let kind = ItemKind::from_str(&self.kind)
            .ok_or_else(|| anyhow!("Session item {} has unknown kind {}", self.id, self.kind))?;

        let item = match kind {
            ItemKind::Set => SessionItem::Set(SetData {
                weight: self.weight,
                reps: self.reps,
                min_reps: self.min_reps,
                max_reps: self.max_reps,
                to_failure: self.to_failure.unwrap_or(false),
                bodyweight: self.bodyweight.unwrap_or(false),
            }),
            ItemKind::Rest => SessionItem::Rest(RestData {
                minutes: self.minutes.unwrap_or(0),
                seconds: self.seconds.unwrap_or(0),
            }),
            ItemKind::Interval => SessionItem::Interval(IntervalData {
                time: self
                    .time
                    .ok_or_else(|| anyhow!("Interval {} has no data row", self.id))?,
                distance: self.distance.unwrap_or(0),
                level: self.level.unwrap_or(0),
                pace: self.pace.unwrap_or(0),
            }),
        };

        Ok((
            self.exercise_session_id,
            SessionItemDetail {
                id: self.id,
                position: self.position,
                created_by: self.created_by,
                item,
                updated_at: self.updated_at,
            },
        ))
    }
}

#[derive(Debug, FromRow)]
struct SessionRow {
    id: Uuid,
    notes: Option<String>,
    created_by: Uuid,
    updated_at: DateTime<Utc>,
    exercise_id: Uuid,
    exercise_name: String,
    is_cardio: bool,
    bodyweight: bool,
}

#[derive(Debug, FromRow)]
struct SupersetRow {
    id: Uuid,
    notes: Option<String>,
    created_by: Uuid,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct MemberRow {
    superset_session_id: Uuid,
    exercise_session_id: Uuid,
}

#[derive(Debug, FromRow)]
struct LinkRow {
    id: Uuid,
    exercise_session_id: Option<Uuid>,
    superset_session_id: Option<Uuid>,
    position: i32,
}

impl LinkRow {
    fn content_id(&self) -> AppResult<Uuid> {
        self.exercise_session_id
            .or(self.superset_session_id)
            .ok_or_else(|| anyhow!("Workout child {} references nothing", self.id).into())
    }
}

const ITEM_COLUMNS: &str = "si.id, si.exercise_session_id, si.position, si.kind, si.created_by, si.updated_at,
       s.weight, s.reps, s.min_reps, s.max_reps, s.to_failure, s.bodyweight,
       r.minutes, r.seconds,
       i.time, i.distance, i.level, i.pace
     FROM session_items si
     LEFT JOIN sets s ON s.session_item_id = si.id
     LEFT JOIN rests r ON r.session_item_id = si.id
     LEFT JOIN intervals i ON i.session_item_id = si.id";

async fn fetch_items(conn: &mut PgConnection, session_ids: &[Uuid]) -> AppResult<Vec<(Uuid, SessionItemDetail)>> {
    let rows = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {} WHERE si.exercise_session_id = ANY($1) ORDER BY si.exercise_session_id, si.position",
        ITEM_COLUMNS
    ))
    .bind(session_ids)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(ItemRow::into_detail).collect()
}

/// A single item with the id of the exercise session holding it.
pub async fn fetch_item(conn: &mut PgConnection, item_id: Uuid) -> AppResult<Option<(Uuid, SessionItemDetail)>> {
    let row = sqlx::query_as::<_, ItemRow>(&format!("SELECT {} WHERE si.id = $1", ITEM_COLUMNS))
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(ItemRow::into_detail).transpose()
}

/// Exercise sessions with their items, keyed by id.
pub async fn load_sessions(
    conn: &mut PgConnection,
    session_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, ExerciseSessionDetail>> {
    if session_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, SessionRow>(
        "SELECT es.id, es.notes, es.created_by, es.updated_at,
                e.id AS exercise_id, e.name AS exercise_name, e.is_cardio, e.bodyweight
         FROM exercise_sessions es
         JOIN exercises e ON e.id = es.exercise_id
         WHERE es.id = ANY($1)",
    )
    .bind(session_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut sessions: HashMap<Uuid, ExerciseSessionDetail> = rows
        .into_iter()
        .map(|row| {
            (
                row.id,
                ExerciseSessionDetail {
                    id: row.id,
                    exercise: ExerciseSummary {
                        id: row.exercise_id,
                        name: row.exercise_name,
                        is_cardio: row.is_cardio,
                        bodyweight: row.bodyweight,
                    },
                    notes: row.notes,
                    created_by: row.created_by,
                    session_data: Vec::new(),
                    updated_at: row.updated_at,
                },
            )
        })
        .collect();

    for (session_id, item) in fetch_items(conn, session_ids).await? {
        if let Some(session) = sessions.get_mut(&session_id) {
            session.session_data.push(item);
        }
    }

    Ok(sessions)
}

pub async fn load_session(conn: &mut PgConnection, session_id: Uuid) -> AppResult<Option<ExerciseSessionDetail>> {
    Ok(load_sessions(conn, &[session_id]).await?.remove(&session_id))
}

/// Supersets with their member sessions in order, keyed by id.
pub async fn load_supersets(
    conn: &mut PgConnection,
    superset_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, SupersetDetail>> {
    if superset_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, SupersetRow>(
        "SELECT id, notes, created_by, updated_at FROM superset_sessions WHERE id = ANY($1)",
    )
    .bind(superset_ids)
    .fetch_all(&mut *conn)
    .await?;

    let members = sqlx::query_as::<_, MemberRow>(
        "SELECT superset_session_id, exercise_session_id
         FROM superset_exercises
         WHERE superset_session_id = ANY($1)
         ORDER BY superset_session_id, position",
    )
    .bind(superset_ids)
    .fetch_all(&mut *conn)
    .await?;

    let member_ids: Vec<Uuid> = members.iter().map(|m| m.exercise_session_id).collect();
    let mut sessions = load_sessions(conn, &member_ids).await?;

    let mut supersets: HashMap<Uuid, SupersetDetail> = rows
        .into_iter()
        .map(|row| {
            (
                row.id,
                SupersetDetail {
                    id: row.id,
                    notes: row.notes,
                    created_by: row.created_by,
                    exercises: Vec::new(),
                    updated_at: row.updated_at,
                },
            )
        })
        .collect();

    for member in members {
        if let (Some(superset), Some(session)) = (
            supersets.get_mut(&member.superset_session_id),
            sessions.remove(&member.exercise_session_id),
        ) {
            superset.exercises.push(session);
        }
    }

    Ok(supersets)
}

pub async fn load_superset(conn: &mut PgConnection, superset_id: Uuid) -> AppResult<Option<SupersetDetail>> {
    Ok(load_supersets(conn, &[superset_id]).await?.remove(&superset_id))
}

async fn fetch_links(conn: &mut PgConnection, owner: TreeOwner) -> AppResult<Vec<LinkRow>> {
    let links = sqlx::query_as::<_, LinkRow>(&format!(
        "SELECT id, exercise_session_id, superset_session_id, position
         FROM {} WHERE {} = $1 ORDER BY position, created_at",
        owner.link_table(),
        owner.owner_column()
    ))
    .bind(owner.id())
    .fetch_all(&mut *conn)
    .await?;

    Ok(links)
}

/// The ordered children of a workout or template.
pub async fn load_children(conn: &mut PgConnection, owner: TreeOwner) -> AppResult<Vec<WorkoutChild>> {
    let links = fetch_links(conn, owner).await?;

    let session_ids: Vec<Uuid> = links.iter().filter_map(|l| l.exercise_session_id).collect();
    let superset_ids: Vec<Uuid> = links.iter().filter_map(|l| l.superset_session_id).collect();

    let mut sessions = load_sessions(conn, &session_ids).await?;
    let mut supersets = load_supersets(conn, &superset_ids).await?;

    let mut children = Vec::with_capacity(links.len());
    for link in links {
        let content_id = link.content_id()?;
        let content = match link.exercise_session_id {
            Some(_) => sessions.remove(&content_id).map(WorkoutChildContent::Exercise),
            None => supersets.remove(&content_id).map(WorkoutChildContent::Superset),
        }
        .ok_or_else(|| anyhow!("Workout child {} points at a missing row", link.id))?;

        children.push(WorkoutChild {
            link_id: link.id,
            position: link.position,
            content,
        });
    }

    Ok(children)
}

/// Workouts and templates whose tree contains this exercise session,
/// directly or through a superset.
pub async fn owners_of_exercise_session(conn: &mut PgConnection, session_id: Uuid) -> AppResult<Vec<TreeOwner>> {
    let mut owners = Vec::new();

    for (table, column, make) in [
        ("workout_exercises", "workout_session_id", TreeOwner::Workout as fn(Uuid) -> TreeOwner),
        ("template_exercises", "template_id", TreeOwner::Template as fn(Uuid) -> TreeOwner),
    ] {
        let ids: Vec<Uuid> = sqlx::query_scalar(&format!(
            "SELECT {column} FROM {table}
             WHERE exercise_session_id = $1
                OR superset_session_id = (SELECT superset_session_id FROM superset_exercises WHERE exercise_session_id = $1)"
        ))
        .bind(session_id)
        .fetch_all(&mut *conn)
        .await?;
        owners.extend(ids.into_iter().map(make));
    }

    Ok(owners)
}

pub async fn owners_of_superset(conn: &mut PgConnection, superset_id: Uuid) -> AppResult<Vec<TreeOwner>> {
    let mut owners = Vec::new();

    for (table, column, make) in [
        ("workout_exercises", "workout_session_id", TreeOwner::Workout as fn(Uuid) -> TreeOwner),
        ("template_exercises", "template_id", TreeOwner::Template as fn(Uuid) -> TreeOwner),
    ] {
        let ids: Vec<Uuid> = sqlx::query_scalar(&format!(
            "SELECT {column} FROM {table} WHERE superset_session_id = $1"
        ))
        .bind(superset_id)
        .fetch_all(&mut *conn)
        .await?;
        owners.extend(ids.into_iter().map(make));
    }

    Ok(owners)
}

/// Writes to the workout tree on behalf of one profile, inside the caller's
/// transaction.
pub struct SessionTree<'c> {
    conn: &'c mut PgConnection,
    actor: Uuid,
    verify_exercises: bool,
}

impl<'c> SessionTree<'c> {
    pub fn new(conn: &'c mut PgConnection, actor: Uuid) -> Self {
        Self {
            conn,
            actor,
            verify_exercises: true,
        }
    }

    /// Skip the exercise visibility check, for trees copied from rows that
    /// were already validated.
    pub fn trusted(conn: &'c mut PgConnection, actor: Uuid) -> Self {
        Self {
            conn,
            actor,
            verify_exercises: false,
        }
    }

    /// The underlying connection, for writes to the owner rows themselves.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut *self.conn
    }

    async fn check_exercise(&mut self, exercise_id: Uuid) -> AppResult<()> {
        if !self.verify_exercises {
            return Ok(());
        }

        let visible: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM exercises
                WHERE id = $1 AND (created_by IS NULL OR is_published OR created_by = $2)
            )",
        )
        .bind(exercise_id)
        .bind(self.actor)
        .fetch_one(&mut *self.conn)
        .await?;

        if visible {
            Ok(())
        } else {
            Err(AppError::bad_request(format!("Exercise {} does not exist.", exercise_id)))
        }
    }

    // Session items

    async fn write_item_data(&mut self, item_id: Uuid, item: &SessionItem) -> AppResult<()> {
        match item {
            SessionItem::Set(set) => {
                sqlx::query(
                    "INSERT INTO sets (session_item_id, weight, reps, min_reps, max_reps, to_failure, bodyweight)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)
                     ON CONFLICT (session_item_id) DO UPDATE SET
                        weight = EXCLUDED.weight, reps = EXCLUDED.reps,
                        min_reps = EXCLUDED.min_reps, max_reps = EXCLUDED.max_reps,
                        to_failure = EXCLUDED.to_failure, bodyweight = EXCLUDED.bodyweight",
                )
                .bind(item_id)
                .bind(set.weight)
                .bind(set.reps)
                .bind(set.min_reps)
                .bind(set.max_reps)
                .bind(set.to_failure)
                .bind(set.bodyweight)
                .execute(&mut *self.conn)
                .await?;
            }
            SessionItem::Rest(rest) => {
                sqlx::query(
                    "INSERT INTO rests (session_item_id, minutes, seconds) VALUES ($1, $2, $3)
                     ON CONFLICT (session_item_id) DO UPDATE SET minutes = EXCLUDED.minutes, seconds = EXCLUDED.seconds",
                )
                .bind(item_id)
                .bind(rest.minutes)
                .bind(rest.seconds)
                .execute(&mut *self.conn)
                .await?;
            }
            SessionItem::Interval(interval) => {
                sqlx::query(
                    "INSERT INTO intervals (session_item_id, time, distance, level, pace) VALUES ($1, $2, $3, $4, $5)
                     ON CONFLICT (session_item_id) DO UPDATE SET
                        time = EXCLUDED.time, distance = EXCLUDED.distance,
                        level = EXCLUDED.level, pace = EXCLUDED.pace",
                )
                .bind(item_id)
                .bind(interval.time)
                .bind(interval.distance)
                .bind(interval.level)
                .bind(interval.pace)
                .execute(&mut *self.conn)
                .await?;
            }
        }
        Ok(())
    }

    async fn record_set_history(&mut self, item_id: Uuid, exercise_id: Uuid, set: &SetData) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO set_history (id, session_item_id, exercise_id, created_by, weight, reps)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(item_id)
        .bind(exercise_id)
        .bind(self.actor)
        .bind(set.weight)
        .bind(set.reps)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    pub async fn insert_item(
        &mut self,
        session_id: Uuid,
        exercise_id: Uuid,
        position: i32,
        item: &SessionItem,
    ) -> AppResult<Uuid> {
        let item = item.clone().normalized();
        let item_id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO session_items (id, exercise_session_id, position, kind, created_by)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(item_id)
        .bind(session_id)
        .bind(position)
        .bind(item.kind().as_str())
        .bind(self.actor)
        .execute(&mut *self.conn)
        .await?;

        self.write_item_data(item_id, &item).await?;
        if let SessionItem::Set(set) = &item {
            self.record_set_history(item_id, exercise_id, set).await?;
        }

        Ok(item_id)
    }

    /// Appends an item after the last one of the session.
    pub async fn append_item(&mut self, session_id: Uuid, exercise_id: Uuid, item: &SessionItem) -> AppResult<Uuid> {
        let next: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM session_items WHERE exercise_session_id = $1",
        )
        .bind(session_id)
        .fetch_one(&mut *self.conn)
        .await?;

        self.insert_item(session_id, exercise_id, next, item).await
    }

    /// Rewrites one item's data; returns whether anything changed.
    pub async fn update_item(
        &mut self,
        current: &SessionItemDetail,
        exercise_id: Uuid,
        position: i32,
        item: &SessionItem,
    ) -> AppResult<bool> {
        let item = item.clone().normalized();
        let data_changed = current.item != item;
        if !data_changed && current.position == position {
            return Ok(false);
        }

        if item.kind() != current.item.kind() {
            for table in ["sets", "rests", "intervals"] {
                sqlx::query(&format!("DELETE FROM {} WHERE session_item_id = $1", table))
                    .bind(current.id)
                    .execute(&mut *self.conn)
                    .await?;
            }
        }

        sqlx::query("UPDATE session_items SET position = $2, kind = $3, updated_at = NOW() WHERE id = $1")
            .bind(current.id)
            .bind(position)
            .bind(item.kind().as_str())
            .execute(&mut *self.conn)
            .await?;

        if data_changed {
            self.write_item_data(current.id, &item).await?;
            if let SessionItem::Set(set) = &item {
                self.record_set_history(current.id, exercise_id, set).await?;
            }
        }

        Ok(true)
    }

    /// Brings a session's item list in line with `incoming`; returns whether
    /// any row was written.
    pub async fn reconcile_items(
        &mut self,
        session_id: Uuid,
        exercise_id: Uuid,
        incoming: &[SessionItemInput],
    ) -> AppResult<bool> {
        let current: HashMap<Uuid, SessionItemDetail> = fetch_items(&mut *self.conn, &[session_id])
            .await?
            .into_iter()
            .map(|(_, item)| (item.id, item))
            .collect();
        let current_ids: Vec<Uuid> = current.keys().copied().collect();

        let plan = reconcile("Session item", "exercise session", &current_ids, incoming)?;
        let mut changed = !plan.remove.is_empty() || !plan.create.is_empty();

        if !plan.remove.is_empty() {
            sqlx::query("DELETE FROM session_items WHERE id = ANY($1)")
                .bind(&plan.remove)
                .execute(&mut *self.conn)
                .await?;
        }

        for (position, id, input) in &plan.update {
            if let Some(existing) = current.get(id) {
                changed |= self
                    .update_item(existing, exercise_id, *position as i32, &input.item)
                    .await?;
            }
        }

        for (position, input) in &plan.create {
            self.insert_item(session_id, exercise_id, *position as i32, &input.item)
                .await?;
        }

        Ok(changed)
    }

    // Exercise sessions

    pub async fn insert_exercise_session(&mut self, input: &ExerciseSessionInput) -> AppResult<Uuid> {
        self.check_exercise(input.exercise.id).await?;
        let session_id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO exercise_sessions (id, exercise_id, notes, created_by) VALUES ($1, $2, $3, $4)",
        )
        .bind(session_id)
        .bind(input.exercise.id)
        .bind(&input.notes)
        .bind(self.actor)
        .execute(&mut *self.conn)
        .await?;

        for (position, entry) in input.session_data.iter().enumerate() {
            self.insert_item(session_id, input.exercise.id, position as i32, &entry.item)
                .await?;
        }

        Ok(session_id)
    }

    /// Applies an edit to an existing exercise session. `notes: None` keeps
    /// the stored notes. Returns whether anything changed.
    pub async fn edit_exercise_session(
        &mut self,
        session_id: Uuid,
        exercise_id: Uuid,
        notes: Option<&str>,
        items: &[SessionItemInput],
    ) -> AppResult<bool> {
        let (current_exercise, current_notes): (Uuid, Option<String>) =
            sqlx::query_as("SELECT exercise_id, notes FROM exercise_sessions WHERE id = $1")
                .bind(session_id)
                .fetch_optional(&mut *self.conn)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Exercise session {} not found", session_id)))?;

        let exercise_changed = current_exercise != exercise_id;
        if exercise_changed {
            self.check_exercise(exercise_id).await?;
        }
        let notes_changed = notes.is_some_and(|notes| current_notes.as_deref() != Some(notes));

        let items_changed = self.reconcile_items(session_id, exercise_id, items).await?;

        let changed = exercise_changed || notes_changed || items_changed;
        if changed {
            sqlx::query(
                "UPDATE exercise_sessions
                 SET exercise_id = $2, notes = COALESCE($3, notes), updated_at = NOW()
                 WHERE id = $1",
            )
            .bind(session_id)
            .bind(exercise_id)
            .bind(notes)
            .execute(&mut *self.conn)
            .await?;
        }

        Ok(changed)
    }

    pub async fn delete_exercise_session(&mut self, session_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM exercise_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    // Supersets

    pub async fn insert_superset(&mut self, input: &SupersetInput) -> AppResult<Uuid> {
        let superset_id = Uuid::new_v4();

        sqlx::query("INSERT INTO superset_sessions (id, notes, created_by) VALUES ($1, $2, $3)")
            .bind(superset_id)
            .bind(&input.notes)
            .bind(self.actor)
            .execute(&mut *self.conn)
            .await?;

        for (position, member) in input.exercises_data.iter().enumerate() {
            self.insert_member(superset_id, position as i32, member).await?;
        }

        Ok(superset_id)
    }

    async fn insert_member(&mut self, superset_id: Uuid, position: i32, input: &ExerciseSessionInput) -> AppResult<()> {
        let session_id = self.insert_exercise_session(input).await?;

        sqlx::query(
            "INSERT INTO superset_exercises (superset_session_id, exercise_session_id, position) VALUES ($1, $2, $3)",
        )
        .bind(superset_id)
        .bind(session_id)
        .bind(position)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Reconciles a superset's member sessions. Returns whether anything changed.
    pub async fn edit_superset(
        &mut self,
        superset_id: Uuid,
        notes: Option<&str>,
        members: &[ExerciseSessionInput],
    ) -> AppResult<bool> {
        let current_notes: Option<String> =
            sqlx::query_scalar("SELECT notes FROM superset_sessions WHERE id = $1")
                .bind(superset_id)
                .fetch_optional(&mut *self.conn)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Superset {} not found", superset_id)))?;

        let current: Vec<(Uuid, i32)> = sqlx::query_as(
            "SELECT exercise_session_id, position FROM superset_exercises
             WHERE superset_session_id = $1 ORDER BY position",
        )
        .bind(superset_id)
        .fetch_all(&mut *self.conn)
        .await?;
        let positions: HashMap<Uuid, i32> = current.iter().copied().collect();
        let current_ids: Vec<Uuid> = current.iter().map(|(id, _)| *id).collect();

        let plan = reconcile("Exercise session", "superset", &current_ids, members)?;
        let mut changed = !plan.remove.is_empty() || !plan.create.is_empty();
        let mut members_changed = false;

        if !plan.remove.is_empty() {
            sqlx::query("DELETE FROM exercise_sessions WHERE id = ANY($1)")
                .bind(&plan.remove)
                .execute(&mut *self.conn)
                .await?;
        }

        for (position, id, input) in &plan.update {
            let position = *position as i32;
            if positions.get(id) != Some(&position) {
                sqlx::query(
                    "UPDATE superset_exercises SET position = $3
                     WHERE superset_session_id = $1 AND exercise_session_id = $2",
                )
                .bind(superset_id)
                .bind(id)
                .bind(position)
                .execute(&mut *self.conn)
                .await?;
                changed = true;
            }
            members_changed |= self
                .edit_exercise_session(*id, input.exercise.id, input.notes.as_deref(), &input.session_data)
                .await?;
        }

        for (position, input) in &plan.create {
            self.insert_member(superset_id, *position as i32, input).await?;
        }

        let notes_changed = notes.is_some_and(|notes| current_notes.as_deref() != Some(notes));
        if changed || notes_changed {
            sqlx::query(
                "UPDATE superset_sessions SET notes = COALESCE($2, notes), updated_at = NOW() WHERE id = $1",
            )
            .bind(superset_id)
            .bind(notes)
            .execute(&mut *self.conn)
            .await?;
        }

        Ok(changed || notes_changed || members_changed)
    }

    pub async fn delete_superset(&mut self, superset_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "DELETE FROM exercise_sessions WHERE id IN (
                SELECT exercise_session_id FROM superset_exercises WHERE superset_session_id = $1
            )",
        )
        .bind(superset_id)
        .execute(&mut *self.conn)
        .await?;

        sqlx::query("DELETE FROM superset_sessions WHERE id = $1")
            .bind(superset_id)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    // Workout children

    pub async fn insert_child(&mut self, owner: TreeOwner, position: i32, input: &WorkoutChildInput) -> AppResult<Uuid> {
        let (session_id, superset_id) = match input {
            WorkoutChildInput::Exercise(session) => (Some(self.insert_exercise_session(session).await?), None),
            WorkoutChildInput::Superset(superset) => (None, Some(self.insert_superset(superset).await?)),
        };

        let link_id = Uuid::new_v4();
        sqlx::query(&format!(
            "INSERT INTO {} (id, {}, exercise_session_id, superset_session_id, position)
             VALUES ($1, $2, $3, $4, $5)",
            owner.link_table(),
            owner.owner_column()
        ))
        .bind(link_id)
        .bind(owner.id())
        .bind(session_id)
        .bind(superset_id)
        .bind(position)
        .execute(&mut *self.conn)
        .await?;

        Ok(link_id)
    }

    pub async fn insert_children(&mut self, owner: TreeOwner, inputs: &[WorkoutChildInput]) -> AppResult<()> {
        for (position, input) in inputs.iter().enumerate() {
            self.insert_child(owner, position as i32, input).await?;
        }
        Ok(())
    }

    /// Diffs the owner's children against `incoming`. Children are matched by
    /// the id of the exercise session or superset they hold.
    pub async fn reconcile_children(&mut self, owner: TreeOwner, incoming: &[WorkoutChildInput]) -> AppResult<bool> {
        let links = fetch_links(&mut *self.conn, owner).await?;

        let mut by_content = HashMap::with_capacity(links.len());
        for link in &links {
            by_content.insert(link.content_id()?, link);
        }
        let current_ids: Vec<Uuid> = links.iter().map(LinkRow::content_id).collect::<AppResult<_>>()?;

        let plan = reconcile("Workout exercise", owner.noun(), &current_ids, incoming)?;
        let mut changed = !plan.remove.is_empty() || !plan.create.is_empty();

        for (_, id, input) in &plan.update {
            let Some(link) = by_content.get(id) else { continue };
            let stored_superset = link.superset_session_id.is_some();
            let incoming_superset = matches!(input, WorkoutChildInput::Superset(_));
            if stored_superset != incoming_superset {
                return Err(AppError::bad_request(format!(
                    "Cannot change the session type of {}.",
                    id
                )));
            }
        }

        for id in &plan.remove {
            match by_content.get(id) {
                Some(link) if link.superset_session_id.is_some() => self.delete_superset(*id).await?,
                _ => self.delete_exercise_session(*id).await?,
            }
        }

        for (position, id, input) in &plan.update {
            let position = *position as i32;
            if let Some(link) = by_content.get(id) {
                if link.position != position {
                    sqlx::query(&format!(
                        "UPDATE {} SET position = $2, updated_at = NOW() WHERE id = $1",
                        owner.link_table()
                    ))
                    .bind(link.id)
                    .bind(position)
                    .execute(&mut *self.conn)
                    .await?;
                    changed = true;
                }
            }

            changed |= match input {
                WorkoutChildInput::Exercise(session) => {
                    self.edit_exercise_session(*id, session.exercise.id, session.notes.as_deref(), &session.session_data)
                        .await?
                }
                WorkoutChildInput::Superset(superset) => {
                    self.edit_superset(*id, superset.notes.as_deref(), &superset.exercises_data)
                        .await?
                }
            };
        }

        for (position, input) in &plan.create {
            self.insert_child(owner, *position as i32, input).await?;
        }

        Ok(changed)
    }

    /// Deletes every exercise session and superset hanging off the owner.
    /// The owner row itself is left to the caller.
    pub async fn delete_tree(&mut self, owner: TreeOwner) -> AppResult<()> {
        let table = owner.link_table();
        let column = owner.owner_column();

        sqlx::query(&format!(
            "DELETE FROM exercise_sessions WHERE id IN (
                SELECT exercise_session_id FROM {table} WHERE {column} = $1 AND exercise_session_id IS NOT NULL
                UNION
                SELECT se.exercise_session_id FROM superset_exercises se
                JOIN {table} l ON l.superset_session_id = se.superset_session_id
                WHERE l.{column} = $1
            )"
        ))
        .bind(owner.id())
        .execute(&mut *self.conn)
        .await?;

        sqlx::query(&format!(
            "DELETE FROM superset_sessions WHERE id IN (
                SELECT superset_session_id FROM {table} WHERE {column} = $1 AND superset_session_id IS NOT NULL
            )"
        ))
        .bind(owner.id())
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Recomputes and stores the owner's derived totals from its current tree.
    pub async fn recompute_totals(&mut self, owner: TreeOwner) -> AppResult<WorkoutTotals> {
        let children = load_children(&mut *self.conn, owner).await?;
        let totals = WorkoutTotals::from_children(&children);

        sqlx::query(&format!(
            "UPDATE {} SET total_exercises = $2, total_sets = $3, total_volume = $4 WHERE id = $1",
            owner.totals_table()
        ))
        .bind(owner.id())
        .bind(totals.total_exercises)
        .bind(totals.total_sets)
        .bind(totals.total_volume)
        .execute(&mut *self.conn)
        .await?;

        Ok(totals)
    }

    /// Recomputes totals of every workout and template containing the session.
    pub async fn recompute_owners_of_session(&mut self, session_id: Uuid) -> AppResult<()> {
        for owner in owners_of_exercise_session(&mut *self.conn, session_id).await? {
            self.recompute_totals(owner).await?;
        }
        Ok(())
    }

    pub async fn recompute_owners_of_superset(&mut self, superset_id: Uuid) -> AppResult<()> {
        for owner in owners_of_superset(&mut *self.conn, superset_id).await? {
            self.recompute_totals(owner).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_tables() {
        let id = Uuid::new_v4();
        let workout = TreeOwner::Workout(id);
        let template = TreeOwner::Template(id);

        assert_eq!(workout.id(), id);
        assert_eq!(workout.link_table(), "workout_exercises");
        assert_eq!(workout.owner_column(), "workout_session_id");
        assert_eq!(workout.totals_table(), "workout_sessions");
        assert_eq!(template.link_table(), "template_exercises");
        assert_eq!(template.owner_column(), "template_id");
        assert_eq!(template.totals_table(), "workout_templates");
    }

    #[test]
    fn test_link_content_id() {
        let session_id = Uuid::new_v4();
        let link = LinkRow {
            id: Uuid::new_v4(),
            exercise_session_id: Some(session_id),
            superset_session_id: None,
            position: 0,
        };
        assert_eq!(link.content_id().unwrap(), session_id);

        let empty = LinkRow {
            id: Uuid::new_v4(),
            exercise_session_id: None,
            superset_session_id: None,
            position: 0,
        };
        assert!(empty.content_id().is_err());
    }

    #[test]
    fn test_item_row_conversion() {
        let row = ItemRow {
            id: Uuid::new_v4(),
            exercise_session_id: Uuid::new_v4(),
            position: 2,
            kind: "rest".to_string(),
            created_by: Uuid::new_v4(),
            updated_at: Utc::now(),
            weight: None,
            reps: None,
            min_reps: None,
            max_reps: None,
            to_failure: None,
            bodyweight: None,
            minutes: Some(1),
            seconds: Some(30),
            time: None,
            distance: None,
            level: None,
            pace: None,
        };
        let (_, detail) = row.into_detail().unwrap();
        assert_eq!(detail.position, 2);
        assert_eq!(detail.item, SessionItem::Rest(RestData { minutes: 1, seconds: 30 }));
    }

    #[test]
    fn test_interval_row_without_data_is_an_error() {
        let row = ItemRow {
            id: Uuid::new_v4(),
            exercise_session_id: Uuid::new_v4(),
            position: 0,
            kind: "interval".to_string(),
            created_by: Uuid::new_v4(),
            updated_at: Utc::now(),
            weight: None,
            reps: None,
            min_reps: None,
            max_reps: None,
            to_failure: None,
            bodyweight: None,
            minutes: None,
            seconds: None,
            time: None,
            distance: None,
            level: None,
            pace: None,
        };
        assert!(row.into_detail().is_err());
    }
}
