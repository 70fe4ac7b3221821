use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FieldErrors;
use crate::models::reconcile::Identified;
use crate::models::validation::{flexible_bool, i32_or_zero, opt_f64, opt_i32};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetData {
    #[serde(default, deserialize_with = "opt_f64")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "opt_i32")]
    pub reps: Option<i32>,
    #[serde(default, deserialize_with = "opt_i32")]
    pub min_reps: Option<i32>,
    #[serde(default, deserialize_with = "opt_i32")]
    pub max_reps: Option<i32>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub to_failure: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub bodyweight: bool,
}

impl SetData {
    /// Bodyweight sets carry no weight; sets to failure carry no rep targets.
    pub fn normalized(mut self) -> Self {
        if self.bodyweight {
            self.weight = None;
        }
        if self.to_failure {
            self.reps = None;
            self.min_reps = None;
            self.max_reps = None;
        }
        self
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.weight.is_some_and(|w| w < 0.0 || !w.is_finite()) {
            errors.add("weight", "Ensure this value is greater than or equal to 0.");
        }
        for (field, value) in [("reps", self.reps), ("min_reps", self.min_reps), ("max_reps", self.max_reps)] {
            if value.is_some_and(|v| v < 0) {
                errors.add(field, "Ensure this value is greater than or equal to 0.");
            }
        }
        if let (Some(min), Some(max)) = (self.min_reps, self.max_reps) {
            if min > max {
                errors.add("min_reps", "Minimum reps cannot exceed maximum reps.");
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn volume(&self) -> f64 {
        match (self.weight, self.reps) {
            (Some(weight), Some(reps)) => weight * reps as f64,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestData {
    #[serde(default, deserialize_with = "i32_or_zero")]
    pub minutes: i32,
    #[serde(default, deserialize_with = "i32_or_zero")]
    pub seconds: i32,
}

impl RestData {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.minutes < 0 {
            errors.add("minutes", "Ensure this value is greater than or equal to 0.");
        }
        if !(0..60).contains(&self.seconds) {
            errors.add("seconds", "Seconds must be between 0 and 59.");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalData {
    pub time: NaiveTime,
    #[serde(default, deserialize_with = "i32_or_zero")]
    pub distance: i32,
    #[serde(default, deserialize_with = "i32_or_zero")]
    pub level: i32,
    #[serde(default, deserialize_with = "i32_or_zero")]
    pub pace: i32,
}

impl IntervalData {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        for (field, value) in [("distance", self.distance), ("level", self.level), ("pace", self.pace)] {
            if value < 0 {
                errors.add(field, "Ensure this value is greater than or equal to 0.");
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Set,
    Rest,
    Interval,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Set => "set",
            ItemKind::Rest => "rest",
            ItemKind::Interval => "interval",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "set" => Some(ItemKind::Set),
            "rest" => Some(ItemKind::Rest),
            "interval" => Some(ItemKind::Interval),
            _ => None,
        }
    }

    /// Display name used in user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::Set => "Set",
            ItemKind::Rest => "Rest",
            ItemKind::Interval => "Interval",
        }
    }
}

/// A session item payload: `{"type": "set", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum SessionItem {
    Set(SetData),
    Rest(RestData),
    Interval(IntervalData),
}

impl SessionItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            SessionItem::Set(_) => ItemKind::Set,
            SessionItem::Rest(_) => ItemKind::Rest,
            SessionItem::Interval(_) => ItemKind::Interval,
        }
    }

    pub fn normalized(self) -> Self {
        match self {
            SessionItem::Set(set) => SessionItem::Set(set.normalized()),
            other => other,
        }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        match self {
            SessionItem::Set(set) => set.validate(),
            SessionItem::Rest(rest) => rest.validate(),
            SessionItem::Interval(interval) => interval.validate(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionItemInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(flatten)]
    pub item: SessionItem,
}

impl Identified for SessionItemInput {
    fn existing_id(&self) -> Option<Uuid> {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExerciseRef {
    pub id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExerciseSessionInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub exercise: ExerciseRef,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub session_data: Vec<SessionItemInput>,
}

impl Identified for ExerciseSessionInput {
    fn existing_id(&self) -> Option<Uuid> {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupersetInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub exercises_data: Vec<ExerciseSessionInput>,
}

impl Identified for SupersetInput {
    fn existing_id(&self) -> Option<Uuid> {
        self.id
    }
}

/// One entry of a workout's exercise list.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "session_type", rename_all = "lowercase")]
pub enum WorkoutChildInput {
    Exercise(ExerciseSessionInput),
    Superset(SupersetInput),
}

impl Identified for WorkoutChildInput {
    fn existing_id(&self) -> Option<Uuid> {
        match self {
            WorkoutChildInput::Exercise(session) => session.id,
            WorkoutChildInput::Superset(superset) => superset.id,
        }
    }
}

impl WorkoutChildInput {
    /// Item-level validation for the whole subtree, keyed by a path such as
    /// `exercises[1].exercises_data[0].session_data[2].reps`.
    pub fn validate(&self, path: &str) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match self {
            WorkoutChildInput::Exercise(session) => {
                errors.merge(validate_session_input(session, path));
            }
            WorkoutChildInput::Superset(superset) => {
                if superset.exercises_data.is_empty() {
                    errors.add(&format!("{}.exercises_data", path), "A superset needs at least one exercise.");
                }
                for (index, session) in superset.exercises_data.iter().enumerate() {
                    errors.merge(validate_session_input(
                        session,
                        &format!("{}.exercises_data[{}]", path, index),
                    ));
                }
            }
        }
        errors
    }
}

/// Body of `PUT /exercise-sessions/:id`. Absent notes are left as they are.
/// `session_data` is the full item list and must be present.
#[derive(Debug, Clone, Deserialize)]
pub struct EditExerciseSessionRequest {
    #[serde(default)]
    pub notes: Option<String>,
    pub session_data: Vec<SessionItemInput>,
}

/// Body of `PUT /supersets/:id`.
#[derive(Debug, Clone, Deserialize)]
pub struct EditSupersetRequest {
    #[serde(default)]
    pub notes: Option<String>,
    pub exercises_data: Vec<ExerciseSessionInput>,
}

pub fn validate_items(items: &[SessionItemInput], path: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for (index, input) in items.iter().enumerate() {
        if let Err(item_errors) = input.item.validate() {
            errors.merge(item_errors.with_prefix(&format!("{}[{}]", path, index)));
        }
    }
    errors
}

pub fn validate_session_input(session: &ExerciseSessionInput, path: &str) -> FieldErrors {
    validate_items(&session.session_data, &format!("{}.session_data", path))
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionItemDetail {
    pub id: Uuid,
    pub position: i32,
    pub created_by: Uuid,
    #[serde(flatten)]
    pub item: SessionItem,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExerciseSummary {
    pub id: Uuid,
    pub name: String,
    pub is_cardio: bool,
    pub bodyweight: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExerciseSessionDetail {
    pub id: Uuid,
    pub exercise: ExerciseSummary,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub session_data: Vec<SessionItemDetail>,
    pub updated_at: DateTime<Utc>,
}

impl ExerciseSessionDetail {
    /// Fresh input that recreates this session (ids dropped).
    pub fn to_new_input(&self) -> ExerciseSessionInput {
        ExerciseSessionInput {
            id: None,
            exercise: ExerciseRef { id: self.exercise.id },
            notes: self.notes.clone(),
            session_data: self
                .session_data
                .iter()
                .map(|item| SessionItemInput {
                    id: None,
                    item: item.item.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SupersetDetail {
    pub id: Uuid,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub exercises: Vec<ExerciseSessionDetail>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "session_type", rename_all = "lowercase")]
pub enum WorkoutChildContent {
    Exercise(ExerciseSessionDetail),
    Superset(SupersetDetail),
}

/// A positioned child of a workout or template.
#[derive(Debug, Clone, Serialize)]
pub struct WorkoutChild {
    pub link_id: Uuid,
    pub position: i32,
    #[serde(flatten)]
    pub content: WorkoutChildContent,
}

impl WorkoutChild {
    pub fn content_id(&self) -> Uuid {
        match &self.content {
            WorkoutChildContent::Exercise(session) => session.id,
            WorkoutChildContent::Superset(superset) => superset.id,
        }
    }

    pub fn to_new_input(&self) -> WorkoutChildInput {
        match &self.content {
            WorkoutChildContent::Exercise(session) => WorkoutChildInput::Exercise(session.to_new_input()),
            WorkoutChildContent::Superset(superset) => WorkoutChildInput::Superset(SupersetInput {
                id: None,
                notes: superset.notes.clone(),
                exercises_data: superset.exercises.iter().map(|s| s.to_new_input()).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_session_edit_requires_item_list() {
        let notes_only = serde_json::from_value::<EditExerciseSessionRequest>(serde_json::json!({ "notes": "felt heavy" }));
        assert!(notes_only.is_err());

        let cleared: EditExerciseSessionRequest =
            serde_json::from_value(serde_json::json!({ "session_data": [] })).unwrap();
        assert!(cleared.notes.is_none());
        assert!(cleared.session_data.is_empty());
    }

    #[test]
    fn test_set_normalization() {
        let set = SetData {
            weight: Some(20.0),
            reps: Some(10),
            min_reps: Some(8),
            max_reps: Some(12),
            to_failure: true,
            bodyweight: true,
        }
        .normalized();

        assert_eq!(set.weight, None);
        assert_eq!(set.reps, None);
        assert_eq!(set.min_reps, None);
        assert_eq!(set.max_reps, None);
    }

    #[test]
    fn test_set_volume() {
        let set = SetData {
            weight: Some(62.5),
            reps: Some(4),
            ..Default::default()
        };
        assert_eq!(set.volume(), 250.0);
        assert_eq!(SetData::default().volume(), 0.0);
    }

    #[test]
    fn test_set_validation() {
        let set = SetData {
            weight: Some(-1.0),
            min_reps: Some(10),
            max_reps: Some(5),
            ..Default::default()
        };
        let errors = set.validate().unwrap_err();
        assert!(errors.get("weight").is_some());
        assert!(errors.get("min_reps").is_some());
    }

    #[test]
    fn test_rest_validation() {
        assert!(RestData { minutes: 1, seconds: 30 }.validate().is_ok());
        assert!(RestData { minutes: 0, seconds: 75 }.validate().is_err());
    }

    #[test]
    fn test_item_payload_shape() {
        let input: SessionItemInput = serde_json::from_str(
            r#"{"type": "set", "data": {"weight": "80", "reps": 5}}"#,
        )
        .unwrap();
        assert_eq!(input.id, None);
        assert_matches!(input.item, SessionItem::Set(SetData { weight: Some(w), reps: Some(5), .. }) if w == 80.0);

        let input: SessionItemInput = serde_json::from_str(
            r#"{"id": "6f1c1a3e-5a53-4c43-9f3a-0b5f6c1c2d11", "type": "interval", "data": {"time": "00:05:00", "distance": 1000, "level": 3, "pace": 5}}"#,
        )
        .unwrap();
        assert!(input.id.is_some());
        assert_eq!(input.item.kind(), ItemKind::Interval);
    }

    #[test]
    fn test_workout_child_payload_shape() {
        let exercise_id = Uuid::new_v4();
        let json = serde_json::json!([
            {
                "session_type": "exercise",
                "exercise": {"id": exercise_id, "name": "Bench press"},
                "session_data": [
                    {"type": "set", "data": {"weight": 60, "reps": 10}},
                    {"type": "rest", "data": {"minutes": 2, "seconds": 0}}
                ]
            },
            {
                "session_type": "superset",
                "notes": "back to back",
                "exercises_data": [
                    {"exercise": {"id": exercise_id}, "session_data": []}
                ]
            }
        ]);

        let children: Vec<WorkoutChildInput> = serde_json::from_value(json).unwrap();
        assert_eq!(children.len(), 2);
        assert_matches!(&children[0], WorkoutChildInput::Exercise(s) if s.session_data.len() == 2);
        assert_matches!(&children[1], WorkoutChildInput::Superset(s) if s.exercises_data.len() == 1);
    }

    #[test]
    fn test_child_validation_reports_paths() {
        let child = WorkoutChildInput::Exercise(ExerciseSessionInput {
            id: None,
            exercise: ExerciseRef { id: Uuid::new_v4() },
            notes: None,
            session_data: vec![SessionItemInput {
                id: None,
                item: SessionItem::Rest(RestData { minutes: 0, seconds: 90 }),
            }],
        });

        let errors = child.validate("exercises[0]");
        assert!(errors.get("exercises[0].session_data[0].seconds").is_some());
    }

    #[test]
    fn test_item_serializes_flat() {
        let detail = SessionItemDetail {
            id: Uuid::new_v4(),
            position: 0,
            created_by: Uuid::new_v4(),
            item: SessionItem::Rest(RestData { minutes: 1, seconds: 0 }),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["type"], "rest");
        assert_eq!(value["data"]["minutes"], 1);
    }
}
