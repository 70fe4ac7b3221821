use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::FieldErrors;
use crate::models::session::{WorkoutChild, WorkoutChildInput};
use crate::models::totals::WorkoutTotals;
use crate::models::validation::{check_name, MAX_LEN_WORKOUT_NAME};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WorkoutSession {
    pub id: Uuid,
    pub name: String,
    pub total_exercises: i32,
    pub total_sets: i32,
    pub total_volume: f64,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WorkoutTemplate {
    pub id: Uuid,
    pub name: String,
    pub total_exercises: i32,
    pub total_sets: i32,
    pub total_volume: f64,
    pub is_published: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct WorkoutDetails {
    #[serde(flatten)]
    pub workout: WorkoutSession,
    pub exercises: Vec<WorkoutChild>,
}

#[derive(Debug, Serialize)]
pub struct TemplateDetails {
    #[serde(flatten)]
    pub template: WorkoutTemplate,
    pub exercises: Vec<WorkoutChild>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkoutRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<WorkoutChildInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditWorkoutRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub exercises: Vec<WorkoutChildInput>,
}

/// Which kind of workout a message talks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkoutKind {
    Session,
    Template,
}

impl WorkoutKind {
    fn noun(&self) -> &'static str {
        match self {
            WorkoutKind::Session => "workout",
            WorkoutKind::Template => "workout template",
        }
    }

    pub fn missing_name_message(&self) -> String {
        format!("Provide a name for your {}", self.noun())
    }

    pub fn missing_exercises_message(&self) -> String {
        format!("Please add exercises to your {}", self.noun())
    }
}

/// Checks the name and exercise list of a new workout or template and returns
/// the trimmed name.
pub fn validate_new_workout(
    kind: WorkoutKind,
    name: &str,
    exercises: &[WorkoutChildInput],
) -> Result<String, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = match check_name("name", name, MAX_LEN_WORKOUT_NAME, &kind.missing_name_message()) {
        Ok(name) => Some(name),
        Err(name_errors) => {
            errors.merge(name_errors);
            None
        }
    };

    if exercises.is_empty() {
        errors.add("exercises", kind.missing_exercises_message());
    }
    errors.merge(validate_children(exercises));

    match name {
        Some(name) if errors.is_empty() => Ok(name),
        _ => Err(errors),
    }
}

pub fn validate_children(exercises: &[WorkoutChildInput]) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for (index, child) in exercises.iter().enumerate() {
        errors.merge(child.validate(&format!("exercises[{}]", index)));
    }
    errors
}

#[derive(Debug, Serialize)]
pub struct WorkoutTotalsResponse {
    pub id: Uuid,
    #[serde(flatten)]
    pub totals: WorkoutTotals,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::{ExerciseRef, ExerciseSessionInput};

    fn one_exercise() -> Vec<WorkoutChildInput> {
        vec![WorkoutChildInput::Exercise(ExerciseSessionInput {
            id: None,
            exercise: ExerciseRef { id: Uuid::new_v4() },
            notes: None,
            session_data: vec![],
        })]
    }

    #[test]
    fn test_missing_name() {
        let errors = validate_new_workout(WorkoutKind::Session, "  ", &one_exercise()).unwrap_err();
        assert_eq!(
            errors.get("name"),
            Some(&["Provide a name for your workout".to_string()][..])
        );
    }

    #[test]
    fn test_missing_exercises() {
        let errors = validate_new_workout(WorkoutKind::Template, "Legs", &[]).unwrap_err();
        assert_eq!(
            errors.get("exercises"),
            Some(&["Please add exercises to your workout template".to_string()][..])
        );
    }

    #[test]
    fn test_valid_workout() {
        assert_eq!(
            validate_new_workout(WorkoutKind::Session, " Legs ", &one_exercise()).unwrap(),
            "Legs"
        );
    }
}
