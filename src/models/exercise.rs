use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::validation::flexible_bool;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MuscleGroup {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    pub is_cardio: bool,
    pub bodyweight: bool,
    pub is_published: bool,
    pub video_url: Option<String>,
    pub video_key: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Exercise {
    pub fn is_builtin(&self) -> bool {
        self.created_by.is_none()
    }

    pub fn is_owned_by(&self, profile_id: Uuid) -> bool {
        self.created_by == Some(profile_id)
    }

    /// Built-in, published, or the caller's own.
    pub fn is_visible_to(&self, profile_id: Uuid) -> bool {
        self.is_builtin() || self.is_published || self.is_owned_by(profile_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExerciseResponse {
    pub id: Uuid,
    pub name: String,
    pub is_cardio: bool,
    pub bodyweight: bool,
    pub is_published: bool,
    pub is_builtin: bool,
    pub video: Option<String>,
    pub created_by: Option<Uuid>,
    pub targeted_muscle_groups: Vec<MuscleGroup>,
    pub instructions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ExerciseResponse {
    pub fn new(exercise: Exercise, targeted_muscle_groups: Vec<MuscleGroup>, instructions: Vec<String>) -> Self {
        Self {
            is_builtin: exercise.is_builtin(),
            id: exercise.id,
            name: exercise.name,
            is_cardio: exercise.is_cardio,
            bodyweight: exercise.bodyweight,
            is_published: exercise.is_published,
            video: exercise.video_url,
            created_by: exercise.created_by,
            targeted_muscle_groups,
            instructions,
            created_at: exercise.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateExerciseRequest {
    #[validate(length(min = 1, max = 50, message = "Ensure the exercise name has between 1 and 50 characters."))]
    pub name: String,
    #[serde(default)]
    pub targeted_muscle_groups: Vec<Uuid>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_cardio: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub bodyweight: bool,
    #[serde(default)]
    #[validate(length(max = 30, message = "An exercise can have at most 30 instructions."))]
    pub instructions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExerciseSearchQuery {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ExerciseSearchResponse {
    pub exercises_by_user: Vec<ExerciseResponse>,
    pub published: Vec<ExerciseResponse>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProgressEntry {
    pub weight: Option<f64>,
    pub reps: Option<i32>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ExerciseProgressResponse {
    pub exercise_id: Uuid,
    pub entries: Vec<ProgressEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(created_by: Option<Uuid>, is_published: bool) -> Exercise {
        Exercise {
            id: Uuid::new_v4(),
            name: "Deadlift".to_string(),
            is_cardio: false,
            bodyweight: false,
            is_published,
            video_url: None,
            video_key: None,
            created_by,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_visibility() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(exercise(None, true).is_visible_to(me));
        assert!(exercise(Some(me), false).is_visible_to(me));
        assert!(exercise(Some(other), true).is_visible_to(me));
        assert!(!exercise(Some(other), false).is_visible_to(me));
    }

    #[test]
    fn test_create_request_validation() {
        let request: CreateExerciseRequest = serde_json::from_str(r#"{"name": ""}"#).unwrap();
        assert!(request.validate().is_err());

        let request: CreateExerciseRequest =
            serde_json::from_str(r#"{"name": "Cable fly", "is_cardio": "false", "instructions": ["Squeeze"]}"#).unwrap();
        assert!(request.validate().is_ok());
        assert!(!request.is_cardio);
    }
}
