use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::session::WorkoutChildInput;
use crate::models::workout::{TemplateDetails, WorkoutDetails, WorkoutSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Mon => "mon",
            DayOfWeek::Tue => "tue",
            DayOfWeek::Wed => "wed",
            DayOfWeek::Thu => "thu",
            DayOfWeek::Fri => "fri",
            DayOfWeek::Sat => "sat",
            DayOfWeek::Sun => "sun",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mon" => Some(DayOfWeek::Mon),
            "tue" => Some(DayOfWeek::Tue),
            "wed" => Some(DayOfWeek::Wed),
            "thu" => Some(DayOfWeek::Thu),
            "fri" => Some(DayOfWeek::Fri),
            "sat" => Some(DayOfWeek::Sat),
            "sun" => Some(DayOfWeek::Sun),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WorkoutPlan {
    pub id: Uuid,
    pub name: String,
    pub total_workouts: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PlanSummary {
    #[serde(flatten)]
    pub plan: WorkoutPlan,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct PlanDetails {
    #[serde(flatten)]
    pub plan: WorkoutPlan,
    pub is_active: bool,
    pub workouts: Vec<WorkoutDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanWorkoutInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<WorkoutChildInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlanRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub workouts: Vec<PlanWorkoutInput>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Routine {
    pub id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A routine day either points at an existing template or defines a new one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RoutineWorkoutRef {
    Existing { id: Uuid },
    New {
        #[serde(default)]
        name: String,
        #[serde(default)]
        exercises: Vec<WorkoutChildInput>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutineDayInput {
    pub day: DayOfWeek,
    pub workout: RoutineWorkoutRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoutineRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub workouts: Vec<RoutineDayInput>,
}

#[derive(Debug, Serialize)]
pub struct RoutineDay {
    pub day: DayOfWeek,
    pub workout: TemplateDetails,
}

#[derive(Debug, Serialize)]
pub struct RoutineDetails {
    #[serde(flatten)]
    pub routine: Routine,
    pub workouts: Vec<RoutineDay>,
}

#[derive(Debug, Serialize)]
pub struct StartedWorkout {
    pub template_id: Uuid,
    pub workout: WorkoutSession,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_routine_day_refs() {
        let id = Uuid::new_v4();
        let days: Vec<RoutineDayInput> = serde_json::from_value(serde_json::json!([
            {"day": "mon", "workout": {"id": id}},
            {"day": "thu", "workout": {"name": "Pull", "exercises": []}}
        ]))
        .unwrap();

        assert_matches!(days[0].workout, RoutineWorkoutRef::Existing { id: found } if found == id);
        assert_matches!(&days[1].workout, RoutineWorkoutRef::New { name, .. } if name == "Pull");
        assert_eq!(days[1].day, DayOfWeek::Thu);
    }

    #[test]
    fn test_bad_day_rejected() {
        let result: Result<RoutineDayInput, _> =
            serde_json::from_value(serde_json::json!({"day": "someday", "workout": {"id": Uuid::new_v4()}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_day_round_trip_strings() {
        for day in ["mon", "tue", "wed", "thu", "fri", "sat", "sun"] {
            assert_eq!(DayOfWeek::parse(day).map(|d| d.as_str()), Some(day));
        }
    }
}
