use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::validation::{opt_f64, opt_i32};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Very,
    Extreme,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 5] = [
        ActivityLevel::Sedentary,
        ActivityLevel::Light,
        ActivityLevel::Moderate,
        ActivityLevel::Very,
        ActivityLevel::Extreme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "Sedentary",
            ActivityLevel::Light => "Light",
            ActivityLevel::Moderate => "Moderate",
            ActivityLevel::Very => "Very",
            ActivityLevel::Extreme => "Extreme",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessGoal {
    Bulk,
    Cut,
    Maintain,
}

impl FitnessGoal {
    pub const ALL: [FitnessGoal; 3] = [FitnessGoal::Bulk, FitnessGoal::Cut, FitnessGoal::Maintain];

    pub fn as_str(&self) -> &'static str {
        match self {
            FitnessGoal::Bulk => "Bulk",
            FitnessGoal::Cut => "Cut",
            FitnessGoal::Maintain => "Maintain",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|goal| goal.as_str() == value)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Measures {
    pub profile_id: Uuid,
    pub height: Option<i32>,
    pub weight: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MeasuresResponse {
    pub height: Option<i32>,
    pub weight: Option<f64>,
}

impl From<&Measures> for MeasuresResponse {
    fn from(measures: &Measures) -> Self {
        Self {
            height: measures.height,
            weight: measures.weight,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMeasuresRequest {
    #[serde(default, deserialize_with = "opt_i32")]
    pub height: Option<i32>,
    #[serde(default, deserialize_with = "opt_f64")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MeasureHistoryEntry {
    pub height: Option<i32>,
    pub weight: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct WeightSummary {
    pub weight: Option<f64>,
    pub last_weigh_in: Option<String>,
    pub history: Vec<WeightEntry>,
}

#[derive(Debug, Serialize)]
pub struct WeightEntry {
    pub weight: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, FromRow)]
pub struct Fitness {
    pub profile_id: Uuid,
    pub activity: Option<String>,
    pub goal: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FitnessResponse {
    pub activity: Option<String>,
    pub goal: Option<String>,
}

impl From<&Fitness> for FitnessResponse {
    fn from(fitness: &Fitness) -> Self {
        Self {
            activity: fitness.activity.clone(),
            goal: fitness.goal.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivityRequest {
    pub activity: String,
}

#[derive(Debug, Deserialize)]
pub struct GoalRequest {
    pub goal: String,
}

/// Human label for how long ago the last weigh-in happened.
pub fn last_weigh_in_label(last: NaiveDate, today: NaiveDate) -> String {
    match (today - last).num_days() {
        days if days <= 0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        days => format!("{} days ago", days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_parsing() {
        assert_eq!(ActivityLevel::parse("Moderate"), Some(ActivityLevel::Moderate));
        assert_eq!(ActivityLevel::parse("moderate"), None);
        assert_eq!(ActivityLevel::parse("Lazy"), None);
    }

    #[test]
    fn test_goal_parsing() {
        assert_eq!(FitnessGoal::parse("Cut"), Some(FitnessGoal::Cut));
        assert_eq!(FitnessGoal::parse("Shred"), None);
    }

    #[test]
    fn test_last_weigh_in_label() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(last_weigh_in_label(today, today), "Today");
        assert_eq!(
            last_weigh_in_label(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(), today),
            "Yesterday"
        );
        assert_eq!(
            last_weigh_in_label(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(), today),
            "10 days ago"
        );
    }
}
