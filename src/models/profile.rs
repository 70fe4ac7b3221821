use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::health::{FitnessResponse, MeasuresResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Man,
    Woman,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Man => "Man",
            Gender::Woman => "Woman",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Man" => Some(Gender::Man),
            "Woman" => Some(Gender::Woman),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub gender: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub bio: Option<String>,
    pub picture_url: Option<String>,
    pub picture_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ProfileDetails {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
    pub full_name: Option<String>,
    pub gender: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub bio: Option<String>,
    pub picture: Option<String>,
    pub measures: MeasuresResponse,
    pub fitness: FitnessResponse,
}

/// Current value of a single editable profile field.
#[derive(Debug, Serialize)]
pub struct ProfileField<T: Serialize> {
    pub value: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TextFieldRequest {
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UsernameRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct BirthdayRequest {
    pub birthday: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct GenderRequest {
    pub gender: String,
}

#[derive(Debug, Serialize)]
pub struct PictureResponse {
    pub picture: Option<String>,
}
