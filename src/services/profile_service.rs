use chrono::{NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::validation::{normalize_username, MAX_LEN_BIO, MAX_LEN_FULL_NAME, MAX_LEN_USERNAME};
use crate::models::{FitnessResponse, Gender, MeasuresResponse, PictureResponse, ProfileDetails, ProfileField};
use crate::services::{JobType, MediaKind, TaskQueue};

pub const USERNAME_TAKEN: &str = "This username isn't available. Please try another.";
pub const MEDIA_NOT_CONFIGURED: &str = "Media storage is not configured";

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: Uuid,
    username: String,
    email: String,
    is_verified: bool,
    full_name: Option<String>,
    gender: Option<String>,
    birthday: Option<NaiveDate>,
    bio: Option<String>,
    picture_url: Option<String>,
    height: Option<i32>,
    weight: Option<f64>,
    activity: Option<String>,
    goal: Option<String>,
}

/// Text profile fields sharing the same nullable, length-capped shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    FullName,
    Bio,
}

impl TextField {
    fn column(&self) -> &'static str {
        match self {
            TextField::FullName => "full_name",
            TextField::Bio => "bio",
        }
    }

    pub fn max_length(&self) -> usize {
        match self {
            TextField::FullName => MAX_LEN_FULL_NAME,
            TextField::Bio => MAX_LEN_BIO,
        }
    }
}

/// Trims a nullable text field; blank becomes `None`.
pub fn clean_optional_text(field: &str, value: Option<String>, max_len: usize) -> Result<Option<String>, FieldErrors> {
    let Some(value) = value else { return Ok(None) };
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if value.chars().count() > max_len {
        return Err(FieldErrors::single(
            field,
            format!("Ensure this field has no more than {} characters.", max_len),
        ));
    }
    Ok(Some(value.to_string()))
}

pub fn check_birthday(birthday: Option<NaiveDate>, today: NaiveDate) -> Result<(), FieldErrors> {
    match birthday {
        Some(date) if date > today => Err(FieldErrors::single("birthday", "Birthday cannot be in the future.")),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct ProfileService {
    db: PgPool,
    tasks: TaskQueue,
    media_enabled: bool,
}

impl ProfileService {
    pub fn new(db: PgPool, tasks: TaskQueue, media_enabled: bool) -> Self {
        Self {
            db,
            tasks,
            media_enabled,
        }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<ProfileDetails> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT u.id, u.username, u.email, u.is_verified,
                    p.full_name, p.gender, p.birthday, p.bio, p.picture_url,
                    m.height, m.weight, f.activity, f.goal
             FROM users u
             JOIN profiles p ON p.user_id = u.id
             LEFT JOIN measures m ON m.profile_id = p.user_id
             LEFT JOIN fitness f ON f.profile_id = p.user_id
             WHERE u.id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Profile not found"))?;

        Ok(ProfileDetails {
            id: row.id,
            username: row.username,
            email: row.email,
            is_verified: row.is_verified,
            full_name: row.full_name,
            gender: row.gender,
            birthday: row.birthday,
            bio: row.bio,
            picture: row.picture_url,
            measures: MeasuresResponse {
                height: row.height,
                weight: row.weight,
            },
            fitness: FitnessResponse {
                activity: row.activity,
                goal: row.goal,
            },
        })
    }

    pub async fn get_text_field(&self, user_id: Uuid, field: TextField) -> AppResult<ProfileField<Option<String>>> {
        let value: Option<String> = sqlx::query_scalar(&format!(
            "SELECT {} FROM profiles WHERE user_id = $1",
            field.column()
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Profile not found"))?;

        Ok(ProfileField {
            value,
            max_length: Some(field.max_length()),
        })
    }

    pub async fn set_text_field(
        &self,
        user_id: Uuid,
        field: TextField,
        value: Option<String>,
    ) -> AppResult<ProfileField<Option<String>>> {
        let value = clean_optional_text("value", value, field.max_length())?;

        sqlx::query(&format!(
            "UPDATE profiles SET {} = $2, updated_at = NOW() WHERE user_id = $1",
            field.column()
        ))
        .bind(user_id)
        .bind(&value)
        .execute(&self.db)
        .await?;

        Ok(ProfileField {
            value,
            max_length: Some(field.max_length()),
        })
    }

    pub async fn get_username(&self, user_id: Uuid) -> AppResult<ProfileField<String>> {
        let username: String = sqlx::query_scalar("SELECT username FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Profile not found"))?;

        Ok(ProfileField {
            value: username,
            max_length: Some(MAX_LEN_USERNAME),
        })
    }

    /// Changes the username and keeps the previous one in the history.
    pub async fn set_username(&self, user_id: Uuid, raw: &str) -> AppResult<ProfileField<String>> {
        let username = normalize_username(raw)?;

        let mut tx = self.db.begin().await?;

        let current: String = sqlx::query_scalar("SELECT username FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Profile not found"))?;

        if current != username {
            let taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
                .bind(&username)
                .fetch_one(&mut *tx)
                .await?;
            if taken {
                return Err(AppError::bad_request(USERNAME_TAKEN));
            }

            sqlx::query("INSERT INTO username_history (id, user_id, username) VALUES ($1, $2, $3)")
                .bind(Uuid::new_v4())
                .bind(user_id)
                .bind(&current)
                .execute(&mut *tx)
                .await?;

            sqlx::query("UPDATE users SET username = $2, updated_at = NOW() WHERE id = $1")
                .bind(user_id)
                .bind(&username)
                .execute(&mut *tx)
                .await
                .map_err(|err| match &err {
                    sqlx::Error::Database(db_err) if db_err.constraint() == Some("users_username_key") => {
                        AppError::bad_request(USERNAME_TAKEN)
                    }
                    _ => AppError::Database(err),
                })?;

            tracing::info!("User {} changed username", user_id);
        }

        tx.commit().await?;

        Ok(ProfileField {
            value: username,
            max_length: Some(MAX_LEN_USERNAME),
        })
    }

    pub async fn get_birthday(&self, user_id: Uuid) -> AppResult<ProfileField<Option<NaiveDate>>> {
        let birthday: Option<NaiveDate> = sqlx::query_scalar("SELECT birthday FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Profile not found"))?;

        Ok(ProfileField {
            value: birthday,
            max_length: None,
        })
    }

    pub async fn set_birthday(
        &self,
        user_id: Uuid,
        birthday: Option<NaiveDate>,
    ) -> AppResult<ProfileField<Option<NaiveDate>>> {
        check_birthday(birthday, Utc::now().date_naive())?;

        sqlx::query("UPDATE profiles SET birthday = $2, updated_at = NOW() WHERE user_id = $1")
            .bind(user_id)
            .bind(birthday)
            .execute(&self.db)
            .await?;

        Ok(ProfileField {
            value: birthday,
            max_length: None,
        })
    }

    pub async fn get_gender(&self, user_id: Uuid) -> AppResult<ProfileField<Option<String>>> {
        let gender: Option<String> = sqlx::query_scalar("SELECT gender FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Profile not found"))?;

        Ok(ProfileField {
            value: gender,
            max_length: None,
        })
    }

    pub async fn set_gender(&self, user_id: Uuid, raw: &str) -> AppResult<ProfileField<Option<String>>> {
        let gender = Gender::parse(raw.trim())
            .ok_or_else(|| AppError::bad_request(format!("Invalid gender choice: {}", raw)))?;

        sqlx::query("UPDATE profiles SET gender = $2, updated_at = NOW() WHERE user_id = $1")
            .bind(user_id)
            .bind(gender.as_str())
            .execute(&self.db)
            .await?;

        Ok(ProfileField {
            value: Some(gender.as_str().to_string()),
            max_length: None,
        })
    }

    pub async fn get_picture(&self, user_id: Uuid) -> AppResult<PictureResponse> {
        let picture: Option<String> = sqlx::query_scalar("SELECT picture_url FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Profile not found"))?;

        Ok(PictureResponse { picture })
    }

    /// Queues the upload; the picture URL is set once the upload completes.
    pub async fn upload_picture(&self, user_id: Uuid, data: Vec<u8>, content_type: &str) -> AppResult<()> {
        if !self.media_enabled {
            return Err(AppError::bad_request(MEDIA_NOT_CONFIGURED));
        }
        if data.is_empty() || !MediaKind::ProfilePicture.accepts(content_type) {
            return Err(FieldErrors::single("picture", "Upload a valid image.").into());
        }

        self.tasks.enqueue(JobType::UploadProfilePicture {
            user_id,
            data,
            content_type: content_type.to_string(),
        });
        Ok(())
    }

    pub async fn delete_picture(&self, user_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let previous: Option<String> =
            sqlx::query_scalar("SELECT picture_key FROM profiles WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::not_found("Profile not found"))?;

        sqlx::query("UPDATE profiles SET picture_url = NULL, picture_key = NULL, updated_at = NOW() WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if let Some(storage_key) = previous {
            self.tasks.enqueue(JobType::DeleteMedia { storage_key });
        }
        Ok(())
    }
}
