use chrono::{Duration, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use crate::auth::password::{
    generate_confirmation_code, hash_password, validate_password_strength, verify_password, PasswordPolicy,
};
use crate::auth::{
    AuthError, AuthResponse, ChangePasswordRequest, ForgottenPasswordRequest, JwtService, LoginRequest,
    MessageResponse, RefreshTokenRequest, RegisterRequest, ResetPasswordRequest, TokenResponse, TokenType,
    UserSession, VerifyAccountRequest, VerifyResetCodeRequest,
};
use crate::error::FieldErrors;
use crate::models::validation::normalize_username;
use crate::models::{CodeType, ConfirmationCode, User, UserResponse};
use crate::services::{JobType, TaskQueue};

const CONFIRMATION_CODE_TTL_HOURS: i64 = 24;

pub const DUPLICATE_EMAIL: &str = "A user with this email already exists.";
pub const DUPLICATE_USERNAME: &str = "A user with this username already exists.";

#[derive(Debug, Clone)]
pub struct AuthService {
    jwt_service: JwtService,
    db: PgPool,
    tasks: TaskQueue,
    password_policy: PasswordPolicy,
}

impl AuthService {
    pub fn new(db: PgPool, jwt_secret: &str, tasks: TaskQueue) -> Self {
        Self {
            jwt_service: JwtService::new(jwt_secret),
            db,
            tasks,
            password_policy: PasswordPolicy::default(),
        }
    }

    /// Register a new, unverified user together with its empty profile
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let email = request.email.trim().to_lowercase();
        let request = RegisterRequest { email, ..request };

        let mut errors = match request.validate() {
            Ok(()) => FieldErrors::new(),
            Err(validation) => FieldErrors::from(validation),
        };
        let username = match normalize_username(&request.username) {
            Ok(username) => Some(username),
            Err(username_errors) => {
                errors.merge(username_errors);
                None
            }
        };
        if let Err(password_errors) =
            validate_password_strength("password", &request.password, &self.password_policy)
        {
            errors.merge(password_errors);
        }

        if self.get_user_by_email(&request.email).await?.is_some() {
            errors.add("email", DUPLICATE_EMAIL);
        }
        if let Some(username) = &username {
            if self.username_taken(username).await? {
                errors.add("username", DUPLICATE_USERNAME);
            }
        }

        let username = match username {
            Some(username) if errors.is_empty() => username,
            _ => return Err(AuthError::Validation(errors)),
        };

        let password_hash = hash_password(&request.password)?;
        let user_id = Uuid::new_v4();

        let mut tx = self.db.begin().await?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, username, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING id, email, username, password_hash, is_verified, created_at, updated_at",
        )
        .bind(user_id)
        .bind(&request.email)
        .bind(&username)
        .bind(&password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        sqlx::query("INSERT INTO profiles (user_id) VALUES ($1)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO measures (profile_id) VALUES ($1)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO fitness (profile_id) VALUES ($1)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        let code = get_or_create_code(&mut *tx, user.id, CodeType::AccountVerification).await?;

        tx.commit().await?;

        tracing::info!("Registered user {}", user.id);
        self.queue_code_email(&user, code, CodeType::AccountVerification);

        self.issue_tokens(&user).await
    }

    /// Login user
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let user = self
            .get_user_by_email(&request.email.trim().to_lowercase())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        self.issue_tokens(&user).await
    }

    /// Refresh access token
    pub async fn refresh_token(&self, request: RefreshTokenRequest) -> Result<TokenResponse, AuthError> {
        let claims = self
            .jwt_service
            .validate_token_of_type(&request.refresh_token, TokenType::Refresh)?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        if !self.is_refresh_token_valid(user_id, &request.refresh_token).await? {
            return Err(AuthError::InvalidToken);
        }

        let user = self.current_user(user_id).await?;
        let access_token = self
            .jwt_service
            .create_access_token(user.id, &user.email, &user.username)?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_service.access_token_expires_in_seconds(),
        })
    }

    /// Logout user (blacklist token)
    pub async fn logout(&self, session: &UserSession) -> Result<MessageResponse, AuthError> {
        self.blacklist_token(&session.jti, session.exp as i64).await?;
        self.revoke_user_refresh_tokens(session.user_id).await?;

        Ok(MessageResponse::new("User signed out"))
    }

    /// Check if token is blacklisted
    pub async fn is_token_blacklisted(&self, jti: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("SELECT 1 FROM token_blacklist WHERE jti = $1 AND expires_at > NOW()")
            .bind(jti)
            .fetch_optional(&self.db)
            .await?;

        Ok(result.is_some())
    }

    /// Validate user session from token
    pub async fn validate_session(&self, token: &str) -> Result<UserSession, AuthError> {
        let session = self.jwt_service.extract_user_session(token)?;

        if self.is_token_blacklisted(&session.jti).await? {
            return Err(AuthError::InvalidToken);
        }

        Ok(session)
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, username, password_hash, is_verified, created_at, updated_at
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AuthError::UserNotFound)
    }

    pub async fn verify_account(
        &self,
        session: &UserSession,
        request: VerifyAccountRequest,
    ) -> Result<MessageResponse, AuthError> {
        let mut tx = self.db.begin().await?;

        let code = find_valid_code(&mut *tx, session.user_id, CodeType::AccountVerification)
            .await?
            .filter(|stored| stored.code == request.code.trim())
            .ok_or(AuthError::WrongConfirmationCode)?;

        sqlx::query("UPDATE users SET is_verified = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(session.user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM confirmation_codes WHERE id = $1")
            .bind(code.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!("User {} verified their email", session.user_id);

        Ok(MessageResponse::new("Email confirmed"))
    }

    pub async fn resend_verification(&self, session: &UserSession) -> Result<MessageResponse, AuthError> {
        let user = self.current_user(session.user_id).await?;
        if user.is_verified {
            return Ok(MessageResponse::new("Email already confirmed"));
        }

        let mut conn = self.db.acquire().await?;
        let code = get_or_create_code(&mut *conn, user.id, CodeType::AccountVerification).await?;
        self.queue_code_email(&user, code, CodeType::AccountVerification);

        Ok(MessageResponse::new("Confirmation code sent"))
    }

    pub async fn forgotten_password(&self, request: ForgottenPasswordRequest) -> Result<(), AuthError> {
        let user = self.user_for_reset(&request.email).await?;

        let mut conn = self.db.acquire().await?;
        let code = get_or_create_code(&mut *conn, user.id, CodeType::ForgottenPassword).await?;
        self.queue_code_email(&user, code, CodeType::ForgottenPassword);

        Ok(())
    }

    pub async fn verify_reset_code(&self, request: VerifyResetCodeRequest) -> Result<MessageResponse, AuthError> {
        let user = self.user_for_reset(&request.email).await?;

        let mut conn = self.db.acquire().await?;
        find_valid_code(&mut *conn, user.id, CodeType::ForgottenPassword)
            .await?
            .filter(|stored| stored.code == request.code.trim())
            .ok_or(AuthError::WrongConfirmationCode)?;

        Ok(MessageResponse::new("Confirmation code is valid"))
    }

    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<MessageResponse, AuthError> {
        if request.password != request.re_pass {
            return Err(AuthError::PasswordMismatch);
        }

        let user = self.user_for_reset(&request.email).await?;
        validate_password_strength("password", &request.password, &self.password_policy)?;

        let mut tx = self.db.begin().await?;

        let code = find_valid_code(&mut *tx, user.id, CodeType::ForgottenPassword)
            .await?
            .filter(|stored| stored.code == request.code.trim())
            .ok_or(AuthError::WrongConfirmationCode)?;

        let password_hash = hash_password(&request.password)?;
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(user.id)
            .bind(&password_hash)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM confirmation_codes WHERE id = $1")
            .bind(code.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!("Password reset for user {}", user.id);

        Ok(MessageResponse::new("Password has been reset"))
    }

    pub async fn change_password(
        &self,
        session: &UserSession,
        request: ChangePasswordRequest,
    ) -> Result<MessageResponse, AuthError> {
        let user = self.current_user(session.user_id).await?;

        if !verify_password(&request.current_password, &user.password_hash)? {
            return Err(FieldErrors::single("current_password", "Your current password is incorrect.").into());
        }
        validate_password_strength("new_password", &request.new_password, &self.password_policy)?;

        let password_hash = hash_password(&request.new_password)?;
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(user.id)
            .bind(&password_hash)
            .execute(&self.db)
            .await?;
        self.revoke_user_refresh_tokens(user.id).await?;

        Ok(MessageResponse::new("Password changed"))
    }

    // Private helper methods

    async fn issue_tokens(&self, user: &User) -> Result<AuthResponse, AuthError> {
        let (access_token, refresh_token) = self
            .jwt_service
            .create_token_pair(user.id, &user.email, &user.username)?;

        self.store_refresh_token(user.id, &refresh_token).await?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_service.access_token_expires_in_seconds(),
            user: UserResponse::from(user),
        })
    }

    fn queue_code_email(&self, user: &User, code: String, code_type: CodeType) {
        self.tasks.enqueue(JobType::SendConfirmationCode {
            email: user.email.clone(),
            username: user.username.clone(),
            code,
            code_type,
        });
    }

    async fn user_for_reset(&self, email: &str) -> Result<User, AuthError> {
        let email = email.trim().to_lowercase();
        if !email.validate_email() {
            return Err(AuthError::InvalidEmailFormat);
        }
        self.get_user_by_email(&email)
            .await?
            .ok_or(AuthError::EmailNotRegistered)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, username, password_hash, is_verified, created_at, updated_at
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn username_taken(&self, username: &str) -> Result<bool, AuthError> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.db)
            .await?;
        Ok(taken)
    }

    async fn store_refresh_token(&self, user_id: Uuid, refresh_token: &str) -> Result<(), AuthError> {
        let claims = self.jwt_service.validate_token(refresh_token)?;
        let expires_at = chrono::DateTime::from_timestamp(claims.exp as i64, 0).ok_or(AuthError::InvalidToken)?;

        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(format!("{:x}", md5::compute(refresh_token)))
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn is_refresh_token_valid(&self, user_id: Uuid, refresh_token: &str) -> Result<bool, AuthError> {
        let token_hash = format!("{:x}", md5::compute(refresh_token));

        let result = sqlx::query(
            "SELECT 1 FROM refresh_tokens
             WHERE user_id = $1 AND token_hash = $2 AND expires_at > NOW() AND NOT revoked",
        )
        .bind(user_id)
        .bind(token_hash)
        .fetch_optional(&self.db)
        .await?;

        Ok(result.is_some())
    }

    async fn revoke_user_refresh_tokens(&self, user_id: Uuid) -> Result<(), AuthError> {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn blacklist_token(&self, jti: &str, exp: i64) -> Result<(), AuthError> {
        let expires_at = chrono::DateTime::from_timestamp(exp, 0).ok_or(AuthError::InvalidToken)?;

        sqlx::query(
            "INSERT INTO token_blacklist (jti, expires_at) VALUES ($1, $2)
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

/// The user's live code of this type, or a fresh one replacing any expired code.
pub async fn get_or_create_code(
    conn: &mut PgConnection,
    user_id: Uuid,
    code_type: CodeType,
) -> Result<String, AuthError> {
    if let Some(existing) = find_valid_code(conn, user_id, code_type).await? {
        return Ok(existing.code);
    }

    let code: String = sqlx::query_scalar(
        "INSERT INTO confirmation_codes (id, user_id, code, code_type, expires_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (user_id, code_type)
         DO UPDATE SET code = EXCLUDED.code, created_at = NOW(), expires_at = EXCLUDED.expires_at
         RETURNING code",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(generate_confirmation_code())
    .bind(code_type.as_str())
    .bind(Utc::now() + Duration::hours(CONFIRMATION_CODE_TTL_HOURS))
    .fetch_one(&mut *conn)
    .await?;

    Ok(code)
}

async fn find_valid_code(
    conn: &mut PgConnection,
    user_id: Uuid,
    code_type: CodeType,
) -> Result<Option<ConfirmationCode>, AuthError> {
    let code = sqlx::query_as::<_, ConfirmationCode>(
        "SELECT id, user_id, code, code_type, created_at, expires_at
         FROM confirmation_codes WHERE user_id = $1 AND code_type = $2",
    )
    .bind(user_id)
    .bind(code_type.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(code.filter(|code| !code.is_expired(Utc::now())))
}

/// Concurrent registrations lose the race on the unique indexes.
fn map_unique_violation(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.constraint() {
            Some("users_email_key") => return FieldErrors::single("email", DUPLICATE_EMAIL).into(),
            Some("users_username_key") => return FieldErrors::single("username", DUPLICATE_USERNAME).into(),
            _ => {}
        }
    }
    AuthError::Database(err)
}
