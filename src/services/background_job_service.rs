use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::CodeType;
use crate::services::{EmailService, MediaKind, MediaStorageService};

#[derive(Debug, Clone)]
pub enum JobType {
    SendConfirmationCode {
        email: String,
        username: String,
        code: String,
        code_type: CodeType,
    },
    UploadProfilePicture {
        user_id: Uuid,
        data: Vec<u8>,
        content_type: String,
    },
    UploadExerciseVideo {
        exercise_id: Uuid,
        user_id: Uuid,
        data: Vec<u8>,
        content_type: String,
    },
    DeleteMedia {
        storage_key: String,
    },
}

impl JobType {
    fn name(&self) -> &'static str {
        match self {
            JobType::SendConfirmationCode { .. } => "send_confirmation_code",
            JobType::UploadProfilePicture { .. } => "upload_profile_picture",
            JobType::UploadExerciseVideo { .. } => "upload_exercise_video",
            JobType::DeleteMedia { .. } => "delete_media",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackgroundJob {
    pub id: Uuid,
    pub job_type: JobType,
    pub created_at: DateTime<Utc>,
}

/// Jobs waiting for the worker before new ones are dropped.
pub const QUEUE_CAPACITY: usize = 32;

/// Fire-and-forget handle for queueing work off the request path.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    sender: mpsc::Sender<BackgroundJob>,
}

impl TaskQueue {
    pub fn new() -> (Self, mpsc::Receiver<BackgroundJob>) {
        Self::with_capacity(QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<BackgroundJob>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Queue a job. A full queue or a stopped worker drops it with a warning.
    pub fn enqueue(&self, job_type: JobType) -> Uuid {
        let job = BackgroundJob {
            id: Uuid::new_v4(),
            job_type,
            created_at: Utc::now(),
        };
        let job_id = job.id;
        let name = job.job_type.name();

        match self.sender.try_send(job) {
            Ok(()) => info!("Queued {} job: {}", name, job_id),
            Err(TrySendError::Full(_)) => warn!("Background queue is full, dropped {} job {}", name, job_id),
            Err(TrySendError::Closed(_)) => {
                warn!("Background worker is not running, dropped {} job {}", name, job_id)
            }
        }
        job_id
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeStats {
    pub blacklisted_tokens: u64,
    pub refresh_tokens: u64,
    pub confirmation_codes: u64,
}

pub struct BackgroundJobService {
    db: PgPool,
    email_service: EmailService,
    storage: Option<MediaStorageService>,
}

impl BackgroundJobService {
    pub fn new(db: PgPool, email_service: EmailService, storage: Option<MediaStorageService>) -> Self {
        Self {
            db,
            email_service,
            storage,
        }
    }

    /// Drain the queue until every sender is dropped.
    pub fn spawn_worker(self: Arc<Self>, mut receiver: mpsc::Receiver<BackgroundJob>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Background job worker started");
            while let Some(job) = receiver.recv().await {
                self.run_job(job).await;
            }
            info!("Background job worker stopped");
        })
    }

    /// Start the hourly maintenance schedule
    pub async fn start_maintenance(&self) -> Result<JobScheduler> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow!("Failed to create job scheduler: {}", e))?;

        let db = self.db.clone();
        let job = Job::new_async("0 0 * * * *", move |_uuid, _l| {
            let db = db.clone();
            Box::pin(async move {
                match purge_expired(&db).await {
                    Ok(stats) => info!("Maintenance purge finished: {:?}", stats),
                    Err(e) => error!("Maintenance purge failed: {:#}", e),
                }
            })
        })
        .map_err(|e| anyhow!("Failed to create maintenance job: {}", e))?;

        scheduler
            .add(job)
            .await
            .map_err(|e| anyhow!("Failed to add maintenance job to scheduler: {}", e))?;
        scheduler
            .start()
            .await
            .map_err(|e| anyhow!("Failed to start job scheduler: {}", e))?;

        info!("Background job scheduler started");
        Ok(scheduler)
    }

    async fn run_job(&self, job: BackgroundJob) {
        let name = job.job_type.name();
        info!("Starting {} job: {}", name, job.id);

        let result = match job.job_type {
            JobType::SendConfirmationCode {
                email,
                username,
                code,
                code_type,
            } => self
                .email_service
                .send_confirmation_code(&email, &username, &code, code_type)
                .await
                .map_err(anyhow::Error::from),
            JobType::UploadProfilePicture {
                user_id,
                data,
                content_type,
            } => self.upload_profile_picture(user_id, data, &content_type).await,
            JobType::UploadExerciseVideo {
                exercise_id,
                user_id,
                data,
                content_type,
            } => self.upload_exercise_video(exercise_id, user_id, data, &content_type).await,
            JobType::DeleteMedia { storage_key } => self.delete_media(&storage_key).await,
        };

        match result {
            Ok(()) => info!("Completed {} job: {}", name, job.id),
            Err(e) => error!("Failed {} job {}: {:#}", name, job.id, e),
        }
    }

    fn storage(&self) -> Result<&MediaStorageService> {
        self.storage
            .as_ref()
            .ok_or_else(|| anyhow!("Media storage is not configured"))
    }

    async fn delete_media(&self, storage_key: &str) -> Result<()> {
        self.storage()?.delete(storage_key).await
    }

    async fn upload_profile_picture(&self, user_id: Uuid, data: Vec<u8>, content_type: &str) -> Result<()> {
        let storage = self.storage()?;
        let storage_key = storage
            .upload(MediaKind::ProfilePicture, user_id, data, content_type)
            .await?;

        let previous: Option<Option<String>> =
            sqlx::query_scalar("SELECT picture_key FROM profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;

        let Some(previous_key) = previous else {
            warn!("Profile {} disappeared before its picture was stored", user_id);
            return storage.delete(&storage_key).await;
        };

        sqlx::query(
            "UPDATE profiles SET picture_url = $2, picture_key = $3, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(storage.public_url(&storage_key))
        .bind(&storage_key)
        .execute(&self.db)
        .await?;

        if let Some(previous_key) = previous_key {
            storage.delete(&previous_key).await?;
        }
        Ok(())
    }

    async fn upload_exercise_video(
        &self,
        exercise_id: Uuid,
        user_id: Uuid,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let storage = self.storage()?;
        let storage_key = storage
            .upload(MediaKind::ExerciseVideo, user_id, data, content_type)
            .await?;

        let previous: Option<Option<String>> =
            sqlx::query_scalar("SELECT video_key FROM exercises WHERE id = $1 AND created_by = $2")
                .bind(exercise_id)
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;

        let Some(previous_key) = previous else {
            warn!("Exercise {} disappeared before its video was stored", exercise_id);
            return storage.delete(&storage_key).await;
        };

        sqlx::query("UPDATE exercises SET video_url = $2, video_key = $3 WHERE id = $1")
            .bind(exercise_id)
            .bind(storage.public_url(&storage_key))
            .bind(&storage_key)
            .execute(&self.db)
            .await?;

        if let Some(previous_key) = previous_key {
            storage.delete(&previous_key).await?;
        }
        Ok(())
    }
}

/// Delete expired blacklist entries, refresh tokens and confirmation codes.
pub async fn purge_expired(db: &PgPool) -> Result<PurgeStats> {
    let blacklisted_tokens = sqlx::query("DELETE FROM token_blacklist WHERE expires_at <= NOW()")
        .execute(db)
        .await?
        .rows_affected();
    let refresh_tokens = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= NOW() OR revoked")
        .execute(db)
        .await?
        .rows_affected();
    let confirmation_codes = sqlx::query("DELETE FROM confirmation_codes WHERE expires_at <= NOW()")
        .execute(db)
        .await?
        .rows_affected();

    Ok(PurgeStats {
        blacklisted_tokens,
        refresh_tokens,
        confirmation_codes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_enqueue_delivers_job() {
        let (queue, mut receiver) = TaskQueue::new();
        let job_id = queue.enqueue(JobType::DeleteMedia {
            storage_key: "pictures/a/b.png".to_string(),
        });

        let job = receiver.recv().await.unwrap();
        assert_eq!(job.id, job_id);
        assert_matches!(job.job_type, JobType::DeleteMedia { storage_key } if storage_key == "pictures/a/b.png");
    }

    #[test]
    fn test_enqueue_without_worker_does_not_panic() {
        let (queue, receiver) = TaskQueue::new();
        drop(receiver);
        queue.enqueue(JobType::SendConfirmationCode {
            email: "lifter@example.com".to_string(),
            username: "lifter".to_string(),
            code: "12345".to_string(),
            code_type: CodeType::AccountVerification,
        });
    }

    #[tokio::test]
    async fn test_full_queue_drops_new_jobs() {
        let (queue, mut receiver) = TaskQueue::with_capacity(1);
        let kept = queue.enqueue(JobType::UploadProfilePicture {
            user_id: Uuid::new_v4(),
            data: vec![0u8; 16],
            content_type: "image/png".to_string(),
        });
        queue.enqueue(JobType::DeleteMedia {
            storage_key: "pictures/old.png".to_string(),
        });

        assert_eq!(receiver.recv().await.unwrap().id, kept);
        assert_matches!(receiver.try_recv(), Err(mpsc::error::TryRecvError::Empty));
    }
}
