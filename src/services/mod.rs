// Business logic services

pub mod background_job_service;
pub mod email_service;
pub mod media_storage_service;
pub mod session_tree;
pub mod profile_service;
pub mod health_service;
pub mod exercise_service;
pub mod exercise_session_service;
pub mod workout_service;
pub mod template_service;
pub mod plan_service;

pub use background_job_service::{purge_expired, BackgroundJobService, JobType, TaskQueue};
pub use email_service::{EmailService, SmtpConfig};
pub use media_storage_service::{MediaKind, MediaStorageService};
pub use profile_service::ProfileService;
pub use health_service::HealthService;
pub use exercise_service::ExerciseService;
pub use exercise_session_service::ExerciseSessionService;
pub use workout_service::WorkoutService;
pub use template_service::TemplateService;
pub use plan_service::PlanService;
