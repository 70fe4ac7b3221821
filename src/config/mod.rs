// Environment configuration, database pool and seed data

pub mod app;
pub mod database;
pub mod seeding;

pub use app::AppConfig;
pub use database::{run_migrations, DatabaseConfig};
pub use seeding::DatabaseSeeder;
