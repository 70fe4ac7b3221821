// Domain models: rows, request/response shapes and the pure workout-tree logic

pub mod user;
pub mod profile;
pub mod health;
pub mod exercise;
pub mod session;
pub mod workout;
pub mod plan;
pub mod totals;
pub mod reconcile;
pub mod validation;

pub use user::*;
pub use profile::*;
pub use health::*;
pub use exercise::*;
pub use session::*;
pub use workout::*;
pub use plan::*;
pub use totals::*;
pub use reconcile::*;
