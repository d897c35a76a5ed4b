use sqlx::SqlitePool;

use crate::config::Config;

pub mod achievement;
pub mod category;
pub mod progress_profile;
pub mod task;
pub mod user;
pub mod weekly_review;
pub mod xp_log;

pub use achievement::*;
pub use category::*;
pub use progress_profile::*;
pub use task::*;
pub use user::*;
pub use weekly_review::*;
pub use xp_log::*;

/// Application state shared across all handlers
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
}
