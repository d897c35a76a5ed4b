pub mod achievements;
pub mod auth;
pub mod categories;
pub mod completion;
pub mod leaderboard;
pub mod leveling;
pub mod progress;
pub mod reviews;
pub mod streaks;
pub mod tasks;
pub mod timing;
pub mod xp;
