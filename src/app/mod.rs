pub mod auth;
pub mod follows;
pub mod jobs;
pub mod notifications;
pub mod posts;
pub mod users;
