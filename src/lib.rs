pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;
pub mod workers;

use crate::config::AppConfig;
use crate::domain::ports::Repositories;

#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub paseto_access_key: [u8; 32],
    pub access_ttl_minutes: u64,
    pub job_expiration_days: i64,
}

impl AppState {
    pub fn new(repos: Repositories, config: &AppConfig) -> Self {
        Self {
            repos,
            paseto_access_key: config.paseto_access_key,
            access_ttl_minutes: config.access_ttl_minutes,
            job_expiration_days: config.job_expiration_days,
        }
    }
}
