//! Postgres adapters. Every port is implemented directly on [`Db`](crate::infra::db::Db).

mod follows;
mod jobs;
mod notifications;
mod posts;
mod users;
