use axum::{routing::delete, routing::get, routing::post, routing::put, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn accounts() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/profile", get(handlers::get_profile))
        .route("/profile/update", put(handlers::update_profile))
        .route("/change-password", put(handlers::change_password))
        .route("/delete-account", delete(handlers::delete_account))
        .route("/user/:id", get(handlers::get_user))
        .route("/user/:id/posts", get(handlers::list_user_posts))
        .route("/users", get(handlers::list_users))
        .route("/dashboard", get(handlers::dashboard))
}

pub fn follows() -> Router<AppState> {
    Router::new()
        .route("/follow/requests", get(handlers::list_follow_requests))
        .route("/follow/accept/:follower_id", put(handlers::accept_follow_request))
        .route("/follow/reject/:follower_id", delete(handlers::reject_follow_request))
        .route("/follow/:user_id", post(handlers::send_follow_request))
        .route("/unfollow/:user_id", delete(handlers::unfollow_user))
        .route("/follow-status/:user_id", get(handlers::follow_status))
}

pub fn notifications() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(handlers::list_notifications))
        .route("/notifications/clear", delete(handlers::clear_notifications))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route("/posts", post(handlers::create_post).get(handlers::list_posts))
        .route("/posts/:id", get(handlers::get_post).delete(handlers::delete_post))
        .route("/posts/:id/like", post(handlers::toggle_like))
        .route("/posts/:id/unlike", delete(handlers::unlike_post))
}

pub fn jobs() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(handlers::create_job).get(handlers::list_jobs))
        .route("/jobs/:id", delete(handlers::delete_job))
        .route("/jobs/:id/apply", post(handlers::apply_to_job))
        .route("/jobs/:id/withdraw", delete(handlers::withdraw_application))
        .route("/jobs/:id/applicants", get(handlers::list_applicants))
        .route(
            "/jobs/:id/applicants/:user_id",
            delete(handlers::remove_applicant),
        )
}
