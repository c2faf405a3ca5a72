use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::auth::{AuthService, Registration};
use crate::app::follows::FollowService;
use crate::app::jobs::{JobDraft, JobService};
use crate::app::notifications::NotificationService;
use crate::app::posts::PostService;
use crate::app::users::{Dashboard, DirectoryEntry, ProfileUpdate, UserService};
use crate::domain::follow::{FollowRequest, FollowState, FollowStatus};
use crate::domain::job::JobView;
use crate::domain::notification::Notification;
use crate::domain::post::{LikeToggle, PostView};
use crate::domain::user::{PublicUser, UserSummary};
use crate::http::extract::{JsonBody, Path};
use crate::http::{AppError, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub msg: &'static str,
}

fn message(msg: &'static str) -> Json<MessageResponse> {
    Json(MessageResponse { msg })
}

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(&state.repos, state.paseto_access_key, state.access_ttl_minutes)
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = match state.repos.users.ping().await {
        Ok(()) => "ok",
        Err(err) => {
            tracing::warn!(error = ?err, "store ping failed");
            "degraded"
        }
    };

    Json(HealthResponse { status })
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
    pub avatar: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let user = auth_service(&state)
        .register(Registration {
            name: payload.name,
            email: payload.email,
            password: payload.password,
            role: payload.role,
            avatar: payload.avatar,
        })
        .await?;

    tracing::info!(user_id = %user.id, role = user.role.as_db(), "user registered");
    Ok((StatusCode::CREATED, message("user registered successfully")))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub user: PublicUser,
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let session = auth_service(&state)
        .login(&payload.email, &payload.password)
        .await?;

    Ok(Json(LoginResponse {
        token: session.access.token,
        expires_at: session.access.expires_at,
        user: PublicUser::from(session.user),
    }))
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user: PublicUser,
}

pub async fn get_profile(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let user = UserService::new(&state.repos).get(auth.user_id).await?;
    Ok(Json(UserResponse {
        user: PublicUser::from(user),
    }))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub avatar: Option<String>,
    pub old_password: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct ProfileUpdatedResponse {
    pub msg: &'static str,
    pub user: PublicUser,
}

pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UpdateProfileRequest>,
) -> Result<Json<ProfileUpdatedResponse>, AppError> {
    let user = UserService::new(&state.repos)
        .update_profile(
            auth.user_id,
            ProfileUpdate {
                name: payload.name,
                email: payload.email,
                role: payload.role,
                avatar: payload.avatar,
                old_password: payload.old_password,
                password: payload.password,
            },
        )
        .await?;

    Ok(Json(ProfileUpdatedResponse {
        msg: "profile updated successfully",
        user: PublicUser::from(user),
    }))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

pub async fn change_password(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    UserService::new(&state.repos)
        .change_password(auth.user_id, &payload.current_password, &payload.new_password)
        .await?;
    Ok(message("password updated successfully"))
}

pub async fn delete_account(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    UserService::new(&state.repos)
        .delete_account(auth.user_id)
        .await?;
    Ok(message("account deleted successfully"))
}

pub async fn get_user(
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let user = UserService::new(&state.repos).get(id).await?;
    Ok(Json(UserResponse {
        user: PublicUser::from(user),
    }))
}

#[derive(Serialize)]
pub struct PostsResponse {
    pub posts: Vec<PostView>,
}

pub async fn list_user_posts(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<PostsResponse>, AppError> {
    let posts = PostService::new(&state.repos)
        .list_by_author(auth.user_id, id)
        .await?;
    Ok(Json(PostsResponse { posts }))
}

pub async fn list_users(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<DirectoryEntry>>, AppError> {
    let entries = UserService::new(&state.repos).directory().await?;
    Ok(Json(entries))
}

pub async fn dashboard(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Dashboard>, AppError> {
    let dashboard = UserService::new(&state.repos)
        .dashboard(auth.user_id)
        .await?;
    Ok(Json(dashboard))
}

#[derive(Serialize)]
pub struct FollowRequestSentResponse {
    pub msg: &'static str,
    pub status: FollowStatus,
}

pub async fn send_follow_request(
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<FollowRequestSentResponse>, AppError> {
    let edge = FollowService::new(&state.repos)
        .send_request(auth.user_id, user_id)
        .await?;

    Ok(Json(FollowRequestSentResponse {
        msg: "follow request sent",
        status: edge.status,
    }))
}

pub async fn accept_follow_request(
    auth: AuthUser,
    Path(follower_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    FollowService::new(&state.repos)
        .accept_request(auth.user_id, follower_id)
        .await?;
    Ok(message("follow request accepted"))
}

pub async fn reject_follow_request(
    auth: AuthUser,
    Path(follower_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    FollowService::new(&state.repos)
        .reject_request(auth.user_id, follower_id)
        .await?;
    Ok(message("follow request rejected"))
}

pub async fn unfollow_user(
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    FollowService::new(&state.repos)
        .unfollow(auth.user_id, user_id)
        .await?;
    Ok(message("unfollowed successfully"))
}

pub async fn list_follow_requests(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<FollowRequest>>, AppError> {
    let requests = FollowService::new(&state.repos)
        .pending_requests(auth.user_id)
        .await?;
    Ok(Json(requests))
}

#[derive(Serialize)]
pub struct FollowStatusResponse {
    pub status: FollowState,
}

pub async fn follow_status(
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<FollowStatusResponse>, AppError> {
    let status = FollowService::new(&state.repos)
        .status_of(auth.user_id, user_id)
        .await?;
    Ok(Json(FollowStatusResponse { status }))
}

pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = NotificationService::new(&state.repos)
        .list(auth.user_id, None)
        .await?;
    Ok(Json(notifications))
}

pub async fn clear_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    NotificationService::new(&state.repos)
        .clear(auth.user_id)
        .await?;
    Ok(message("notifications cleared"))
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub content: String,
    pub image: Option<String>,
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostView>), AppError> {
    let post = PostService::new(&state.repos)
        .create(auth.user_id, &payload.content, payload.image)
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn list_posts(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let posts = PostService::new(&state.repos).feed(auth.user_id).await?;
    Ok(Json(posts))
}

pub async fn get_post(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<PostView>, AppError> {
    let post = PostService::new(&state.repos).get(auth.user_id, id).await?;
    Ok(Json(post))
}

pub async fn delete_post(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    PostService::new(&state.repos)
        .delete(auth.user_id, id)
        .await?;
    Ok(message("post deleted"))
}

#[derive(Serialize)]
pub struct LikeResponse {
    pub msg: &'static str,
    pub liked: bool,
}

pub async fn toggle_like(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<LikeResponse>, AppError> {
    let outcome = PostService::new(&state.repos)
        .toggle_like(auth.user_id, id)
        .await?;

    let response = match outcome {
        LikeToggle::Liked => LikeResponse {
            msg: "post liked",
            liked: true,
        },
        LikeToggle::Removed => LikeResponse {
            msg: "like removed",
            liked: false,
        },
    };
    Ok(Json(response))
}

pub async fn unlike_post(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    PostService::new(&state.repos)
        .unlike(auth.user_id, id)
        .await?;
    Ok(message("like removed"))
}

#[derive(Deserialize)]
pub struct CreateJobRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub salary: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Serialize)]
pub struct JobResponse {
    pub job: JobView,
}

#[derive(Serialize)]
pub struct JobUpdatedResponse {
    pub msg: &'static str,
    pub job: JobView,
}

#[derive(Serialize)]
pub struct JobsResponse {
    pub jobs: Vec<JobView>,
}

#[derive(Serialize)]
pub struct ApplicantsResponse {
    pub applicants: Vec<UserSummary>,
}

fn job_service(state: &AppState) -> JobService {
    JobService::new(&state.repos, state.job_expiration_days)
}

pub async fn create_job(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobResponse>), AppError> {
    let job = job_service(&state)
        .create(
            auth.user_id,
            JobDraft {
                title: payload.title,
                description: payload.description,
                location: payload.location,
                salary: payload.salary,
                skills: payload.skills,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(JobResponse { job })))
}

pub async fn list_jobs(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<JobsResponse>, AppError> {
    let jobs = job_service(&state).list().await?;
    Ok(Json(JobsResponse { jobs }))
}

pub async fn apply_to_job(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<JobUpdatedResponse>, AppError> {
    let job = job_service(&state).apply(auth.user_id, id).await?;
    Ok(Json(JobUpdatedResponse {
        msg: "applied successfully",
        job,
    }))
}

pub async fn withdraw_application(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<JobUpdatedResponse>, AppError> {
    let job = job_service(&state).withdraw(auth.user_id, id).await?;
    Ok(Json(JobUpdatedResponse {
        msg: "application withdrawn",
        job,
    }))
}

pub async fn remove_applicant(
    auth: AuthUser,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    State(state): State<AppState>,
) -> Result<Json<JobUpdatedResponse>, AppError> {
    let job = job_service(&state)
        .remove_applicant(auth.user_id, id, user_id)
        .await?;
    Ok(Json(JobUpdatedResponse {
        msg: "applicant removed successfully",
        job,
    }))
}

pub async fn list_applicants(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ApplicantsResponse>, AppError> {
    let applicants = job_service(&state).applicants(auth.user_id, id).await?;
    Ok(Json(ApplicantsResponse { applicants }))
}

pub async fn delete_job(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    job_service(&state).delete(auth.user_id, id).await?;
    Ok(message("job deleted"))
}
