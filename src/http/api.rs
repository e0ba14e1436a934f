//! JSON HTTP API: request identity, routes, handlers, and error
//! mapping.
//!
//! Authentication happens upstream; handlers read the verified identity
//! from trusted proxy headers and hand everything else to the service
//! layer through the storage handle.

use crate::auth::AuthContext;
use crate::error::TrackletError;
use crate::http::views::{ApiMessage, CommentResponse, IssueResponse, IssueView, UserResponse};
use crate::model::Role;
use crate::service::issues::{self, CloseOutcome, IssueInput, UpdateOutcome};
use crate::service::users::{self, RoleChange};
use crate::storage::StorageHandle;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub storage: StorageHandle,
}

pub type SharedState = Arc<AppState>;

// ── Request identity ──────────────────────────────────────────────────

/// Header carrying the upstream-verified account id.
pub const USER_HEADER: &str = "x-tracklet-user";
/// Header carrying the upstream-verified role.
pub const ROLE_HEADER: &str = "x-tracklet-role";

/// Derive the request identity from trusted proxy headers.
///
/// Absent, unparsable, or unknown values all collapse to `Anonymous`:
/// a malformed role header never grants anything.
#[must_use]
pub fn context_from_headers(headers: &HeaderMap) -> AuthContext {
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok());
    let role = headers
        .get(ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Role>().ok());

    match (user_id, role) {
        (Some(user_id), Some(role)) => AuthContext::authenticated(user_id, role),
        _ => AuthContext::Anonymous,
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(context_from_headers(&parts.headers))
    }
}

// ── Request payload types ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameUserRequest {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

// ── Error handling ────────────────────────────────────────────────────

/// Adapter turning a [`TrackletError`] into an HTTP response.
pub struct ApiError(TrackletError);

impl From<TrackletError> for ApiError {
    fn from(err: TrackletError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TrackletError::Unauthenticated => StatusCode::UNAUTHORIZED,
            TrackletError::Forbidden { .. } => StatusCode::FORBIDDEN,
            TrackletError::Validation { .. }
            | TrackletError::InvalidPriority { .. }
            | TrackletError::InvalidRole { .. } => StatusCode::BAD_REQUEST,
            TrackletError::IssueNotFound { .. } | TrackletError::UserNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            TrackletError::IssueClosed { .. } | TrackletError::CannotActOnSelf => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Server faults keep their detail in the log only.
        let message = if self.0.is_client_error() {
            self.0.to_string()
        } else {
            tracing::error!(kind = self.0.kind(), error = %self.0, "request failed");
            "An internal error occurred".to_string()
        };

        let body = ApiMessage::new(self.0.kind(), message);
        (status, Json(body)).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/issues", get(list_issues).post(create_issue))
        .route("/api/issues/{id}", get(get_issue).put(update_issue))
        .route("/api/issues/{id}/close", post(close_issue))
        .route(
            "/api/issues/{id}/comments",
            get(list_comments).post(add_comment),
        )
        .route("/api/users", get(list_users))
        .route(
            "/api/users/{id}",
            get(get_user).put(rename_user).delete(delete_user),
        )
        .route("/api/users/{id}/role", put(set_role))
}

// ── Issue handlers ────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_issues(
    State(state): State<SharedState>,
    ctx: AuthContext,
) -> Result<impl IntoResponse, ApiError> {
    let listed = state
        .storage
        .call(move |storage| issues::list_issues(storage, &ctx))
        .await?;
    let views: Vec<IssueView> = listed.into_iter().map(IssueView::from).collect();
    Ok(Json(views))
}

async fn get_issue(
    State(state): State<SharedState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let issue = state
        .storage
        .call(move |storage| issues::get_issue(storage, &ctx, id))
        .await?;
    Ok(Json(IssueView::from(issue)))
}

async fn create_issue(
    State(state): State<SharedState>,
    ctx: AuthContext,
    Json(req): Json<IssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = IssueInput {
        title: req.title,
        description: req.description,
        priority: req.priority,
    };
    let issue = state
        .storage
        .call(move |storage| issues::create_issue(storage, &ctx, &input))
        .await?;

    let response = IssueResponse {
        outcome: ApiMessage::new("created", "Issue created successfully."),
        issue: issue.into(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_issue(
    State(state): State<SharedState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
    Json(req): Json<IssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = IssueInput {
        title: req.title,
        description: req.description,
        priority: req.priority,
    };
    let outcome = state
        .storage
        .call(move |storage| issues::update_issue(storage, &ctx, id, &input))
        .await?;

    let response = match outcome {
        UpdateOutcome::Updated(issue) => IssueResponse {
            outcome: ApiMessage::new("updated", "Issue updated successfully."),
            issue: issue.into(),
        },
        UpdateOutcome::NoChange(issue) => IssueResponse {
            outcome: ApiMessage::new("no_change", "No changes were made."),
            issue: issue.into(),
        },
    };
    Ok(Json(response))
}

async fn close_issue(
    State(state): State<SharedState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .storage
        .call(move |storage| issues::close_issue(storage, &ctx, id))
        .await?;

    let response = match outcome {
        CloseOutcome::Closed(issue) => IssueResponse {
            outcome: ApiMessage::new("closed", "Issue closed successfully."),
            issue: issue.into(),
        },
        CloseOutcome::AlreadyClosed(issue) => IssueResponse {
            outcome: ApiMessage::new("no_change", "Issue was already closed."),
            issue: issue.into(),
        },
    };
    Ok(Json(response))
}

// ── Comment handlers ──────────────────────────────────────────────────

async fn list_comments(
    State(state): State<SharedState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = state
        .storage
        .call(move |storage| issues::list_comments(storage, &ctx, id))
        .await?;
    Ok(Json(comments))
}

async fn add_comment(
    State(state): State<SharedState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .storage
        .call(move |storage| issues::add_comment(storage, &ctx, id, &req.comment))
        .await?;

    let response = CommentResponse {
        outcome: ApiMessage::new("created", "Comment added successfully."),
        comment,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

// ── User handlers ─────────────────────────────────────────────────────

async fn list_users(
    State(state): State<SharedState>,
    ctx: AuthContext,
) -> Result<impl IntoResponse, ApiError> {
    let listed = state
        .storage
        .call(move |storage| users::list_users(storage, &ctx))
        .await?;
    Ok(Json(listed))
}

async fn get_user(
    State(state): State<SharedState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .storage
        .call(move |storage| users::get_user(storage, &ctx, id))
        .await?;
    Ok(Json(user))
}

async fn rename_user(
    State(state): State<SharedState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
    Json(req): Json<RenameUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .storage
        .call(move |storage| {
            users::rename_user(storage, &ctx, id, &req.first_name, &req.last_name)
        })
        .await?;

    let response = UserResponse {
        outcome: ApiMessage::new("updated", "User updated successfully."),
        user,
    };
    Ok(Json(response))
}

async fn set_role(
    State(state): State<SharedState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
    Json(req): Json<SetRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let change = state
        .storage
        .call(move |storage| users::set_role(storage, &ctx, id, &req.role))
        .await?;

    let response = match change {
        RoleChange::Changed(user) => UserResponse {
            outcome: ApiMessage::new("updated", "User role updated successfully."),
            user,
        },
        RoleChange::NoChange(user) => UserResponse {
            outcome: ApiMessage::new("no_change", "User already has that role."),
            user,
        },
    };
    Ok(Json(response))
}

async fn delete_user(
    State(state): State<SharedState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .storage
        .call(move |storage| users::delete_user(storage, &ctx, id))
        .await?;
    Ok(Json(ApiMessage::new("deleted", "User deleted successfully.")))
}

// ── Tests ─────────────────────────────────────────────────────────────
