//! User management endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        user::{UpdateUser, User, UserQuery},
        Pagination,
    },
};

use super::{books::PaginatedResponse, AdminUser, AuthenticatedUser, JsonBody, Path};

/// List users with search and pagination
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(UserQuery),
    responses(
        (status = 200, description = "List of users", body = UserPage),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<PaginatedResponse<User>>> {
    let pagination = Pagination::from_query(query.page.as_deref(), query.limit.as_deref());
    let (users, total) = state.services.users.search_users(pagination, query.search).await?;

    Ok(Json(PaginatedResponse::new(users, total, pagination)))
}

/// Get user details by ID
#[utoipa::path(
    get,
    path = "/user/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 403, description = "Not allowed to view another user"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<User>> {
    claims.require_self_or_admin(id)?;

    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(user))
}

/// Update an existing user
#[utoipa::path(
    put,
    path = "/user/update/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid input or email/username already taken"),
        (status = 403, description = "Not allowed to update this user or change roles"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    JsonBody(user): JsonBody<UpdateUser>,
) -> AppResult<Json<User>> {
    claims.require_self_or_admin(id)?;

    // Role changes are reserved to admins, including on their own account
    if user.role.is_some() {
        claims.require_admin()?;
    }

    user.validate()?;

    let updated = state.services.users.update_user(id, user).await?;
    Ok(Json(updated))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/user/delete/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "User still has borrowed books"),
        (status = 403, description = "Not allowed to delete this user"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_self_or_admin(id)?;

    state.services.users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
