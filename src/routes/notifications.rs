use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::{dsl::count_star, prelude::*, PgConnection};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::{NewNotification, Notification},
    schema::notifications,
    state::AppState,
};

use super::to_iso;

pub const SEVERITY_INFO: &str = "info";
pub const SEVERITY_SUCCESS: &str = "success";
pub const SEVERITY_WARNING: &str = "warning";
pub const SEVERITY_ERROR: &str = "error";

pub const RELATED_MEMBER: &str = "member";
pub const RELATED_DOCUMENT: &str = "document";

const LIST_LIMIT: i64 = 50;

#[derive(Serialize)]
pub struct RelatedEntity {
    pub kind: String,
    pub id: Uuid,
}

#[derive(Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub severity: String,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<RelatedEntity>,
    pub created_at: String,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        let related = match (notification.related_kind, notification.related_id) {
            (Some(kind), Some(id)) => Some(RelatedEntity { kind, id }),
            _ => None,
        };
        Self {
            id: notification.id,
            title: notification.title,
            message: notification.message,
            severity: notification.severity,
            read: notification.read,
            related,
            created_at: to_iso(notification.created_at),
        }
    }
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub unread: i64,
}

/// Fan-out helper used by member and document creation.
pub(super) fn notify(
    conn: &mut PgConnection,
    user_id: Uuid,
    title: &str,
    message: &str,
    severity: &str,
    related: Option<(&str, Uuid)>,
) -> AppResult<()> {
    let new_notification = NewNotification {
        id: Uuid::new_v4(),
        user_id,
        title: title.to_string(),
        message: message.to_string(),
        severity: severity.to_string(),
        read: false,
        related_kind: related.map(|(kind, _)| kind.to_string()),
        related_id: related.map(|(_, id)| id),
    };

    diesel::insert_into(notifications::table)
        .values(&new_notification)
        .execute(conn)?;
    Ok(())
}

pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<NotificationResponse>>> {
    let mut conn = state.db()?;

    let rows: Vec<Notification> = notifications::table
        .filter(notifications::user_id.eq(user.user_id))
        .order(notifications::created_at.desc())
        .limit(LIST_LIMIT)
        .load(&mut conn)?;

    Ok(Json(
        rows.into_iter().map(NotificationResponse::from).collect(),
    ))
}

pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<UnreadCountResponse>> {
    let mut conn = state.db()?;

    let unread: i64 = notifications::table
        .filter(notifications::user_id.eq(user.user_id))
        .filter(notifications::read.eq(false))
        .select(count_star())
        .first(&mut conn)?;

    Ok(Json(UnreadCountResponse { unread }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;

    let updated = diesel::update(
        notifications::table
            .find(notification_id)
            .filter(notifications::user_id.eq(user.user_id)),
    )
    .set(notifications::read.eq(true))
    .execute(&mut conn)?;

    if updated == 0 {
        return Err(AppError::not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;

    diesel::update(
        notifications::table
            .filter(notifications::user_id.eq(user.user_id))
            .filter(notifications::read.eq(false)),
    )
    .set(notifications::read.eq(true))
    .execute(&mut conn)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_notification(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;

    let deleted = diesel::delete(
        notifications::table
            .find(notification_id)
            .filter(notifications::user_id.eq(user.user_id)),
    )
    .execute(&mut conn)?;

    if deleted == 0 {
        return Err(AppError::not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_all(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;

    diesel::delete(notifications::table.filter(notifications::user_id.eq(user.user_id)))
        .execute(&mut conn)?;

    Ok(StatusCode::NO_CONTENT)
}
