use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set, Statement, TransactionTrait, Value,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::notifications::{
        Inbox, InboxEntry, NotificationList, NotificationStatus, SendNotificationRequest,
        SentNotification,
    },
    entity::{
        notification_logs::{Column as LogCol, Entity as NotificationLogs},
        notifications::{self, Column as NotificationCol, Entity as Notifications},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Notification,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Stores a notification and, unless it is scheduled for later, fans it out
/// to one log entry per user in the target audience.
pub async fn send_notification(
    state: &AppState,
    user: &AuthUser,
    payload: SendNotificationRequest,
) -> AppResult<ApiResponse<SentNotification>> {
    ensure_admin(user)?;
    let title = payload.title.trim().to_string();
    let message = payload.message.trim().to_string();
    if title.is_empty() || message.is_empty() {
        return Err(AppError::BadRequest("title and message are required".into()));
    }

    let now = Utc::now();
    let status = NotificationStatus::for_schedule(payload.scheduled_for, now);

    let txn = state.orm.begin().await?;
    let notification = notifications::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        message: Set(message),
        kind: Set(payload.kind),
        target_audience: Set(payload.target_audience),
        scheduled_for: Set(payload.scheduled_for.map(Into::into)),
        status: Set(status),
        created_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let mut recipients = 0;
    if status == NotificationStatus::Sent {
        // One log row per recipient, written without loading the audience.
        let role = payload.target_audience.role().map(|r| r.as_str().to_string());
        let result = txn
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                INSERT INTO notification_logs (id, notification_id, user_id, sent_at)
                SELECT gen_random_uuid(), $1, id, $2
                FROM users
                WHERE ($3::text IS NULL OR role = $3)
                "#,
                [Value::from(notification.id), Value::from(now), Value::from(role)],
            ))
            .await?;
        recipients = result.rows_affected() as usize;
    }

    txn.commit().await?;

    tracing::info!(
        notification_id = %notification.id,
        status = ?status,
        recipients,
        "notification stored"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "notification_send",
        "notifications",
        serde_json::json!({ "notification_id": notification.id, "recipients": recipients }),
    )
    .await;

    Ok(ApiResponse::ok(
        "Notification sent",
        SentNotification {
            notification: Notification::from(notification),
            recipients,
        },
    ))
}

pub async fn list_notifications(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<NotificationList>> {
    ensure_admin(user)?;
    let items: Vec<Notification> = Notifications::find()
        .order_by_desc(NotificationCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Notification::from)
        .collect();
    let meta = Meta::total(items.len());
    Ok(ApiResponse::success(
        "Notifications",
        NotificationList { items },
        Some(meta),
    ))
}

pub async fn my_notifications(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Inbox>> {
    let rows = NotificationLogs::find()
        .filter(LogCol::UserId.eq(user.user_id))
        .order_by_desc(LogCol::SentAt)
        .find_also_related(Notifications)
        .all(&state.orm)
        .await?;

    let items: Vec<InboxEntry> = rows
        .into_iter()
        .filter_map(|(log, notification)| {
            notification.map(|n| InboxEntry {
                id: log.id,
                sent_at: log.sent_at.with_timezone(&Utc),
                read_at: log.read_at.map(|at| at.with_timezone(&Utc)),
                notification: Notification::from(n),
            })
        })
        .collect();

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Notifications", Inbox { items }, Some(meta)))
}

pub async fn mark_read(
    state: &AppState,
    user: &AuthUser,
    log_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let log = NotificationLogs::find_by_id(log_id)
        .filter(LogCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Notification"))?;

    if log.read_at.is_none() {
        let mut active = log.into_active_model();
        active.read_at = Set(Some(Utc::now().into()));
        active.update(&state.orm).await?;
    }

    Ok(ApiResponse::ok(
        "Notification marked as read",
        serde_json::json!({ "id": log_id }),
    ))
}
