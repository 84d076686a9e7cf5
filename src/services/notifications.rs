use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::DataClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Comment,
    Like,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Comment => "comment",
            NotificationKind::Like => "like",
            NotificationKind::System => "system",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub related_post_id: Option<Uuid>,
    pub related_comment_id: Option<Uuid>,
    pub related_user_id: Option<Uuid>,
}

/// Create a notification addressed to a principal.
///
/// Notifications are best-effort side effects of comment/like actions: losing
/// one is not a correctness failure, so this never returns an error. Failures
/// are logged and swallowed; the primary action proceeds regardless.
pub async fn create_notification(
    db: &dyn DataClient,
    notification: NewNotification,
) -> Option<Value> {
    let row = json!({
        "recipient_id": notification.recipient_id,
        "title": notification.title,
        "message": notification.message,
        "kind": notification.kind.as_str(),
        "related_post_id": notification.related_post_id,
        "related_comment_id": notification.related_comment_id,
        "related_user_id": notification.related_user_id,
    });

    match db.insert("notifications", row).await {
        Ok(created) => Some(created),
        Err(e) => {
            tracing::warn!(
                recipient = %notification.recipient_id,
                kind = notification.kind.as_str(),
                "notification delivery failed: {}",
                e
            );
            None
        }
    }
}
