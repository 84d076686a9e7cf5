use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::notifications::{create_notification, NewNotification, NotificationKind};
use crate::database::{DataClient, StoreError};
use crate::error::ApiError;
use crate::filter::{Filters, SelectOptions};

/// Result of a like toggle: the new membership state and the post's counter
/// value after the write.
#[derive(Debug, Clone, Serialize)]
pub struct LikeToggle {
    pub liked: bool,
    pub likes: i64,
}

/// Toggle the like membership for `(post_id, user_id)` and keep the post's
/// denormalized counter consistent with the membership set.
///
/// The membership row is the source of truth and is always written first; the
/// counter is adjusted afterwards through an atomic store-side function. If the
/// counter write fails, the toggle still succeeds: the counter is recomputed
/// from the membership rows and the recomputed value is written back, so the
/// stored counter matches the membership set again once toggles are quiescent.
pub async fn toggle_like(
    db: &dyn DataClient,
    post_id: Uuid,
    user_id: Uuid,
) -> Result<LikeToggle, ApiError> {
    // Post must be visible under the caller's policy
    let posts = db
        .select(
            "blog_posts",
            &["id", "author_id", "title", "likes"],
            &Filters::new().eq("id", json!(post_id)),
            &SelectOptions::default(),
        )
        .await?;
    let Some(post) = posts.into_iter().next() else {
        return Err(ApiError::not_found("Post not found"));
    };

    let membership = Filters::new()
        .eq("post_id", json!(post_id))
        .eq("user_id", json!(user_id));
    let existing = db
        .select("post_likes", &["post_id"], &membership, &SelectOptions::default())
        .await?;

    if existing.is_empty() {
        match db
            .insert("post_likes", json!({ "post_id": post_id, "user_id": user_id }))
            .await
        {
            Ok(_) => {}
            Err(StoreError::Conflict(_)) => {
                // Concurrent toggle by the same user won the race; final state
                // is "liked" and the winner already adjusted the counter
                let likes = recount(db, post_id).await?;
                return Ok(LikeToggle { liked: true, likes });
            }
            Err(e) => return Err(e.into()),
        }

        let likes = adjust_counter(db, post_id, 1).await?;

        // Notify the post's author; the like itself never fails on this
        let author_id = post
            .get("author_id")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Uuid>().ok());
        if let Some(author_id) = author_id.filter(|a| *a != user_id) {
            let title = post.get("title").and_then(|v| v.as_str()).unwrap_or("your post");
            create_notification(
                db,
                NewNotification {
                    recipient_id: author_id,
                    title: "New like".to_string(),
                    message: format!("Someone liked \"{}\"", title),
                    kind: NotificationKind::Like,
                    related_post_id: Some(post_id),
                    related_comment_id: None,
                    related_user_id: Some(user_id),
                },
            )
            .await;
        }

        Ok(LikeToggle { liked: true, likes })
    } else {
        let deleted = db.delete("post_likes", &membership).await?;
        let likes = if deleted.is_empty() {
            // Row vanished between the read and the delete; the other toggle
            // already settled the counter
            recount(db, post_id).await?
        } else {
            adjust_counter(db, post_id, -1).await?
        };
        Ok(LikeToggle { liked: false, likes })
    }
}

/// Adjust the stored counter atomically, falling back to a reconciling recount
/// when the adjustment cannot be applied.
async fn adjust_counter(db: &dyn DataClient, post_id: Uuid, delta: i64) -> Result<i64, ApiError> {
    match db
        .rpc("adjust_like_count", json!({ "post_id": post_id, "delta": delta }))
        .await
    {
        Ok(value) => Ok(value.as_i64().unwrap_or_default()),
        Err(e) => {
            tracing::warn!(
                post = %post_id,
                "like counter adjustment failed, recounting from membership: {}",
                e
            );
            recount(db, post_id).await
        }
    }
}

/// Recompute the counter from the membership rows, the authoritative set, and
/// write the recomputed value back through the store so the stored counter does
/// not stay diverged once the membership set is quiescent. The write-back is
/// itself best-effort; membership remains authoritative if it fails too.
async fn recount(db: &dyn DataClient, post_id: Uuid) -> Result<i64, ApiError> {
    let rows = db
        .select(
            "post_likes",
            &["user_id"],
            &Filters::new().eq("post_id", json!(post_id)),
            &SelectOptions::default(),
        )
        .await?;
    let count = rows.len() as i64;

    match db
        .rpc("set_like_count", json!({ "post_id": post_id, "count": count }))
        .await
    {
        Ok(value) => Ok(value.as_i64().unwrap_or(count)),
        Err(e) => {
            tracing::warn!(post = %post_id, "like counter repair failed: {}", e);
            Ok(count)
        }
    }
}
