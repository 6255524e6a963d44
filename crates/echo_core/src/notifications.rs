//! crates/echo_core/src/notifications.rs
//!
//! Read-state transitions for a user's notifications. The read flag only ever
//! moves from false to true.

use tracing::info;

use crate::domain::{Notification, NotificationId, User};
use crate::ports::{DatabaseService, PortResult};

#[derive(Debug, Clone)]
pub struct Inbox {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

pub async fn inbox(db: &dyn DatabaseService, user: &User) -> PortResult<Inbox> {
    let notifications = db.list_notifications(user.id).await?;
    let unread_count = notifications.iter().filter(|n| !n.read).count();
    Ok(Inbox {
        notifications,
        unread_count,
    })
}

/// Marks one of `user`'s notifications as read. Notifications owned by someone
/// else are reported as not found.
pub async fn mark_read(
    db: &dyn DatabaseService,
    user: &User,
    notification_id: NotificationId,
) -> PortResult<Notification> {
    let mut notification = db.get_notification(user.id, notification_id).await?;
    if !notification.read {
        db.mark_notification_read(notification.id).await?;
        notification.read = true;
    }
    Ok(notification)
}

/// Returns how many notifications changed state.
pub async fn mark_all_read(db: &dyn DatabaseService, user: &User) -> PortResult<u64> {
    let updated = db.mark_all_notifications_read(user.id).await?;
    info!(user_id = %user.id, updated, "Notifications marked as read");
    Ok(updated)
}
