//! Announcements sent after an activity is created. Everything here runs
//! detached from the request and only logs on failure.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::warn;

use crate::collaboration::notifications::{notify_best_effort, NewNotification};
use crate::mail::{compose, send_detached, ActivityDigest, EmailKind, Mailer};
use crate::models::activity::ActivityRow;

/// One person to tell about a new activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub user_id: i64,
    pub kind: EmailKind,
}

/// Owner then backup person. An owner who is also the backup gets both.
pub fn recipients(activity: &ActivityRow) -> Vec<Recipient> {
    let mut out = vec![Recipient {
        user_id: activity.effective_owner(),
        kind: EmailKind::Assignment,
    }];
    if let Some(backup) = activity.backup_person {
        out.push(Recipient {
            user_id: backup,
            kind: EmailKind::BackupAssignment,
        });
    }
    out
}

/// The in-app feed skips telling requesters they assigned themselves.
pub fn wants_feed_entry(recipient: &Recipient, requester_id: i64) -> bool {
    !(recipient.kind == EmailKind::Assignment && recipient.user_id == requester_id)
}

fn feed_entry(recipient: &Recipient, activity: &ActivityRow) -> NewNotification {
    let (notification_type, title, message) = match recipient.kind {
        EmailKind::BackupAssignment => (
            "backup_assignment",
            "Assigned as Backup",
            format!(
                "You are the backup person for \"{}\" on {}",
                activity.activity_name, activity.activity_date
            ),
        ),
        _ => (
            "assignment",
            "New Activity Assigned",
            format!(
                "You have been assigned \"{}\" on {}",
                activity.activity_name, activity.activity_date
            ),
        ),
    };
    NewNotification {
        user_id: recipient.user_id,
        activity_id: Some(activity.id),
        notification_type,
        title: title.to_string(),
        message,
    }
}

async fn notify_email_of(pool: &PgPool, user_id: i64) -> Result<Option<String>, sqlx::Error> {
    let email: Option<Option<String>> =
        sqlx::query_scalar("SELECT notify_email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(email.flatten().filter(|e| !e.trim().is_empty()))
}

/// Spawns the in-app notifications and emails for a freshly created activity.
pub fn announce_created(
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
    mail_from: String,
    activity: ActivityRow,
    requester_id: i64,
) {
    tokio::spawn(async move {
        let digest = ActivityDigest::from(&activity);
        for recipient in recipients(&activity) {
            if wants_feed_entry(&recipient, requester_id) {
                notify_best_effort(&pool, feed_entry(&recipient, &activity)).await;
            }

            match notify_email_of(&pool, recipient.user_id).await {
                Ok(Some(address)) => {
                    let message = compose(recipient.kind, &mail_from, &address, &digest);
                    send_detached(mailer.clone(), message);
                }
                Ok(None) => {}
                Err(e) => warn!(
                    "Could not look up notification email for user {}: {e}",
                    recipient.user_id
                ),
            }
        }
    });
}
