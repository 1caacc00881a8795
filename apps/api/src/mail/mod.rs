//! Outgoing email. Delivery is always best effort: callers hand a message to
//! [`send_detached`] and never wait on, or fail because of, the result.
//!
//! Two backends:
//! - `LogMailer`: test mode, writes the message to the log.
//! - `RelayMailer`: POSTs the rendered message as JSON to an HTTP mail relay.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::activity::ActivityRow;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Relay rejected message (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailKind {
    Reminder,
    Assignment,
    BackupAssignment,
    Weekly,
}

impl EmailKind {
    fn subject(self, activity_name: &str) -> String {
        match self {
            EmailKind::Reminder => {
                format!("Reminder: Activity \"{activity_name}\" starts in 3 days")
            }
            EmailKind::Assignment => format!("New Activity Assigned: \"{activity_name}\""),
            EmailKind::BackupAssignment => {
                format!("Backup Person for Activity: \"{activity_name}\"")
            }
            EmailKind::Weekly => {
                format!("Weekly Reminder: Upcoming Activity \"{activity_name}\"")
            }
        }
    }

    fn lead(self) -> &'static str {
        match self {
            EmailKind::Reminder => {
                "This is a reminder that your activity is scheduled to start in 3 days."
            }
            EmailKind::Assignment => "You have been assigned as the owner of a new activity.",
            EmailKind::BackupAssignment => {
                "You have been assigned as the backup person for an activity."
            }
            EmailKind::Weekly => "This is your weekly reminder about an upcoming activity.",
        }
    }
}

/// The activity facts quoted in an email.
#[derive(Debug, Clone)]
pub struct ActivityDigest {
    pub name: String,
    pub date: NaiveDate,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub department: Option<String>,
}

impl From<&ActivityRow> for ActivityDigest {
    fn from(row: &ActivityRow) -> Self {
        ActivityDigest {
            name: row.activity_name.clone(),
            date: row.activity_date,
            priority: Some(row.priority.clone()),
            status: Some(row.status.clone()),
            department: row.department.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub kind: EmailKind,
}

pub fn compose(kind: EmailKind, from: &str, to: &str, activity: &ActivityDigest) -> EmailMessage {
    let mut details = format!(
        "<h3>{}</h3>\n<p><strong>Date:</strong> {}</p>\n",
        escape_html(&activity.name),
        activity.date
    );
    for (label, value) in [
        ("Priority", &activity.priority),
        ("Status", &activity.status),
        ("Department", &activity.department),
    ] {
        if let Some(value) = value {
            details.push_str(&format!(
                "<p><strong>{label}:</strong> {}</p>\n",
                escape_html(value)
            ));
        }
    }

    let html = format!(
        "<div style=\"font-family: Arial, sans-serif; padding: 20px;\">\n\
         <h2>Activity Notification</h2>\n\
         <p>{}</p>\n\
         <div>\n{details}</div>\n\
         <p style=\"color: #777;\">This is an automated notification from the Activity Tracker system.</p>\n\
         </div>",
        kind.lead()
    );

    EmailMessage {
        from: from.to_string(),
        to: to.to_string(),
        subject: kind.subject(&activity.name),
        html,
        kind,
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Test-mode mailer: nothing leaves the process.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            kind = ?message.kind,
            "[TEST MODE] Email would be sent: {}",
            message.subject
        );
        Ok(())
    }
}

pub struct RelayMailer {
    client: Client,
    url: String,
}

impl RelayMailer {
    pub fn new(url: String) -> Result<Self, MailError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let response = self.client.post(&self.url).json(message).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        info!(to = %message.to, "Email sent: {}", message.subject);
        Ok(())
    }
}

pub fn mailer_from_config(config: &Config) -> anyhow::Result<Arc<dyn Mailer>> {
    match &config.mail_relay_url {
        Some(url) => {
            info!("Mail relay enabled: {url}");
            Ok(Arc::new(RelayMailer::new(url.clone())?))
        }
        None => {
            info!("MAIL_RELAY_URL not set; emails are logged only");
            Ok(Arc::new(LogMailer))
        }
    }
}

/// Sends on a background task. Failures are logged and never surfaced.
pub fn send_detached(mailer: Arc<dyn Mailer>, message: EmailMessage) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&message).await {
            warn!("Failed to send email to {}: {e}", message.to);
        }
    })
}
