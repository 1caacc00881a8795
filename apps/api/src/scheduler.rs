//! Cron-driven reminder jobs.
//!
//! Each job sleeps until the next fire time of its schedule, runs one
//! read-only query, then hands every email to the mailer without waiting.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate, Utc};
use cron::Schedule;
use sqlx::{FromRow, PgPool};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{parse_schedule, Config};
use crate::mail::{compose, send_detached, ActivityDigest, EmailKind, Mailer};
use crate::models::activity::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderJob {
    /// Activities starting exactly three days from today.
    Daily,
    /// Activities one to two weeks out.
    Weekly,
}

impl ReminderJob {
    pub fn name(self) -> &'static str {
        match self {
            ReminderJob::Daily => "daily reminder",
            ReminderJob::Weekly => "weekly reminder",
        }
    }

    pub fn kind(self) -> EmailKind {
        match self {
            ReminderJob::Daily => EmailKind::Reminder,
            ReminderJob::Weekly => EmailKind::Weekly,
        }
    }

    /// Inclusive date window the job looks at.
    pub fn window(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            ReminderJob::Daily => {
                let day = today + Days::new(3);
                (day, day)
            }
            ReminderJob::Weekly => (today + Days::new(7), today + Days::new(14)),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DueReminder {
    pub activity_name: String,
    pub activity_date: NaiveDate,
    pub priority: String,
    pub status: String,
    pub department: Option<String>,
    pub notify_email: String,
}

impl From<&DueReminder> for ActivityDigest {
    fn from(r: &DueReminder) -> Self {
        ActivityDigest {
            name: r.activity_name.clone(),
            date: r.activity_date,
            priority: Some(r.priority.clone()),
            status: Some(r.status.clone()),
            department: r.department.clone(),
        }
    }
}

/// Open, non-archived activities in the window whose creator has a
/// notification address.
pub async fn due_reminders(
    pool: &PgPool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<DueReminder>, sqlx::Error> {
    sqlx::query_as::<_, DueReminder>(
        r#"
        SELECT a.activity_name, a.activity_date, a.priority, a.status, a.department,
               u.notify_email
        FROM activities a
        JOIN users u ON u.id = a.created_by
        WHERE a.activity_date BETWEEN $1 AND $2
          AND a.status IN ($3, $4)
          AND a.is_archived = FALSE
          AND u.notify_email IS NOT NULL
          AND u.notify_email <> ''
        ORDER BY a.activity_date, a.id
        "#,
    )
    .bind(from)
    .bind(to)
    .bind(Status::Planned.as_str())
    .bind(Status::InProgress.as_str())
    .fetch_all(pool)
    .await
}

/// Runs one pass of `job` for `today`. Returns how many emails were queued.
pub async fn run_job(
    pool: &PgPool,
    mailer: &Arc<dyn Mailer>,
    mail_from: &str,
    job: ReminderJob,
    today: NaiveDate,
) -> Result<usize, sqlx::Error> {
    let (from, to) = job.window(today);
    let due = due_reminders(pool, from, to).await?;
    for reminder in &due {
        let message = compose(
            job.kind(),
            mail_from,
            &reminder.notify_email,
            &ActivityDigest::from(reminder),
        );
        send_detached(mailer.clone(), message);
    }
    Ok(due.len())
}

fn spawn_job(
    job: ReminderJob,
    schedule: Schedule,
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
    mail_from: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let Some(next) = schedule.upcoming(Utc).next() else {
                warn!("No further fire times for the {} job; stopping", job.name());
                return;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;

            info!("Running {} check...", job.name());
            match run_job(&pool, &mailer, &mail_from, job, Utc::now().date_naive()).await {
                Ok(n) => info!("{} job queued {n} emails", job.name()),
                Err(e) => error!("{} job failed: {e}", job.name()),
            }
        }
    })
}

/// Starts both reminder loops on the runtime.
pub fn spawn_reminders(
    config: &Config,
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
) -> anyhow::Result<Vec<JoinHandle<()>>> {
    let jobs = [
        (ReminderJob::Daily, &config.daily_reminder_cron),
        (ReminderJob::Weekly, &config.weekly_reminder_cron),
    ];
    let mut handles = Vec::with_capacity(jobs.len());
    for (job, expression) in jobs {
        let schedule = parse_schedule(expression)?;
        info!("Scheduled {} job: {expression}", job.name());
        handles.push(spawn_job(
            job,
            schedule,
            pool.clone(),
            mailer.clone(),
            config.mail_from.clone(),
        ));
    }
    Ok(handles)
}
