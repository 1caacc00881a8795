use std::sync::Arc;

use sqlx::PgPool;

use crate::collaboration::attachments::AttachmentStore;
use crate::config::Config;
use crate::mail::Mailer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Test-mode logger or HTTP relay, picked at startup from MAIL_RELAY_URL.
    pub mailer: Arc<dyn Mailer>,
    pub attachments: AttachmentStore,
}
