// Comments, attachments, dependencies, notifications and templates.
// Each is a small slice keyed by activity id.

pub mod attachments;
pub mod comments;
pub mod dependencies;
pub mod handlers;
pub mod notifications;
pub mod templates;
