// Activity lifecycle: derived fields, CRUD, audit history, aggregates.

pub mod derived;
pub mod handlers;
pub mod history;
pub mod notify;
pub mod progress;
pub mod service;
