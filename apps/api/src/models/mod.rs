pub mod activity;
pub mod collaboration;
pub mod history;
pub mod user;
