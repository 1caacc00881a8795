pub mod activities;
pub mod auth;
pub mod collaboration;
pub mod config;
pub mod db;
pub mod errors;
pub mod export;
pub mod mail;
pub mod models;
pub mod routes;
pub mod scheduler;
pub mod state;
pub mod users;
