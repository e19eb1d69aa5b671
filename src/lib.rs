pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod mail;
pub mod state;
