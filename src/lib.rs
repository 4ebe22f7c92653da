pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod language;
pub mod models;
pub mod services;
pub mod state;
