pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod flash;
pub mod sessions;
pub mod state;
pub mod views;
