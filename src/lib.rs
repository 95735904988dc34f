pub mod app;
pub mod clipboard;
pub mod config;
pub mod events;
pub mod geocode;
pub mod link;
pub mod location;
pub mod logging;
pub mod models;
pub mod ui;
