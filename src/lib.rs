pub mod app;
pub mod audio;
pub mod config;
pub mod core;
pub mod error;
pub mod library;
pub mod loader;
pub mod logging;
pub mod model;
pub mod state;
pub mod time;
pub mod ui;
pub mod view;
