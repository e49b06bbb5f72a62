pub mod api;
pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod logging;
pub mod ui;
pub mod utils;

pub use application::{DiskCache, Popups, ToolRunner};
pub use config::Config;
pub use domain::{AppError, Result};
pub use logging::{LogSink, Logger};
