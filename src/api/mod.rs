pub mod client;
pub mod models;
pub mod process;

pub use client::Downloader;
pub use models::{Endpoints, ShellCommand};
