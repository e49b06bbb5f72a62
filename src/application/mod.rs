pub mod cache;
pub mod popups;
pub mod tools;

pub use cache::DiskCache;
pub use popups::Popups;
pub use tools::ToolRunner;
