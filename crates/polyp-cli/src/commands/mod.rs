pub mod build;
pub mod cache_path;
pub mod checks;
pub mod codec;
pub mod extract;
pub mod partition;
