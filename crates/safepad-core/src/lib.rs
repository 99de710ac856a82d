pub mod config;
pub mod error;
pub mod policy;
pub mod types;

pub use error::{SafepadError, SafepadResult};
