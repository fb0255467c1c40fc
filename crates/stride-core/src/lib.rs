pub mod analytics;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod identity;
pub mod model;
pub mod seed;
pub mod store;

pub use error::{Result, StrideError};
