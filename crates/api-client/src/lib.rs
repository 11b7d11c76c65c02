pub mod client;
pub mod submit;

pub use client::{ApiClient, ApiError};
pub use hubble_api;
