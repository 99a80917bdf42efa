pub mod client;
pub mod common;
pub mod politeness;

pub type Error = crate::common::error::PsError;
pub type Result<T> = std::result::Result<T, Error>;

pub const POLITE_SUBMIT_VERSION: &str = env!("CARGO_PKG_VERSION");
