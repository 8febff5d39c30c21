pub use crate::error::RingError;

pub mod config;
pub mod engine;
pub mod error;
pub mod injector;
pub mod link;
pub mod log;
pub mod message;
pub mod peer;
pub mod sync;
