//! # whatevers-core
//!
//! Domain layer: the [`Entity`] capability every persisted record implements, the sample
//! [`Whatever`] record, domain errors and tracing initialization. Storage-agnostic; used by
//! whatevers-storage and whatevers-cli.

pub mod entity;
pub mod error;
pub mod logger;
pub mod types;

pub use entity::Entity;
pub use error::{DomainError, Result};
pub use logger::init_tracing;
pub use types::Whatever;
