#[macro_use]
extern crate tracing;

pub mod engine;
pub mod error;
pub mod hints;
pub mod models;
pub mod plan;
pub mod puller;
pub mod reference;
pub mod request;
pub mod trust;

pub type Result<T> = std::result::Result<T, error::Error>;
