pub mod context;
pub mod pull;
