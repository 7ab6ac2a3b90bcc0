//! Shared test support: an in-memory job store and entity builders.

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
