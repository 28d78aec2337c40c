//! Domain models

pub mod result;
pub mod workflow;
