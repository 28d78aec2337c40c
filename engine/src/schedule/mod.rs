//! Scheduling of recurring workflows

pub mod policy;
pub mod scheduler;
