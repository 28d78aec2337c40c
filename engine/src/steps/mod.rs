//! Step handlers

pub mod builtin;
pub mod handler;
pub mod lambda;
pub mod registry;
