//! Local HTTP control server

pub mod handlers;
pub mod serve;
pub mod state;
