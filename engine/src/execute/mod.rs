//! Workflow execution

pub mod executor;
pub mod fsm;
pub mod recorder;
pub mod runner;
