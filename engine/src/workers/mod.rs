//! Background workers

pub mod pool;
pub mod ticker;
